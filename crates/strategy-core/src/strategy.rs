//! Decision engine trait definition.

use model::CandleSeries;

use crate::signal::Signal;

/// Turns recent price history into a trading signal.
///
/// Implementations must be deterministic and side-effect free: the same
/// series always yields the same signal. The series is borrowed, so an engine
/// cannot alter what the loop fetched.
///
/// An empty series should yield [`Signal::None`].
///
/// Plain closures work too:
///
/// ```rust,ignore
/// let always_buy = |_: &CandleSeries| Signal::Buy;
/// let engine: BoxedDecisionEngine = Box::new(always_buy);
/// ```
pub trait DecisionEngine: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str {
        "custom"
    }

    fn decide(&self, candles: &CandleSeries) -> Signal;
}

impl<F> DecisionEngine for F
where
    F: Fn(&CandleSeries) -> Signal + Send + Sync,
{
    fn decide(&self, candles: &CandleSeries) -> Signal {
        self(candles)
    }
}

/// A boxed decision engine trait object.
pub type BoxedDecisionEngine = Box<dyn DecisionEngine>;
