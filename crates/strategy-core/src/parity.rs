use model::CandleSeries;
use rust_decimal::Decimal;

use crate::signal::Signal;
use crate::strategy::DecisionEngine;

/// Placeholder rule: buy when the last close is an even number, sell
/// otherwise.
///
/// Carries no market insight; it exists to exercise the order path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParityDecision;

impl DecisionEngine for ParityDecision {
    fn name(&self) -> &str {
        "parity"
    }

    fn decide(&self, candles: &CandleSeries) -> Signal {
        match candles.last_close() {
            Some(close) if close % Decimal::TWO == Decimal::ZERO => Signal::Buy,
            Some(_) => Signal::Sell,
            None => Signal::None,
        }
    }
}
