//! Decision interface for the trading loop.
//!
//! - **Signal**: what to do this cycle (`Buy`, `Sell`, or nothing)
//! - **DecisionEngine**: pure function from a candle series to a signal
//! - **ParityDecision**: the placeholder rule shipped with the trader
//!
//! # Example Engine
//!
//! ```rust,ignore
//! use model::CandleSeries;
//! use strategy_core::{DecisionEngine, Signal};
//!
//! struct RisingClose;
//!
//! impl DecisionEngine for RisingClose {
//!     fn name(&self) -> &str {
//!         "rising-close"
//!     }
//!
//!     fn decide(&self, candles: &CandleSeries) -> Signal {
//!         let closes: Vec<_> = candles.iter().rev().take(2).map(|c| c.close).collect();
//!         match closes.as_slice() {
//!             [last, prev] if last > prev => Signal::Buy,
//!             [last, prev] if last < prev => Signal::Sell,
//!             _ => Signal::None,
//!         }
//!     }
//! }
//! ```

mod parity;
mod signal;
mod strategy;

pub use parity::ParityDecision;
pub use signal::Signal;
pub use strategy::{BoxedDecisionEngine, DecisionEngine};

// Re-export the engine input for convenience
pub use model::CandleSeries;
