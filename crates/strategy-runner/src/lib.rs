//! Trading loop runtime.
//!
//! - **TradingConfig**: instrument, stake, polling and reconnect settings
//! - **TradingLoop**: connect/authorize, poll candles, decide, submit, repeat
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌────────────────┐
//! │ TradingLoop │────>│ MarketData-      │────>│ Session        │
//! │ - backoff   │     │ Fetcher          │     │ - authorize    │
//! │ - shutdown  │     └──────────────────┘     │ - gating       │
//! │             │     ┌──────────────────┐     └────────────────┘
//! │ decide() ───┼────>│ OrderSubmitter   │────>        │
//! └─────────────┘     └──────────────────┘             v
//!                                              ┌────────────────┐
//!                                              │ Correlator     │
//!                                              │ (req_id match) │
//!                                              └────────────────┘
//!                                                      │
//!                                                      v
//!                                              ┌────────────────┐
//!                                              │ Transport (WS) │
//!                                              └────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use strategy_runner::{TradingConfig, TradingLoop};
//!
//! let trading_loop = TradingLoop::new(config, transport, token, Box::new(ParityDecision), metrics);
//! let mut state_rx = trading_loop.subscribe_state();
//! trading_loop.run(shutdown_rx).await?;
//! ```

mod config;
mod error;
mod trading_loop;

pub use config::TradingConfig;
pub use error::{ConfigError, RunnerError};
pub use trading_loop::{CycleOutcome, LoopState, TradingLoop};
