//! Trading loop error types.

use model::OrderValidationError;
use thiserror::Error;

/// Terminal failures of the trading loop.
///
/// Everything else (timeouts, bad candles, rejected orders) is contained to
/// a single cycle and only logged.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The venue refused the API token.
    #[error("authorization rejected ({code}): {message}")]
    AuthRejected { code: String, message: String },

    /// Every reconnect attempt failed.
    #[error("gave up after {attempts} reconnect attempts: {last_error}")]
    ReconnectExhausted { attempts: u32, last_error: String },

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Reasons a configuration is rejected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The contract parameters would never pass order validation.
    #[error(transparent)]
    Order(#[from] OrderValidationError),

    #[error("poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("candle count must be non-zero")]
    ZeroCandleCount,

    #[error("candle granularity must be non-zero")]
    ZeroGranularity,

    #[error("request timeout must be non-zero")]
    ZeroRequestTimeout,
}
