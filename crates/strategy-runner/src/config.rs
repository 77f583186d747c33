//! Trading loop configuration.

use std::time::Duration;

use model::{ContractBasis, ContractDirection, DurationUnit, OrderRequest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ConfigError;

/// Configuration for the trading loop.
#[derive(Debug, Clone)]
pub struct TradingConfig {
    // === Instrument and contract ===
    /// Instrument to trade, e.g. `R_100`.
    pub symbol: String,
    /// Stake per contract in `currency`.
    pub stake: Decimal,
    pub currency: String,
    pub basis: ContractBasis,
    /// Contract duration, in `duration_unit`.
    pub duration: u32,
    pub duration_unit: DurationUnit,

    // === Polling ===
    /// Pause between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Candles requested per cycle.
    pub candle_count: u32,
    /// Candle width in seconds.
    pub granularity_secs: u32,

    // === Connection ===
    /// Bound on every request/response round-trip.
    pub request_timeout: Duration,
    /// Consecutive failed connects tolerated before giving up.
    pub max_reconnect_attempts: u32,
    /// First reconnect delay; doubles per attempt.
    pub reconnect_base_delay: Duration,
    /// Reconnect delay cap.
    pub reconnect_max_delay: Duration,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: "R_100".to_string(),
            stake: dec!(10),
            currency: "USD".to_string(),
            basis: ContractBasis::Stake,
            duration: 1,
            duration_unit: DurationUnit::Minutes,

            poll_interval: Duration::from_secs(60),
            candle_count: 50,
            granularity_secs: 60,

            request_timeout: Duration::from_secs(10),
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
        }
    }
}

impl TradingConfig {
    /// Create a new config with all default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the traded symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Builder method to set the stake.
    pub fn with_stake(mut self, stake: Decimal) -> Self {
        self.stake = stake;
        self
    }

    /// Builder method to set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Purchase request for one contract in `direction`.
    pub fn order_request(&self, direction: ContractDirection) -> OrderRequest {
        OrderRequest {
            symbol: self.symbol.clone(),
            amount: self.stake,
            basis: self.basis,
            direction,
            duration: self.duration,
            duration_unit: self.duration_unit,
            currency: self.currency.clone(),
        }
    }

    /// Check the configuration before anything connects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.order_request(ContractDirection::Call).validate()?;

        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.candle_count == 0 {
            return Err(ConfigError::ZeroCandleCount);
        }
        if self.granularity_secs == 0 {
            return Err(ConfigError::ZeroGranularity);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::OrderValidationError;

    #[test]
    fn test_defaults_are_valid() {
        let config = TradingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.symbol, "R_100");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.candle_count, 50);
        assert_eq!(config.granularity_secs, 60);
    }

    #[test]
    fn test_order_request_from_config() {
        let config = TradingConfig::new().with_symbol("R_50").with_stake(dec!(2.5));
        let order = config.order_request(ContractDirection::Put);
        assert_eq!(order.symbol, "R_50");
        assert_eq!(order.amount, dec!(2.5));
        assert_eq!(order.direction, ContractDirection::Put);
        assert_eq!(order.duration_unit, DurationUnit::Minutes);
    }

    #[test]
    fn test_invalid_stake_rejected() {
        let config = TradingConfig::new().with_stake(dec!(-1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Order(OrderValidationError::NonPositiveAmount(_)))
        ));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let config = TradingConfig::new().with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPollInterval)));

        let config = TradingConfig {
            candle_count: 0,
            ..TradingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCandleCount)));

        let config = TradingConfig {
            request_timeout: Duration::ZERO,
            ..TradingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroRequestTimeout)));
    }
}
