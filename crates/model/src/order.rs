//! Contract purchase requests and their outcomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rise/fall contract direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractDirection {
    /// Pays out if the exit spot is higher than the entry spot.
    Call,
    /// Pays out if the exit spot is lower than the entry spot.
    Put,
}

impl ContractDirection {
    /// Wire representation (`contract_type`).
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
        }
    }
}

/// Contract duration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationUnit {
    Ticks,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    /// Wire representation (`duration_unit`).
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Ticks => "t",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    pub fn from_api_str(s: &str) -> Option<Self> {
        match s {
            "t" => Some(Self::Ticks),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            "d" => Some(Self::Days),
            _ => None,
        }
    }
}

/// Whether `amount` is the stake paid or the payout received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContractBasis {
    #[default]
    Stake,
    Payout,
}

impl ContractBasis {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Stake => "stake",
            Self::Payout => "payout",
        }
    }
}

/// Local validation failures for an [`OrderRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderValidationError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("duration must be positive")]
    ZeroDuration,

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("currency must not be empty")]
    EmptyCurrency,
}

/// A contract purchase to submit to the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Underlying symbol (e.g., "R_100").
    pub symbol: String,
    /// Stake or payout, depending on `basis`.
    pub amount: Decimal,
    pub basis: ContractBasis,
    pub direction: ContractDirection,
    pub duration: u32,
    pub duration_unit: DurationUnit,
    /// Account currency (e.g., "USD").
    pub currency: String,
}

impl OrderRequest {
    /// Check the request before anything is sent.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(OrderValidationError::EmptySymbol);
        }
        if self.amount <= Decimal::ZERO {
            return Err(OrderValidationError::NonPositiveAmount(self.amount));
        }
        if self.duration == 0 {
            return Err(OrderValidationError::ZeroDuration);
        }
        if self.currency.trim().is_empty() {
            return Err(OrderValidationError::EmptyCurrency);
        }
        Ok(())
    }
}

/// Outcome of a purchase round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderResult {
    /// Venue accepted the purchase.
    Accepted {
        contract_id: u64,
        transaction_id: Option<u64>,
        buy_price: Option<Decimal>,
    },
    /// Venue declined the purchase. A normal outcome, not a failure.
    Rejected {
        code: Option<String>,
        reason: String,
    },
    /// The request may or may not have reached the venue.
    TransportFailure { reason: String },
}
