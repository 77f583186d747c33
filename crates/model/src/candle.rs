//! OHLC candles and ordered candle series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLC bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time (UTC).
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Not every venue reports volume for synthetic indices.
    pub volume: Option<Decimal>,
}

/// Errors building a [`CandleSeries`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    /// Timestamps must be strictly increasing.
    #[error("candle {index} at {timestamp} is not after its predecessor")]
    NotIncreasing {
        /// Position of the offending candle.
        index: usize,
        /// Its timestamp.
        timestamp: DateTime<Utc>,
    },
}

/// Candles ordered by timestamp ascending.
///
/// Immutable once built; timestamps are strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series, rejecting out-of-order or duplicate timestamps.
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        if let Some(index) = candles
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(SeriesError::NotIncreasing {
                index: index + 1,
                timestamp: candles[index + 1].timestamp,
            });
        }

        Ok(Self { candles })
    }

    /// An empty series.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Close of the most recent candle.
    pub fn last_close(&self) -> Option<Decimal> {
        self.candles.last().map(|c| c.close)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
