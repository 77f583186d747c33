//! Candle history retrieval.

use crate::error::FetchError;
use crate::protocol::{api_error, ticks_history_request, CandleRaw};
use crate::session::Session;
use connector_core::Transport;
use model::{Candle, CandleSeries};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct MarketDataFetcher<T> {
    session: Arc<Session<T>>,
}

impl<T: Transport> MarketDataFetcher<T> {
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self { session }
    }

    /// Fetch the latest `count` candles of `granularity_secs` for `symbol`.
    ///
    /// `FetchError::Session` means the request never completed; every other
    /// variant means the venue answered with something unusable.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        count: u32,
        granularity_secs: u32,
    ) -> Result<CandleSeries, FetchError> {
        let response = self
            .session
            .request(ticks_history_request(symbol, count, granularity_secs))
            .await?;

        let series = decode_candles(&response)?;
        debug!(
            symbol,
            candles = series.len(),
            last_close = ?series.last_close(),
            "Fetched candles"
        );
        Ok(series)
    }
}

/// Decode a `ticks_history` (style `candles`) response.
pub fn decode_candles(response: &Value) -> Result<CandleSeries, FetchError> {
    if let Some(err) = api_error(response) {
        return Err(FetchError::Api {
            code: err.code,
            message: err.message,
        });
    }

    let raw = response
        .get("candles")
        .ok_or_else(|| FetchError::Malformed("response has no candles field".into()))?;
    let raw: Vec<CandleRaw> =
        serde_json::from_value(raw.clone()).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if raw.is_empty() {
        return Err(FetchError::Empty);
    }

    let candles = raw
        .into_iter()
        .enumerate()
        .map(|(i, c)| Candle::try_from(c).map_err(|e| FetchError::Malformed(format!("candle {}: {}", i, e))))
        .collect::<Result<Vec<_>, _>>()?;

    CandleSeries::new(candles).map_err(|e| FetchError::Malformed(e.to_string()))
}
