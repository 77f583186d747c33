//! Wire messages for the Deriv WebSocket API.
//!
//! Requests are plain JSON objects keyed by the call name. Every response
//! carries `msg_type`, the echoed `req_id`, and either the payload under the
//! call name or an `error` object.

use auth::ApiToken;
use chrono::{DateTime, Utc};
use model::{Candle, OrderRequest};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

/// Passthrough field echoed back by the server.
pub const REQ_ID_FIELD: &str = "req_id";

/// `{"authorize": <token>}`
pub fn authorize_request(token: &ApiToken) -> Value {
    json!({ "authorize": token.expose_secret() })
}

/// Latest `count` candles of `granularity_secs` seconds for `symbol`.
pub fn ticks_history_request(symbol: &str, count: u32, granularity_secs: u32) -> Value {
    json!({
        "ticks_history": symbol,
        "count": count,
        "end": "latest",
        "style": "candles",
        "granularity": granularity_secs,
    })
}

/// Purchase a contract using inline proposal parameters.
///
/// `price` is the maximum price accepted; for stake-based contracts it equals
/// the stake.
pub fn buy_request(order: &OrderRequest) -> Value {
    json!({
        "buy": 1,
        "price": wire_number(order.amount),
        "parameters": {
            "amount": wire_number(order.amount),
            "basis": order.basis.as_api_str(),
            "contract_type": order.direction.as_api_str(),
            "currency": order.currency,
            "duration": order.duration,
            "duration_unit": order.duration_unit.as_api_str(),
            "symbol": order.symbol,
        }
    })
}

/// The API expects JSON numbers, not the decimal string encoding.
fn wire_number(value: Decimal) -> Value {
    json!(value.to_f64())
}

/// Extract the correlation id from a response frame.
pub fn response_req_id(frame: &Value) -> Option<u64> {
    frame.get(REQ_ID_FIELD).and_then(Value::as_u64)
}

/// `msg_type` of a response frame, for logging.
pub fn msg_type(frame: &Value) -> &str {
    frame
        .get("msg_type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// Error object returned in place of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default = "unknown_code")]
    pub code: String,
    pub message: String,
}

fn unknown_code() -> String {
    "Unknown".to_string()
}

/// Returns the `error` object if the response reports a failure.
///
/// An `error` value that does not decode still counts as a failure.
pub fn api_error(response: &Value) -> Option<ApiError> {
    let raw = response.get("error")?;
    Some(
        serde_json::from_value::<ApiError>(raw.clone()).unwrap_or_else(|_| ApiError {
            code: unknown_code(),
            message: raw.to_string(),
        }),
    )
}

/// Payload of a successful `authorize` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeRaw {
    #[serde(default)]
    pub loginid: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One element of the `candles` array.
#[derive(Debug, Clone, Deserialize)]
pub struct CandleRaw {
    /// Unix seconds.
    pub epoch: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Option<Decimal>,
}

impl TryFrom<CandleRaw> for Candle {
    type Error = String;

    fn try_from(raw: CandleRaw) -> Result<Self, Self::Error> {
        let timestamp: DateTime<Utc> = DateTime::from_timestamp(raw.epoch, 0)
            .ok_or_else(|| format!("epoch {} out of range", raw.epoch))?;

        Ok(Candle {
            timestamp,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
        })
    }
}

/// Payload of a successful `buy` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyRaw {
    pub contract_id: u64,
    #[serde(default)]
    pub transaction_id: Option<u64>,
    #[serde(default)]
    pub buy_price: Option<Decimal>,
    #[serde(default)]
    pub longcode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ContractBasis, ContractDirection, DurationUnit};
    use rust_decimal_macros::dec;

    #[test]
    fn test_authorize_request_shape() {
        let token = ApiToken::new("tok123".into());
        assert_eq!(authorize_request(&token), json!({"authorize": "tok123"}));
    }

    #[test]
    fn test_ticks_history_request_shape() {
        let request = ticks_history_request("R_100", 50, 60);
        assert_eq!(request["ticks_history"], "R_100");
        assert_eq!(request["count"], 50);
        assert_eq!(request["end"], "latest");
        assert_eq!(request["style"], "candles");
        assert_eq!(request["granularity"], 60);
    }

    #[test]
    fn test_buy_request_shape() {
        let order = OrderRequest {
            symbol: "R_100".into(),
            amount: dec!(10),
            basis: ContractBasis::Stake,
            direction: ContractDirection::Put,
            duration: 1,
            duration_unit: DurationUnit::Minutes,
            currency: "USD".into(),
        };

        let request = buy_request(&order);
        assert_eq!(request["buy"], 1);
        let params = &request["parameters"];
        assert_eq!(params["basis"], "stake");
        assert_eq!(params["contract_type"], "PUT");
        assert_eq!(params["currency"], "USD");
        assert_eq!(params["duration"], 1);
        assert_eq!(params["duration_unit"], "m");
        assert_eq!(params["symbol"], "R_100");
        assert_eq!(params["amount"], 10.0);
        assert_eq!(request["price"], 10.0);
    }

    #[test]
    fn test_api_error_extraction() {
        let response = json!({
            "error": {"code": "InvalidToken", "message": "The token is invalid."},
            "msg_type": "authorize",
            "req_id": 3
        });
        let err = api_error(&response).unwrap();
        assert_eq!(err.code, "InvalidToken");
        assert_eq!(err.message, "The token is invalid.");
        assert_eq!(response_req_id(&response), Some(3));
        assert_eq!(msg_type(&response), "authorize");

        assert!(api_error(&json!({"authorize": {}})).is_none());
    }

    #[test]
    fn test_api_error_without_code() {
        let err = api_error(&json!({"error": {"message": "nope"}})).unwrap();
        assert_eq!(err.code, "Unknown");

        let err = api_error(&json!({"error": "flat string"})).unwrap();
        assert!(err.message.contains("flat string"));
    }

    #[test]
    fn test_candle_raw_from_numbers() {
        let raw: CandleRaw = serde_json::from_value(json!({
            "epoch": 1700000000,
            "open": 100.25,
            "high": 101,
            "low": 99.5,
            "close": 100.5
        }))
        .unwrap();

        let candle = Candle::try_from(raw).unwrap();
        assert_eq!(candle.close, dec!(100.5));
        assert_eq!(candle.high, dec!(101));
        assert_eq!(candle.timestamp.timestamp(), 1700000000);
        assert!(candle.volume.is_none());
    }
}
