//! Error types for the API client layers.

use connector_core::TransportError;
use model::OrderValidationError;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain the response matching a request.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// No matching response within the timeout.
    #[error("request {req_id} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Correlation id of the abandoned request.
        req_id: u64,
        after: Duration,
    },

    /// The connection closed while the request was outstanding.
    #[error("connection lost while awaiting response: {0}")]
    ConnectionLost(String),

    /// The request could not be written or the transport is down.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The request is not a JSON object and cannot carry a correlation id.
    #[error("request must be a JSON object")]
    InvalidRequest,
}

impl CorrelationError {
    /// Whether the connection must be re-established before retrying.
    pub fn is_connection_loss(&self) -> bool {
        match self {
            Self::ConnectionLost(_) => true,
            Self::Transport(e) => e.is_connection_loss(),
            _ => false,
        }
    }
}

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The venue refused the token. Retrying with the same token is pointless.
    #[error("authorization rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The authorize round-trip itself failed.
    #[error("authorization request failed: {0}")]
    Correlation(#[from] CorrelationError),

    /// The response had neither `error` nor `authorize`.
    #[error("malformed authorize response: {0}")]
    Malformed(String),
}

impl AuthError {
    /// Fatal errors must not be retried with the same credential.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Errors issuing an authenticated request.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Requests are refused until authentication completes.
    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}

impl SessionError {
    /// Whether the session must reconnect and re-authenticate.
    pub fn needs_reconnect(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Correlation(e) => e.is_connection_loss(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Correlation(CorrelationError::Timeout { .. }))
    }
}

/// Errors fetching candle history.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The response is missing `candles` or contains undecodable data.
    #[error("malformed candles response: {0}")]
    Malformed(String),

    /// The venue returned zero candles.
    #[error("no candles returned")]
    Empty,

    /// The venue answered with an error.
    #[error("venue error ({code}): {message}")]
    Api { code: String, message: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors submitting a contract purchase.
///
/// A venue-side rejection is not an error; see `model::OrderResult::Rejected`.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The order failed local validation and was not sent.
    #[error("invalid order request: {0}")]
    InvalidRequest(#[from] OrderValidationError),

    /// The venue accepted the request but the response could not be decoded.
    #[error("malformed buy response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}
