//! Client for the Deriv WebSocket API.
//!
//! Layers, bottom up:
//! - [`WsTransport`]: one WebSocket connection, text frames in and out
//! - [`Correlator`]: stamps requests with `req_id` and matches the replies
//! - [`Session`]: `authorize` gating on top of the correlator
//! - [`MarketDataFetcher`] and [`OrderSubmitter`]: the two calls the trader makes

mod correlation;
mod error;
mod market_data;
mod orders;
pub mod protocol;
mod session;
mod transport;

pub use correlation::{Correlator, PendingRequest, PendingRequestRegistry};
pub use error::{AuthError, CorrelationError, FetchError, SessionError, SubmitError};
pub use market_data::{decode_candles, MarketDataFetcher};
pub use orders::{decode_buy, OrderSubmitter};
pub use session::{AuthState, AuthStatus, Session, DEFAULT_REQUEST_TIMEOUT};
pub use transport::{WsTransport, CONNECTION_TIMEOUT};
