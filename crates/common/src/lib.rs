//! Shared plumbing used by every crate in the workspace.

mod backoff;
mod environment;
mod logging;

pub use backoff::ExponentialBackoff;
pub use environment::{ApiEndpoint, ParseEndpointError, DEFAULT_APP_ID, DEFAULT_WS_HOST};
pub use logging::init_logging;
