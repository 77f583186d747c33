//! Credential management for the streaming trading API.
//!
//! The API token is the only secret the client holds. It is wrapped in
//! `SecretString` so it cannot be printed by accident and is zeroed on drop.
//!
//! # Example
//!
//! ```rust,ignore
//! use auth::ApiToken;
//!
//! let token = ApiToken::from_env()?;
//! tracing::info!(token = %token.masked(), "loaded credential");
//! ```

mod credentials;
mod error;

pub use credentials::{ApiToken, TOKEN_ENV_VAR};
pub use error::CredentialError;
