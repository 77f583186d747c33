//! Secure API token management.
//!
//! Uses the `secrecy` crate to prevent accidental logging of the token
//! and ensures memory is zeroed on drop.

use crate::error::CredentialError;
use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding the API token.
pub const TOKEN_ENV_VAR: &str = "DERIV_API_TOKEN";

/// Number of leading characters shown by [`ApiToken::masked`].
const VISIBLE_PREFIX: usize = 4;

/// API token used to authorize the streaming session.
///
/// The token is wrapped in `SecretString` which:
/// - Prevents accidental Debug/Display printing
/// - Zeros memory on drop via zeroize
#[derive(Clone)]
pub struct ApiToken {
    token: SecretString,
}

impl ApiToken {
    /// Load the token from `DERIV_API_TOKEN`.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    /// Returns `CredentialError::MissingEnvVar` if the variable is not set,
    /// `CredentialError::InvalidTokenFormat` if it is blank or malformed.
    pub fn from_env() -> Result<Self, CredentialError> {
        // Load .env file if present (ignores errors if file doesn't exist)
        dotenvy::dotenv().ok();

        let token = std::env::var(TOKEN_ENV_VAR)
            .map_err(|_| CredentialError::MissingEnvVar(TOKEN_ENV_VAR.into()))?;

        Self::parse(token)
    }

    /// Validate and wrap a token obtained elsewhere (CLI, secret store).
    pub fn parse(token: impl Into<String>) -> Result<Self, CredentialError> {
        let token = token.into();
        let trimmed = token.trim();

        let well_formed = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if trimmed.is_empty() || !well_formed {
            return Err(CredentialError::InvalidTokenFormat);
        }

        Ok(Self::new(trimmed.to_string()))
    }

    /// Wrap a token without validation.
    ///
    /// Useful for testing.
    pub fn new(token: String) -> Self {
        Self {
            token: SecretString::from(token),
        }
    }

    /// A log-safe rendering: the first few characters followed by `****`.
    pub fn masked(&self) -> String {
        let prefix: String = self
            .token
            .expose_secret()
            .chars()
            .take(VISIBLE_PREFIX)
            .collect();
        format!("{}****", prefix)
    }

    /// Expose the token for the authorize request.
    ///
    /// **WARNING**: Only use this when building the wire message.
    /// Never log or display the return value.
    pub fn expose_secret(&self) -> &str {
        self.token.expose_secret()
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
