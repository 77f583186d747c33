use thiserror::Error;

/// Errors that can occur while loading credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// The token is empty or contains characters the API never issues.
    #[error("Invalid API token format")]
    InvalidTokenFormat,
}
