//! Deriv WebSocket API endpoint configuration.
//!
//! The endpoint is a fixed host plus the registered application id; whether
//! the account is real or virtual is decided by the API token, not the URL.

use std::fmt;
use std::str::FromStr;

/// Public application id used when none is registered.
pub const DEFAULT_APP_ID: u32 = 1089;

/// Default WebSocket host.
pub const DEFAULT_WS_HOST: &str = "ws.binaryws.com";

/// Address of the streaming API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    host: String,
    app_id: u32,
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_WS_HOST.to_string(),
            app_id: DEFAULT_APP_ID,
        }
    }
}

impl ApiEndpoint {
    /// Create an endpoint for the given host and application id.
    pub fn new(host: impl Into<String>, app_id: u32) -> Self {
        Self {
            host: host.into(),
            app_id,
        }
    }

    /// Host name (without scheme).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Registered application id.
    pub fn app_id(&self) -> u32 {
        self.app_id
    }

    /// Full WebSocket URL.
    pub fn ws_url(&self) -> String {
        format!("wss://{}/websockets/v3?app_id={}", self.host, self.app_id)
    }

    /// Load the endpoint from `DERIV_WS_HOST` and `DERIV_APP_ID`.
    ///
    /// Falls back to the defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let host = std::env::var("DERIV_WS_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WS_HOST.to_string());
        let app_id = std::env::var("DERIV_APP_ID")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_APP_ID);
        Self { host, app_id }
    }
}

impl fmt::Display for ApiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ws_url())
    }
}

/// Parses `host` or `host:app_id`.
impl FromStr for ApiEndpoint {
    type Err = ParseEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("wss://")
            .or_else(|| s.strip_prefix("ws://"))
            .unwrap_or(s);

        let (host, app_id) = match s.rsplit_once(':') {
            Some((host, id)) => {
                let app_id = id
                    .parse()
                    .map_err(|_| ParseEndpointError(s.to_string()))?;
                (host, app_id)
            }
            None => (s, DEFAULT_APP_ID),
        };

        if host.is_empty() || host.contains('/') {
            return Err(ParseEndpointError(s.to_string()));
        }

        Ok(Self::new(host, app_id))
    }
}

/// Error parsing an endpoint string.
#[derive(Debug, Clone)]
pub struct ParseEndpointError(String);

impl fmt::Display for ParseEndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid endpoint '{}', expected 'host' or 'host:app_id'",
            self.0
        )
    }
}

impl std::error::Error for ParseEndpointError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let endpoint = ApiEndpoint::default();
        assert_eq!(
            endpoint.ws_url(),
            "wss://ws.binaryws.com/websockets/v3?app_id=1089"
        );
        assert_eq!(endpoint.app_id(), DEFAULT_APP_ID);
    }

    #[test]
    fn test_custom_app_id() {
        let endpoint = ApiEndpoint::new("ws.derivws.com", 42);
        assert_eq!(endpoint.ws_url(), "wss://ws.derivws.com/websockets/v3?app_id=42");
        assert_eq!(endpoint.to_string(), endpoint.ws_url());
    }

    #[test]
    fn test_parse_host_only() {
        let endpoint: ApiEndpoint = "ws.derivws.com".parse().unwrap();
        assert_eq!(endpoint.host(), "ws.derivws.com");
        assert_eq!(endpoint.app_id(), DEFAULT_APP_ID);
    }

    #[test]
    fn test_parse_host_and_app_id() {
        let endpoint: ApiEndpoint = "wss://ws.binaryws.com:1234".parse().unwrap();
        assert_eq!(endpoint.host(), "ws.binaryws.com");
        assert_eq!(endpoint.app_id(), 1234);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<ApiEndpoint>().is_err());
        assert!("ws.binaryws.com:abc".parse::<ApiEndpoint>().is_err());
        assert!("ws.binaryws.com/websockets".parse::<ApiEndpoint>().is_err());
    }
}
