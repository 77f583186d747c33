//! Authenticated session over a correlated connection.
//!
//! Every successful (re)connect must be followed by `authorize` before any
//! other request; [`Session::establish`] does both. Requests issued while the
//! session is not [`AuthState::Authenticated`] fail fast with
//! [`SessionError::NotAuthenticated`].

use crate::correlation::Correlator;
use crate::error::{AuthError, CorrelationError, SessionError};
use crate::protocol::{api_error, authorize_request, AuthorizeRaw};
use auth::ApiToken;
use connector_core::Transport;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Default bound on a single request/response round-trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Authentication gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Result of a successful `authorize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated {
        login_id: Option<String>,
        currency: Option<String>,
    },
}

pub struct Session<T> {
    correlator: Correlator<T>,
    token: ApiToken,
    state: RwLock<AuthState>,
    request_timeout: Duration,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, token: ApiToken) -> Self {
        Self {
            correlator: Correlator::new(transport),
            token,
            state: RwLock::new(AuthState::Unauthenticated),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn state(&self) -> AuthState {
        *self.state.read()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    pub async fn is_connected(&self) -> bool {
        self.correlator.is_connected().await
    }

    pub fn correlator(&self) -> &Correlator<T> {
        &self.correlator
    }

    fn set_state(&self, state: AuthState) {
        *self.state.write() = state;
    }

    /// Connect (replacing any previous connection) and authorize.
    pub async fn establish(&self) -> Result<AuthStatus, AuthError> {
        self.set_state(AuthState::Unauthenticated);
        self.correlator
            .connect()
            .await
            .map_err(CorrelationError::from)?;
        self.authenticate().await
    }

    /// Authorize the current connection with the session's token.
    pub async fn authenticate(&self) -> Result<AuthStatus, AuthError> {
        self.set_state(AuthState::Authenticating);

        match self.authorize().await {
            Ok(status) => {
                self.set_state(AuthState::Authenticated);
                Ok(status)
            }
            Err(e) => {
                self.set_state(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    async fn authorize(&self) -> Result<AuthStatus, AuthError> {
        let response = self
            .correlator
            .send_and_await(authorize_request(&self.token), self.request_timeout)
            .await?;

        if let Some(err) = api_error(&response) {
            warn!(
                code = %err.code,
                message = %err.message,
                token = %self.token.masked(),
                "Authorization rejected"
            );
            return Err(AuthError::Rejected {
                code: err.code,
                message: err.message,
            });
        }

        let raw = response
            .get("authorize")
            .ok_or_else(|| AuthError::Malformed("response has no authorize field".into()))?;
        let info: AuthorizeRaw = serde_json::from_value(raw.clone())
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        info!(
            login_id = info.loginid.as_deref().unwrap_or("unknown"),
            currency = info.currency.as_deref().unwrap_or("unknown"),
            token = %self.token.masked(),
            "Authorized"
        );

        Ok(AuthStatus::Authenticated {
            login_id: info.loginid,
            currency: info.currency,
        })
    }

    /// Send an authenticated request and await its response.
    ///
    /// A lost connection drops the session back to `Unauthenticated`.
    pub async fn request(&self, request: Value) -> Result<Value, SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        match self
            .correlator
            .send_and_await(request, self.request_timeout)
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_connection_loss() {
                    self.set_state(AuthState::Unauthenticated);
                }
                Err(e.into())
            }
        }
    }

    pub async fn close(&self) {
        self.set_state(AuthState::Unauthenticated);
        self.correlator.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector_core::testing::{Reply, ScriptedTransport, TranscriptEntry};
    use serde_json::json;

    fn token() -> ApiToken {
        ApiToken::new("a1-testtoken".into())
    }

    fn authorize_ok() -> Reply {
        Reply::Json(json!({
            "msg_type": "authorize",
            "authorize": {"loginid": "VRTC123", "currency": "USD", "balance": 10000}
        }))
    }

    fn session(transport: ScriptedTransport) -> Session<ScriptedTransport> {
        Session::new(transport, token()).with_request_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_establish_authorizes() {
        let transport = ScriptedTransport::new(|_, req| {
            if req.get("authorize").is_some() {
                vec![authorize_ok()]
            } else {
                Vec::new()
            }
        });
        let transcript = transport.transcript();
        let session = session(transport);

        let status = session.establish().await.unwrap();
        assert_eq!(
            status,
            AuthStatus::Authenticated {
                login_id: Some("VRTC123".into()),
                currency: Some("USD".into()),
            }
        );
        assert_eq!(session.state(), AuthState::Authenticated);

        let sent = transcript.sent_with_key("authorize");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["authorize"], "a1-testtoken");
    }

    #[tokio::test]
    async fn test_rejected_token_is_fatal() {
        let transport = ScriptedTransport::new(|_, _| {
            vec![Reply::Json(json!({
                "msg_type": "authorize",
                "error": {"code": "InvalidToken", "message": "The token is invalid."}
            }))]
        });
        let session = session(transport);

        let err = session.establish().await.unwrap_err();
        assert!(err.is_fatal());
        match err {
            AuthError::Rejected { code, .. } => assert_eq!(code, "InvalidToken"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_fatal() {
        let transport = ScriptedTransport::new(|_, _| vec![authorize_ok()]).refusing_connections();
        let session = session(transport);

        let err = session.establish().await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, AuthError::Correlation(CorrelationError::Transport(_))));
    }

    #[tokio::test]
    async fn test_request_requires_authentication() {
        let transport = ScriptedTransport::new(|_, _| vec![authorize_ok()]);
        let transcript = transport.transcript();
        let session = session(transport);
        session.correlator().connect().await.unwrap();

        let err = session.request(json!({"ping": 1})).await.unwrap_err();
        assert!(matches!(err, SessionError::NotAuthenticated));
        assert!(transcript.sent().is_empty());
    }

    #[tokio::test]
    async fn test_connection_loss_requires_reauth() {
        let transport = ScriptedTransport::new(|connection, req| {
            if req.get("authorize").is_some() {
                vec![authorize_ok()]
            } else if connection == 1 {
                vec![Reply::Disconnect]
            } else {
                vec![Reply::Json(json!({"msg_type": "ping", "ping": "pong"}))]
            }
        });
        let transcript = transport.transcript();
        let session = session(transport);

        session.establish().await.unwrap();
        let err = session.request(json!({"ping": 1})).await.unwrap_err();
        assert!(err.needs_reconnect());
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert!(matches!(
            session.request(json!({"ping": 1})).await,
            Err(SessionError::NotAuthenticated)
        ));

        session.establish().await.unwrap();
        let response = session.request(json!({"ping": 1})).await.unwrap();
        assert_eq!(response["ping"], "pong");

        // On the second connection authorize precedes everything else
        let second: Vec<Value> = transcript
            .entries()
            .into_iter()
            .filter_map(|e| match e {
                TranscriptEntry::Sent { connection: 2, request } => Some(request),
                _ => None,
            })
            .collect();
        assert_eq!(second.len(), 2);
        assert!(second[0].get("authorize").is_some());
        assert!(second[1].get("ping").is_some());
    }

    #[tokio::test]
    async fn test_timeout_keeps_session_authenticated() {
        let transport = ScriptedTransport::new(|_, req| {
            if req.get("authorize").is_some() {
                vec![authorize_ok()]
            } else {
                Vec::new()
            }
        });
        let session = session(transport);
        session.establish().await.unwrap();

        let err = session.request(json!({"ping": 1})).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(!err.needs_reconnect());
        assert!(session.is_authenticated());
    }
}
