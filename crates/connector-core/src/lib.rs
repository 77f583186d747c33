//! Transport abstraction for a single persistent API connection.
//!
//! A [`Transport`] owns exactly one connection and moves text frames over it.
//! It never reconnects on its own: when the peer goes away it reports
//! [`TransportError::ConnectionLost`] and drops to
//! [`ConnectionState::Disconnected`]; reconnect policy belongs to the caller.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Lifecycle of the connection held by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not establish the connection.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Frame could not be written.
    #[error("send failed: {0}")]
    Send(String),

    /// The peer closed the connection or the stream failed while reading.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Operation attempted without an open connection.
    #[error("not connected")]
    NotConnected,
}

impl TransportError {
    /// Whether the connection is gone and must be re-established.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::ConnectionLost(_) | Self::NotConnected)
    }
}

/// A persistent full-duplex text-frame connection.
#[async_trait]
pub trait Transport: Send {
    /// Open the connection, replacing any previous one.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Write one text frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Wait for the next text frame.
    ///
    /// Control frames are handled internally. Returns
    /// `TransportError::ConnectionLost` when the connection closes.
    async fn receive(&mut self) -> Result<String, TransportError>;

    /// Close the connection gracefully. Never fails.
    async fn close(&mut self);

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_loss_classification() {
        assert!(TransportError::ConnectionLost("eof".into()).is_connection_loss());
        assert!(TransportError::NotConnected.is_connection_loss());
        assert!(!TransportError::Connect("refused".into()).is_connection_loss());
        assert!(!TransportError::Send("broken pipe".into()).is_connection_loss());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
