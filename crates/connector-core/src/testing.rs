//! Scripted in-memory transport for tests.
//!
//! Every frame sent through a [`ScriptedTransport`] is parsed as JSON, recorded
//! in a shared [`Transcript`], and handed to a responder closure that decides
//! what the fake server answers. Replies are queued and returned by
//! `receive()`; when nothing is queued `receive()` never completes, like a
//! server that stays silent.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{ConnectionState, Transport, TransportError};

/// What the fake server does in response to one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// JSON reply; the request's `req_id` is copied in unless already present.
    Json(Value),
    /// A frame sent verbatim (unsolicited pushes, stale replies, garbage).
    Raw(String),
    /// Drop the connection once the frames queued before it are read.
    Disconnect,
}

/// Decides the replies to a request. Receives the 1-based connection number.
pub type Responder = Box<dyn FnMut(usize, &Value) -> Vec<Reply> + Send>;

/// One recorded transport event.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Connected { connection: usize },
    ConnectFailed { attempt: usize },
    Sent { connection: usize, request: Value },
    Closed { connection: usize },
}

/// Shared, cloneable record of everything the transport did.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<TranscriptEntry>>>);

impl Transcript {
    fn push(&self, entry: TranscriptEntry) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.0.lock().clone()
    }

    /// Every request sent, in order.
    pub fn sent(&self) -> Vec<Value> {
        self.0
            .lock()
            .iter()
            .filter_map(|e| match e {
                TranscriptEntry::Sent { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Requests carrying the given top-level key (e.g. `"buy"`).
    pub fn sent_with_key(&self, key: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|r| r.get(key).is_some())
            .collect()
    }

    /// Number of successful connects.
    pub fn connections(&self) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::Connected { .. }))
            .count()
    }

    /// Number of failed connect attempts.
    pub fn failed_connects(&self) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::ConnectFailed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
enum ConnectFailures {
    None,
    First(usize),
    Always,
}

enum Inbound {
    Frame(String),
    Drop,
}

/// In-memory [`Transport`] driven by a responder closure.
pub struct ScriptedTransport {
    responder: Responder,
    transcript: Transcript,
    inbound: VecDeque<Inbound>,
    state: ConnectionState,
    connect_failures: ConnectFailures,
    connect_attempts: usize,
    connection: usize,
}

impl ScriptedTransport {
    pub fn new(responder: impl FnMut(usize, &Value) -> Vec<Reply> + Send + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            transcript: Transcript::default(),
            inbound: VecDeque::new(),
            state: ConnectionState::Disconnected,
            connect_failures: ConnectFailures::None,
            connect_attempts: 0,
            connection: 0,
        }
    }

    /// Fail the first `n` connect attempts.
    pub fn with_connect_failures(mut self, n: usize) -> Self {
        self.connect_failures = ConnectFailures::First(n);
        self
    }

    /// Fail every connect attempt.
    pub fn refusing_connections(mut self) -> Self {
        self.connect_failures = ConnectFailures::Always;
        self
    }

    /// Handle to the transcript; stays valid after the transport is moved.
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    fn connect_should_fail(&self) -> bool {
        match self.connect_failures {
            ConnectFailures::None => false,
            ConnectFailures::First(n) => self.connect_attempts <= n,
            ConnectFailures::Always => true,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connect_attempts += 1;
        self.inbound.clear();

        if self.connect_should_fail() {
            self.state = ConnectionState::Disconnected;
            self.transcript.push(TranscriptEntry::ConnectFailed {
                attempt: self.connect_attempts,
            });
            return Err(TransportError::Connect("connection refused".into()));
        }

        self.connection += 1;
        self.state = ConnectionState::Connected;
        self.transcript.push(TranscriptEntry::Connected {
            connection: self.connection,
        });
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if self.state != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }

        let request: Value = serde_json::from_str(&frame)
            .map_err(|e| TransportError::Send(format!("test transport expects JSON: {}", e)))?;

        self.transcript.push(TranscriptEntry::Sent {
            connection: self.connection,
            request: request.clone(),
        });

        for reply in (self.responder)(self.connection, &request) {
            match reply {
                Reply::Json(mut body) => {
                    if let (Some(req_id), Some(obj)) = (request.get("req_id"), body.as_object_mut()) {
                        obj.entry("req_id").or_insert_with(|| req_id.clone());
                    }
                    self.inbound.push_back(Inbound::Frame(body.to_string()));
                }
                Reply::Raw(text) => self.inbound.push_back(Inbound::Frame(text)),
                Reply::Disconnect => self.inbound.push_back(Inbound::Drop),
            }
        }

        Ok(())
    }

    async fn receive(&mut self) -> Result<String, TransportError> {
        if self.state != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }

        match self.inbound.pop_front() {
            Some(Inbound::Frame(text)) => Ok(text),
            Some(Inbound::Drop) => {
                self.state = ConnectionState::Disconnected;
                self.inbound.clear();
                Err(TransportError::ConnectionLost("scripted disconnect".into()))
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        if self.state == ConnectionState::Connected {
            self.transcript.push(TranscriptEntry::Closed {
                connection: self.connection,
            });
        }
        self.state = ConnectionState::Disconnected;
        self.inbound.clear();
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_reply_echoes_req_id() {
        let mut transport =
            ScriptedTransport::new(|_, _| vec![Reply::Json(json!({"msg_type": "ping", "ping": "pong"}))]);
        transport.connect().await.unwrap();
        transport
            .send(json!({"ping": 1, "req_id": 7}).to_string())
            .await
            .unwrap();

        let reply: Value = serde_json::from_str(&transport.receive().await.unwrap()).unwrap();
        assert_eq!(reply["req_id"], 7);
        assert_eq!(transport.transcript().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_reply() {
        let mut transport = ScriptedTransport::new(|_, _| vec![Reply::Disconnect]);
        transport.connect().await.unwrap();
        transport.send(json!({"ping": 1}).to_string()).await.unwrap();

        let err = transport.receive().await.unwrap_err();
        assert!(err.is_connection_loss());
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(
            transport.send("{}".into()).await,
            Err(TransportError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_connect_failures_then_success() {
        let mut transport = ScriptedTransport::new(|_, _| Vec::new()).with_connect_failures(2);
        let transcript = transport.transcript();

        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_ok());
        assert_eq!(transcript.failed_connects(), 2);
        assert_eq!(transcript.connections(), 1);
    }

    #[tokio::test]
    async fn test_silent_server_never_answers() {
        let mut transport = ScriptedTransport::new(|_, _| Vec::new());
        transport.connect().await.unwrap();
        transport.send(json!({"ping": 1}).to_string()).await.unwrap();

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), transport.receive()).await;
        assert!(waited.is_err());
    }
}
