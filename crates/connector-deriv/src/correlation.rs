//! Request/response correlation over the shared connection.
//!
//! Every outgoing request is stamped with a fresh `req_id`, which the venue
//! echoes on its reply:
//! 1. Allocate the next `req_id`
//! 2. Register it in the [`PendingRequestRegistry`]
//! 3. Send the frame and read frames until the one carrying that `req_id`
//! 4. Remove the entry on match, timeout, or connection loss
//!
//! The transport sits behind an async mutex held for the whole round-trip, so
//! at most one request is in flight. Frames that do not match (late replies
//! to timed-out requests, pushes, frames without `req_id`) are discarded.

use crate::error::CorrelationError;
use crate::protocol::{msg_type, response_req_id, REQ_ID_FIELD};
use connector_core::{Transport, TransportError};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A request awaiting its response.
#[derive(Debug, Clone, Copy)]
pub struct PendingRequest {
    pub req_id: u64,
    pub sent_at: Instant,
}

/// Thread-safe table of outstanding requests keyed by `req_id`.
pub struct PendingRequestRegistry {
    pending: DashMap<u64, PendingRequest>,
}

impl Default for PendingRequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Register a request right before it is written.
    pub fn register(&self, req_id: u64) {
        self.pending.insert(
            req_id,
            PendingRequest {
                req_id,
                sent_at: Instant::now(),
            },
        );
    }

    /// Remove and return the entry for a matched response.
    ///
    /// Returns `None` for ids that are not outstanding, so a response can
    /// never be matched twice.
    pub fn resolve(&self, req_id: u64) -> Option<PendingRequest> {
        self.pending.remove(&req_id).map(|(_, entry)| entry)
    }

    pub fn contains(&self, req_id: u64) -> bool {
        self.pending.contains_key(&req_id)
    }

    /// Drop every entry. Called on connect and on connection loss.
    pub fn clear(&self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Matches responses to requests over one [`Transport`].
pub struct Correlator<T> {
    transport: Mutex<T>,
    pending: PendingRequestRegistry,
    next_req_id: AtomicU64,
}

impl<T: Transport> Correlator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
            pending: PendingRequestRegistry::new(),
            next_req_id: AtomicU64::new(1),
        }
    }

    /// Open (or re-open) the underlying connection.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let mut transport = self.transport.lock().await;
        self.pending.clear();
        transport.connect().await
    }

    pub async fn close(&self) {
        let mut transport = self.transport.lock().await;
        self.pending.clear();
        transport.close().await;
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Outstanding requests. Empty whenever no call is in progress.
    pub fn pending(&self) -> &PendingRequestRegistry {
        &self.pending
    }

    /// Send `request` and wait up to `timeout` for the response carrying its
    /// `req_id`.
    ///
    /// `request` must be a JSON object; any `req_id` it already has is
    /// overwritten. The timeout covers writing the request and waiting for
    /// the response, not the wait for earlier callers to finish.
    pub async fn send_and_await(
        &self,
        mut request: Value,
        timeout: Duration,
    ) -> Result<Value, CorrelationError> {
        let fields = request
            .as_object_mut()
            .ok_or(CorrelationError::InvalidRequest)?;

        let mut transport = self.transport.lock().await;

        let req_id = self.next_req_id.fetch_add(1, Ordering::Relaxed);
        fields.insert(REQ_ID_FIELD.to_string(), Value::from(req_id));

        self.pending.register(req_id);
        let exchange = Self::exchange(&mut *transport, request.to_string(), req_id);

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(response)) => {
                if let Some(entry) = self.pending.resolve(req_id) {
                    debug!(
                        req_id,
                        msg_type = msg_type(&response),
                        elapsed_ms = entry.sent_at.elapsed().as_millis() as u64,
                        "Response matched"
                    );
                }
                Ok(response)
            }
            Ok(Err(e)) => {
                self.pending.clear();
                Err(e)
            }
            Err(_) => {
                self.pending.resolve(req_id);
                warn!(req_id, timeout_ms = timeout.as_millis() as u64, "Request timed out");
                Err(CorrelationError::Timeout {
                    req_id,
                    after: timeout,
                })
            }
        }
    }

    async fn exchange(transport: &mut T, frame: String, req_id: u64) -> Result<Value, CorrelationError> {
        if let Err(e) = transport.send(frame).await {
            warn!(req_id, error = %e, "Failed to send request");
            return Err(e.into());
        }
        Self::await_response(transport, req_id).await
    }

    async fn await_response(transport: &mut T, req_id: u64) -> Result<Value, CorrelationError> {
        loop {
            let text = match transport.receive().await {
                Ok(text) => text,
                Err(e) if e.is_connection_loss() => {
                    warn!(req_id, error = %e, "Connection lost while awaiting response");
                    return Err(CorrelationError::ConnectionLost(e.to_string()));
                }
                Err(e) => return Err(e.into()),
            };

            let frame: Value = match serde_json::from_str(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "Discarding undecodable frame");
                    continue;
                }
            };

            match response_req_id(&frame) {
                Some(id) if id == req_id => return Ok(frame),
                Some(id) => debug!(
                    req_id = id,
                    awaiting = req_id,
                    msg_type = msg_type(&frame),
                    "Discarding stale response"
                ),
                None => debug!(msg_type = msg_type(&frame), "Discarding unsolicited frame"),
            }
        }
    }
}
