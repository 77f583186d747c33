use async_trait::async_trait;
use connector_core::{ConnectionState, Transport, TransportError};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Timeout for WebSocket connection attempts.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on the closing handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`Transport`] over a single WebSocket connection.
pub struct WsTransport {
    url: String,
    connect_timeout: Duration,
    stream: Option<WsStream>,
    state: ConnectionState,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: CONNECTION_TIMEOUT,
            stream: None,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn mark_lost(&mut self, reason: String) -> TransportError {
        self.stream = None;
        self.state = ConnectionState::Disconnected;
        TransportError::ConnectionLost(reason)
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            self.close().await;
        }

        info!(url = %self.url, "Connecting to WebSocket");
        self.state = ConnectionState::Connecting;

        let result = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await;
        match result {
            Ok(Ok((stream, _))) => {
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                info!("Connected to WebSocket");
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                Err(TransportError::Connect(e.to_string()))
            }
            Err(_) => {
                self.state = ConnectionState::Disconnected;
                Err(TransportError::Connect("connection timeout".to_string()))
            }
        }
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        match stream.send(Message::Text(frame)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Failed to send frame");
                Err(self.mark_lost(e.to_string()))
            }
        }
    }

    async fn receive(&mut self) -> Result<String, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let reason = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(text),
                    Err(e) => warn!(error = %e, "Dropping non UTF-8 binary frame"),
                },
                Some(Ok(Message::Ping(data))) => {
                    // Respond with Pong to keep connection alive
                    debug!("Received Ping, sending Pong");
                    if let Err(e) = stream.send(Message::Pong(data)).await {
                        warn!(error = %e, "Failed to send Pong");
                        break e.to_string();
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "WebSocket closed by server");
                    break "closed by server".to_string();
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket error");
                    break e.to_string();
                }
                None => {
                    info!("WebSocket stream ended");
                    break "stream ended".to_string();
                }
            }
        };

        Err(self.mark_lost(reason))
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            self.state = ConnectionState::Closing;
            // Try to send close frame gracefully
            match tokio::time::timeout(CLOSE_TIMEOUT, stream.close(None)).await {
                Ok(_) => debug!("WebSocket closed"),
                Err(_) => warn!("WebSocket close timed out, dropping connection"),
            }
        }
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Loopback server that runs `script` against the first accepted client.
    async fn serve_once<F, Fut>(script: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let ws = accept_async(socket).await.unwrap();
            script(ws).await;
        });
        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_send_and_receive_text() {
        let url = serve_once(|mut ws| async move {
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(format!("echo:{}", text))).await.unwrap();
            }
        })
        .await;

        let mut transport = WsTransport::new(url);
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        transport.send("hello".into()).await.unwrap();
        assert_eq!(transport.receive().await.unwrap(), "echo:hello");

        transport.close().await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_ping_answered_transparently() {
        let url = serve_once(|mut ws| async move {
            ws.send(Message::Ping(vec![7])).await.unwrap();
            ws.send(Message::Text("after-ping".into())).await.unwrap();
            // Client must answer the ping
            loop {
                match ws.next().await {
                    Some(Ok(Message::Pong(data))) => {
                        assert_eq!(data, vec![7]);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    _ => panic!("expected pong"),
                }
            }
            ws.send(Message::Text("pong-seen".into())).await.unwrap();
        })
        .await;

        let mut transport = WsTransport::new(url);
        transport.connect().await.unwrap();
        assert_eq!(transport.receive().await.unwrap(), "after-ping");
        assert_eq!(transport.receive().await.unwrap(), "pong-seen");
    }

    #[tokio::test]
    async fn test_server_close_reports_connection_lost() {
        let url = serve_once(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WsTransport::new(url);
        transport.connect().await.unwrap();

        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionLost(_)));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(
            transport.send("late".into()).await,
            Err(TransportError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_close_with_silent_peer_is_bounded() {
        let url = serve_once(|ws| async move {
            // Hold the socket open without reading from it
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(ws);
        })
        .await;

        let mut transport = WsTransport::new(url);
        transport.connect().await.unwrap();

        let closed = tokio::time::timeout(CLOSE_TIMEOUT + Duration::from_secs(1), transport.close()).await;
        assert!(closed.is_ok());
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = WsTransport::new(format!("ws://{}", addr))
            .with_connect_timeout(Duration::from_secs(2));
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_receive_without_connection() {
        let mut transport = WsTransport::new("ws://127.0.0.1:1");
        assert_eq!(transport.receive().await, Err(TransportError::NotConnected));
    }
}
