//! Socket seam
//!
//! [`Connector`] dials, [`Connection`] exchanges text frames. The driver only
//! talks to these traits; [`WsConnector`] is the WebSocket implementation.

use crate::error::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// An open text-frame connection
#[async_trait]
pub trait Connection: Send {
    /// Send a text frame
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame; `None` once the peer has closed
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection; closing twice is harmless
    async fn close(&mut self);
}

/// Opens connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial `url`
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// WebSocket connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        tracing::debug!(status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WsConnection {
            stream,
            closed: false,
        }))
    }
}

/// WebSocket connection
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        if self.closed {
            return None;
        }
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "peer sent close");
                    self.closed = true;
                    return None;
                }
                // Ping/pong are answered by tungstenite; binary frames are not part of the protocol
                Ok(_) => {}
                Err(e) => return Some(Err(TransportError::Socket(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "websocket close failed");
        }
    }
}
