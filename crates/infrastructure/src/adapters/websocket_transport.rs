//! WebSocket transport for the realtime channel
//!
//! Frames travel as JSON text messages of the form `{"type": .., "payload": ..}`.
//! The socket is split so the channel can read and write concurrently.

use application::error::ChannelError;
use application::ports::{
    ChannelConnection, ChannelFrame, ChannelTransport, FrameReceiver, FrameSender,
};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, instrument, trace};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to a realtime endpoint over WebSocket
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: Option<String>,
}

impl WebSocketTransport {
    /// Create a transport; without a URL every connect attempt fails
    #[must_use]
    pub const fn new(url: Option<String>) -> Self {
        Self { url }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

#[async_trait]
impl ChannelTransport for WebSocketTransport {
    #[instrument(skip(self), fields(url = self.url.as_deref().unwrap_or("<unset>")))]
    async fn connect(&self) -> Result<ChannelConnection, ChannelError> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| ChannelError::ConnectFailed("no realtime endpoint configured".into()))?;

        let (socket, response) = connect_async(url)
            .await
            .map_err(|e| ChannelError::ConnectFailed(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket connected");

        let (sink, stream) = socket.split();
        Ok(ChannelConnection {
            sender: Box::new(WebSocketSender { sink }),
            receiver: Box::new(WebSocketReceiver { stream }),
        })
    }
}

struct WebSocketSender {
    sink: SplitSink<Socket, Message>,
}

#[async_trait]
impl FrameSender for WebSocketSender {
    async fn send(&mut self, frame: ChannelFrame) -> Result<(), ChannelError> {
        let text =
            serde_json::to_string(&frame).map_err(|e| ChannelError::Protocol(e.to_string()))?;
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| match e {
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                    ChannelError::Closed
                },
                other => ChannelError::Protocol(other.to_string()),
            })
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            trace!(error = %e, "WebSocket close failed");
        }
    }
}

struct WebSocketReceiver {
    stream: SplitStream<Socket>,
}

fn decode(bytes: &[u8]) -> Result<ChannelFrame, ChannelError> {
    serde_json::from_slice(bytes).map_err(|e| ChannelError::Protocol(e.to_string()))
}

#[async_trait]
impl FrameReceiver for WebSocketReceiver {
    async fn recv(&mut self) -> Option<Result<ChannelFrame, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(decode(text.as_bytes())),
                Ok(Message::Binary(bytes)) => return Some(decode(&bytes)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by peer");
                    return None;
                },
                // Ping, pong and raw frames carry no channel data
                Ok(_) => {},
                Err(e) => {
                    debug!(error = %e, "WebSocket read failed");
                    return None;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_url_fails_to_connect() {
        let transport = WebSocketTransport::new(None);
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, ChannelError::ConnectFailed(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_to_connect() {
        let transport = WebSocketTransport::new(Some("ws://127.0.0.1:9/ws".to_string()));
        assert!(matches!(
            transport.connect().await,
            Err(ChannelError::ConnectFailed(_))
        ));
    }

    #[test]
    fn decode_rejects_non_frames() {
        assert!(matches!(decode(b"not json"), Err(ChannelError::Protocol(_))));
        let frame = decode(br#"{"type":"search_results","payload":{"id":"1"}}"#).unwrap();
        assert_eq!(frame.kind, "search_results");
    }
}
