//! Realtime channel transport port
//!
//! A transport opens a connection that is split into a sending and a
//! receiving half so both can be driven concurrently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// A `{type, payload}` message on the realtime channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ChannelFrame {
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// Sending half of an open connection
#[async_trait]
pub trait FrameSender: Send {
    async fn send(&mut self, frame: ChannelFrame) -> Result<(), ChannelError>;

    /// Close the connection politely
    async fn close(&mut self);
}

/// Receiving half of an open connection
#[async_trait]
pub trait FrameReceiver: Send {
    /// Next inbound frame; `None` once the connection is closed
    ///
    /// A malformed frame yields `Some(Err(ChannelError::Protocol))` and the
    /// connection stays usable.
    async fn recv(&mut self) -> Option<Result<ChannelFrame, ChannelError>>;
}

/// An open connection
pub struct ChannelConnection {
    pub sender: Box<dyn FrameSender>,
    pub receiver: Box<dyn FrameReceiver>,
}

impl std::fmt::Debug for ChannelConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConnection").finish_non_exhaustive()
    }
}

/// Port for establishing realtime connections
#[async_trait]
pub trait ChannelTransport: Send + Sync + std::fmt::Debug {
    async fn connect(&self) -> Result<ChannelConnection, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_wire_format() {
        let frame = ChannelFrame::new("search_request", serde_json::json!({"query": "pizza"}));
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"search_request\""));

        let parsed: ChannelFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(parsed.kind, "ping");
        assert!(parsed.payload.is_null());
    }
}
