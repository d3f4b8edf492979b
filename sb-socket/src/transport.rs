//! Transport seam between the realtime client and the WebSocket library.
//!
//! The client only ever sees text frames and close notifications; ping/pong
//! control frames and binary payloads stay inside the transport.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use sb_core::error::{SbError, SbResult};

use crate::events::CloseInfo;

/// What travels over an open connection, as far as the client cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    /// Close frame, with status when the peer sent one.
    Close(Option<CloseInfo>),
}

pub type WireSink = Pin<Box<dyn Sink<WireMessage, Error = SbError> + Send>>;
pub type WireStream = Pin<Box<dyn Stream<Item = SbResult<WireMessage>> + Send>>;

/// Both halves of an open connection.
pub struct Connection {
    pub sink: WireSink,
    pub stream: WireStream,
}

impl Connection {
    pub fn new(sink: WireSink, stream: WireStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens connections to a socket URL.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform the handshake. An error means the socket never opened.
    async fn connect(&self, url: &str) -> SbResult<Connection>;
}

/// Production transport over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    handshake_timeout: Duration,
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl TungsteniteTransport {
    pub fn with_handshake_timeout(handshake_timeout: Duration) -> Self {
        Self { handshake_timeout }
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> SbResult<Connection> {
        let (ws, response) =
            tokio::time::timeout(self.handshake_timeout, tokio_tungstenite::connect_async(url))
                .await
                .map_err(|_| SbError::Timeout("websocket handshake".into()))?
                .map_err(|e| SbError::Socket(format!("handshake failed: {e}")))?;
        debug!("websocket handshake complete (status {})", response.status());

        let (sink, stream) = ws.split();

        let stream = stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(WireMessage::Text(text.as_str().to_owned()))),
                Ok(Message::Close(frame)) => Some(Ok(WireMessage::Close(frame.map(|f| {
                    CloseInfo::new(u16::from(f.code), f.reason.as_str())
                })))),
                Ok(_) => None,
                Err(e) => Some(Err(SbError::Socket(e.to_string()))),
            }
        });

        let sink = sink
            .sink_map_err(|e| SbError::Socket(e.to_string()))
            .with(|msg: WireMessage| async move { Ok::<_, SbError>(to_tungstenite(msg)) });

        Ok(Connection::new(Box::pin(sink), Box::pin(stream)))
    }
}

fn to_tungstenite(msg: WireMessage) -> Message {
    match msg {
        WireMessage::Text(text) => Message::text(text),
        WireMessage::Close(info) => Message::Close(info.map(|info| CloseFrame {
            code: CloseCode::from(info.code),
            reason: info.reason.into(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_frame_conversion() {
        match to_tungstenite(WireMessage::Close(Some(CloseInfo::new(1000, "bye")))) {
            Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1000);
                assert_eq!(frame.reason.as_str(), "bye");
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(matches!(
            to_tungstenite(WireMessage::Close(None)),
            Message::Close(None)
        ));
    }

    #[test]
    fn test_text_conversion() {
        match to_tungstenite(WireMessage::Text(r#"{"type":"ping"}"#.into())) {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"type":"ping"}"#),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_refused_is_error() {
        // Port 9 (discard) is essentially never listening on localhost.
        let transport = TungsteniteTransport::with_handshake_timeout(Duration::from_secs(2));
        let result = transport.connect("ws://127.0.0.1:9/ws/chat/c1").await;
        assert!(result.is_err());
    }
}
