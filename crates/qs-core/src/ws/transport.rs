//! Transport seam between the connection loop and the socket library.
//!
//! The loop only sees [`WsFrame`]s flowing through a boxed sink/stream pair,
//! so the production connector (tokio-tungstenite) and the in-memory test
//! connector are interchangeable.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::tungstenite::Message;

use crate::error::QsError;

/// A WebSocket frame, independent of the socket library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

impl WsFrame {
    fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(Self::Text(text.to_string())),
            Message::Binary(data) => Some(Self::Binary(data.to_vec())),
            Message::Ping(data) => Some(Self::Ping(data.to_vec())),
            Message::Pong(data) => Some(Self::Pong(data.to_vec())),
            Message::Close(_) => Some(Self::Close),
            Message::Frame(_) => None, // raw frames never surface when reading
        }
    }

    fn into_message(self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text.into()),
            Self::Binary(data) => Message::Binary(data.into()),
            Self::Ping(data) => Message::Ping(data.into()),
            Self::Pong(data) => Message::Pong(data.into()),
            Self::Close => Message::Close(None),
        }
    }
}

/// Write half of an open connection.
pub type FrameSink = Pin<Box<dyn Sink<WsFrame, Error = QsError> + Send>>;

/// Read half of an open connection. Ends when the peer goes away.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<WsFrame, QsError>> + Send>>;

/// Opens connections for the connection loop.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connect to `url` and complete the handshake.
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), QsError>;
}

/// Production connector over `tokio-tungstenite` (TLS for `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), QsError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| QsError::WebSocket(format!("connect {url}: {e}")))?;

        let (write, read) = stream.split();

        let sink = write
            .sink_map_err(|e| QsError::WebSocket(e.to_string()))
            .with(|frame: WsFrame| future::ready(Ok::<Message, QsError>(frame.into_message())));

        let stream = read.filter_map(|msg| {
            future::ready(match msg {
                Ok(m) => WsFrame::from_message(m).map(Ok),
                Err(e) => Some(Err(QsError::WebSocket(e.to_string()))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_message_mapping() {
        let text = WsFrame::Text("{\"type\":\"ping\"}".into());
        let msg = text.clone().into_message();
        assert!(matches!(msg, Message::Text(_)));
        assert_eq!(WsFrame::from_message(msg), Some(text));

        let ping = WsFrame::Ping(vec![1, 2]);
        assert_eq!(WsFrame::from_message(ping.clone().into_message()), Some(ping));
        assert_eq!(WsFrame::from_message(Message::Close(None)), Some(WsFrame::Close));
    }

    #[tokio::test]
    async fn connect_refused_is_websocket_error() {
        // Port 1 on loopback is never listening in test environments.
        let err = TungsteniteConnector.connect("ws://127.0.0.1:1/ws/realtime").await.err();
        assert!(matches!(err, Some(QsError::WebSocket(_))));
    }
}
