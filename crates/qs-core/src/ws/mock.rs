//! In-memory connector for tests.
//!
//! Every successful [`Connector::connect`] hands the test a [`MockPeer`] (the
//! server side of the socket) through the receiver returned by
//! [`MockConnector::new`]. Dropping the peer ends the client's read stream,
//! which the connection loop treats as a server-side close.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::transport::{Connector, FrameSink, FrameStream, WsFrame};
use crate::error::QsError;

/// Scriptable connector recording when each attempt happened.
pub struct MockConnector {
    attempts: Mutex<Vec<Instant>>,
    urls: Mutex<Vec<String>>,
    refuse: AtomicBool,
    peers_tx: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// Create a connector and the receiver that yields one peer per accepted
    /// connection.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            attempts: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
            peers_tx,
        });
        (connector, peers_rx)
    }

    /// Make subsequent attempts fail with a handshake error.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Instants of every attempt so far, accepted or refused.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// URLs of every attempt so far.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), QsError> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).push(Instant::now());
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).push(url.to_string());

        if self.refuse.load(Ordering::SeqCst) {
            return Err(QsError::WebSocket(format!("connect {url}: connection refused")));
        }

        let (client_tx, from_client) = mpsc::unbounded_channel::<WsFrame>();
        let (to_client, client_rx) = mpsc::unbounded_channel::<WsFrame>();

        let sink = sink::unfold(client_tx, |tx, frame: WsFrame| async move {
            tx.send(frame).map_err(|_| QsError::WebSocket("peer hung up".into()))?;
            Ok::<_, QsError>(tx)
        });
        let stream = stream::unfold(client_rx, |mut rx| async move { rx.recv().await.map(|f| (Ok::<_, QsError>(f), rx)) });

        self.peers_tx
            .send(MockPeer { from_client, to_client })
            .map_err(|_| QsError::WebSocket("test dropped the peer receiver".into()))?;

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

/// Server side of one mock connection.
pub struct MockPeer {
    from_client: mpsc::UnboundedReceiver<WsFrame>,
    to_client: mpsc::UnboundedSender<WsFrame>,
}

impl MockPeer {
    /// Push a text frame to the client.
    pub fn send_text(&self, text: &str) {
        self.send_frame(WsFrame::Text(text.to_string()));
    }

    /// Push any frame to the client.
    pub fn send_frame(&self, frame: WsFrame) {
        let _ = self.to_client.send(frame);
    }

    /// Next frame written by the client; `None` once the client side is gone.
    pub async fn recv_frame(&mut self) -> Option<WsFrame> {
        self.from_client.recv().await
    }

    /// Next text frame written by the client, skipping control frames.
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.from_client.recv().await? {
                WsFrame::Text(text) => return Some(text),
                _ => continue,
            }
        }
    }

    /// A text frame the client already wrote, without waiting.
    pub fn try_recv_text(&mut self) -> Option<String> {
        while let Ok(frame) = self.from_client.try_recv() {
            if let WsFrame::Text(text) = frame {
                return Some(text);
            }
        }
        None
    }
}
