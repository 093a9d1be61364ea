//! Single WebSocket connection with fixed-delay auto-reconnect.
//!
//! Each `WsConnection` runs as a tokio task that:
//! 1. Connects to the endpoint through a [`Connector`].
//! 2. Asks its [`ConnectionHandler`] what to send first (e.g. a subscription resync).
//! 3. Reads messages and forwards text frames to the handler.
//! 4. Writes messages queued by the owner.
//! 5. On any close or error, reports it and reconnects after a fixed delay,
//!    indefinitely, until stopped or until a hook declines to continue.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Notify, mpsc, watch};
use tokio::sync::futures::Notified;
use tracing::{debug, error, info, warn};

use super::transport::{Connector, FrameSink, WsFrame};
use crate::error::QsError;

/// Receives lifecycle events from the connection task.
///
/// Hooks run on the connection task, one at a time and in event order. The
/// ones returning `bool`/`Option` can end the loop (owner gone or connection
/// superseded).
pub trait ConnectionHandler: Send + Sync + 'static {
    /// A connection attempt is about to start. Return `false` to stop.
    fn on_connecting(&self, conn_id: usize) -> bool;

    /// The socket is open. Returns the messages to send before anything else,
    /// or `None` to close and stop.
    fn on_open(&self, conn_id: usize) -> Option<Vec<String>>;

    /// A text frame arrived.
    fn on_text(&self, conn_id: usize, text: &str);

    /// The socket closed or the attempt failed. A retry follows after the
    /// reconnect delay unless the loop is stopped.
    fn on_closed(&self, conn_id: usize);
}

/// Configuration for a single WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsConnConfig {
    /// Full WebSocket URL (e.g. `ws://127.0.0.1:8000/ws/realtime`).
    pub url: String,
    /// Fixed delay between a close and the next attempt.
    pub reconnect_delay: Duration,
    /// Connection identifier (unique per owner).
    pub id: usize,
}

/// A single WebSocket connection managed by a background tokio task.
pub struct WsConnection {
    /// Connection configuration.
    pub config: WsConnConfig,
    /// Channel to send outbound messages.
    outbound_tx: Option<mpsc::UnboundedSender<String>>,
    /// Shutdown signal sender.
    shutdown_tx: Option<watch::Sender<bool>>,
    /// Cuts a pending reconnect delay short.
    wake: Arc<Notify>,
    /// Task join handle.
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WsConnection {
    /// Create a new (not yet started) connection.
    pub fn new(config: WsConnConfig) -> Self {
        Self { config, outbound_tx: None, shutdown_tx: None, wake: Arc::new(Notify::new()), task: None }
    }

    /// Connection identifier.
    pub fn id(&self) -> usize {
        self.config.id
    }

    /// Start the connection task on the current tokio runtime.
    ///
    /// Fails if called outside a runtime.
    pub fn start(
        &mut self,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<(), QsError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| QsError::WebSocket(format!("no tokio runtime: {e}")))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let config = self.config.clone();
        let wake = self.wake.clone();

        let task = runtime.spawn(async move {
            connection_loop(config, connector, handler, outbound_rx, shutdown_rx, wake).await;
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.outbound_tx = Some(outbound_tx);
        self.task = Some(task);
        Ok(())
    }

    /// Queue a text message for the current socket. Never blocks.
    pub fn send(&self, msg: String) -> Result<(), QsError> {
        match &self.outbound_tx {
            Some(tx) => tx.send(msg).map_err(|_| QsError::WebSocket("connection task has exited".into())),
            None => Err(QsError::WebSocket("connection not started".into())),
        }
    }

    /// Skip the remainder of a pending reconnect delay.
    ///
    /// Has no effect while an attempt is in flight or a socket is open. Any
    /// call made after `on_closed` has started reaches the following wait.
    pub fn wake(&self) {
        self.wake.notify_waiters();
    }

    #[cfg(test)]
    fn wake_handle(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Ask the task to close the socket and exit, without waiting for it.
    pub fn signal_stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.outbound_tx = None;
        self.task = None;
    }

    /// Stop the connection and wait for the task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.outbound_tx = None;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// Connect, resync, pump frames, and reconnect until stopped.
async fn connection_loop(
    config: WsConnConfig,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn ConnectionHandler>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
    wake: Arc<Notify>,
) {
    let conn_id = config.id;
    let delay = config.reconnect_delay;

    loop {
        // Check shutdown before connecting
        if *shutdown_rx.borrow() {
            info!("[ws-{conn_id}] shutdown requested");
            return;
        }
        if !handler.on_connecting(conn_id) {
            debug!("[ws-{conn_id}] owner released the connection");
            return;
        }

        info!("[ws-{conn_id}] connecting to {}", config.url);

        let attempt = tokio::select! {
            res = connector.connect(&config.url) => res,
            _ = shutdown_rx.changed() => {
                info!("[ws-{conn_id}] shutdown during connect");
                return;
            }
        };

        let (mut ws_write, mut ws_read) = match attempt {
            Ok(halves) => {
                info!("[ws-{conn_id}] connected");
                halves
            }
            Err(e) => {
                error!("[ws-{conn_id}] connection failed: {e}, retrying in {delay:?}");
                let woken = wake.notified();
                handler.on_closed(conn_id);
                if !wait_for_retry(delay, &mut shutdown_rx, woken).await {
                    return;
                }
                continue;
            }
        };

        // Anything still queued was meant for the previous socket; the open
        // hook's resync supersedes it.
        let mut stale = 0usize;
        while outbound_rx.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!("[ws-{conn_id}] dropped {stale} message(s) queued for the previous socket");
        }

        let Some(initial) = handler.on_open(conn_id) else {
            let _ = ws_write.close().await;
            return;
        };

        if send_all(&mut ws_write, initial, conn_id).await {
            // Main read/write loop
            loop {
                tokio::select! {
                    // Shutdown signal
                    _ = shutdown_rx.changed() => {
                        info!("[ws-{conn_id}] shutdown signal received");
                        let _ = ws_write.close().await;
                        return;
                    }

                    // Incoming message
                    frame = ws_read.next() => {
                        match frame {
                            Some(Ok(WsFrame::Text(text))) => {
                                handler.on_text(conn_id, &text);
                            }
                            Some(Ok(WsFrame::Ping(data))) => {
                                let _ = ws_write.send(WsFrame::Pong(data)).await;
                            }
                            Some(Ok(WsFrame::Close)) => {
                                warn!("[ws-{conn_id}] received close frame");
                                break;
                            }
                            Some(Err(e)) => {
                                error!("[ws-{conn_id}] read error: {e}");
                                break;
                            }
                            None => {
                                warn!("[ws-{conn_id}] stream ended");
                                break;
                            }
                            _ => {} // Binary, Pong
                        }
                    }

                    // Outbound message from owner
                    Some(msg) = outbound_rx.recv() => {
                        debug!("[ws-{conn_id}] send: {msg}");
                        if let Err(e) = ws_write.send(WsFrame::Text(msg)).await {
                            error!("[ws-{conn_id}] send error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        // Errors are funneled into a forced close.
        let _ = ws_write.close().await;
        let woken = wake.notified();
        handler.on_closed(conn_id);

        warn!("[ws-{conn_id}] disconnected, reconnecting in {delay:?}");
        if !wait_for_retry(delay, &mut shutdown_rx, woken).await {
            return;
        }
    }
}

/// Send the open hook's messages in order. Returns `false` if the socket broke.
async fn send_all(ws_write: &mut FrameSink, msgs: Vec<String>, conn_id: usize) -> bool {
    for msg in msgs {
        debug!("[ws-{conn_id}] send: {msg}");
        if let Err(e) = ws_write.send(WsFrame::Text(msg)).await {
            error!("[ws-{conn_id}] initial send failed: {e}");
            return false;
        }
    }
    true
}

/// Sleep out the reconnect delay. Returns `false` if shutdown was requested.
///
/// `woken` is created before the close is reported, so a wake issued in
/// between still cuts the delay short.
async fn wait_for_retry(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>, woken: Notified<'_>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = woken => true,
        _ = shutdown_rx.changed() => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use tokio::time::Instant;

    use super::*;
    use crate::ws::mock::MockConnector;

    /// Records every hook call.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
        greeting: Option<String>,
        /// Fired from inside `on_closed`, before the loop starts waiting.
        wake_on_close: OnceLock<Arc<Notify>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ConnectionHandler for Recorder {
        fn on_connecting(&self, _conn_id: usize) -> bool {
            self.events.lock().unwrap().push("connecting".into());
            true
        }

        fn on_open(&self, _conn_id: usize) -> Option<Vec<String>> {
            self.events.lock().unwrap().push("open".into());
            Some(self.greeting.clone().into_iter().collect())
        }

        fn on_text(&self, _conn_id: usize, text: &str) {
            self.events.lock().unwrap().push(format!("text:{text}"));
        }

        fn on_closed(&self, _conn_id: usize) {
            self.events.lock().unwrap().push("closed".into());
            if let Some(wake) = self.wake_on_close.get() {
                wake.notify_waiters();
            }
        }
    }

    fn config() -> WsConnConfig {
        WsConnConfig { url: "ws://mock/ws/realtime".into(), reconnect_delay: Duration::from_millis(5_000), id: 7 }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn greeting_is_sent_first_then_queued_messages() {
        let (connector, mut peers) = MockConnector::new();
        let handler = Arc::new(Recorder { greeting: Some("hello".into()), ..Default::default() });
        let mut conn = WsConnection::new(config());
        conn.start(connector.clone(), handler.clone()).unwrap();

        let mut peer = peers.recv().await.unwrap();
        assert_eq!(peer.recv_text().await.as_deref(), Some("hello"));

        conn.send("second".into()).unwrap();
        assert_eq!(peer.recv_text().await.as_deref(), Some("second"));

        peer.send_text("{\"type\":\"ping\"}");
        settle().await;
        assert_eq!(handler.events(), vec!["connecting", "open", "text:{\"type\":\"ping\"}"]);
        conn.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_fixed_delay() {
        let (connector, mut peers) = MockConnector::new();
        let handler = Arc::new(Recorder::default());
        let mut conn = WsConnection::new(config());
        conn.start(connector.clone(), handler.clone()).unwrap();

        let peer = peers.recv().await.unwrap();
        settle().await;
        let closed_at = Instant::now();
        drop(peer);

        let _second = peers.recv().await.unwrap();
        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 2);
        let waited = attempts[1] - closed_at;
        assert!(waited >= Duration::from_millis(5_000), "retried after {waited:?}");
        assert!(waited < Duration::from_millis(5_050), "retried after {waited:?}");
        assert_eq!(handler.events(), vec!["connecting", "open", "closed", "connecting", "open"]);
        conn.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_fixed_not_exponential() {
        let (connector, mut peers) = MockConnector::new();
        connector.set_refuse(true);
        let handler = Arc::new(Recorder::default());
        let mut conn = WsConnection::new(config());
        conn.start(connector.clone(), handler.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(20_100)).await;
        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 5);
        for pair in attempts.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(5_000));
        }
        assert!(peers.try_recv().is_err());
        conn.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn wake_skips_the_delay() {
        let (connector, mut peers) = MockConnector::new();
        let handler = Arc::new(Recorder::default());
        let mut conn = WsConnection::new(config());
        conn.start(connector.clone(), handler.clone()).unwrap();

        let peer = peers.recv().await.unwrap();
        drop(peer);
        settle().await;
        let before = Instant::now();
        conn.wake();
        let _second = peers.recv().await.unwrap();
        assert!(Instant::now() - before < Duration::from_millis(100));
        conn.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn wake_during_close_report_is_not_lost() {
        let (connector, mut peers) = MockConnector::new();
        let handler = Arc::new(Recorder::default());
        let mut conn = WsConnection::new(config());
        let _ = handler.wake_on_close.set(conn.wake_handle());
        conn.start(connector.clone(), handler.clone()).unwrap();

        let peer = peers.recv().await.unwrap();
        settle().await;
        let closed_at = Instant::now();
        drop(peer);

        let _second = peers.recv().await.unwrap();
        assert!(Instant::now() - closed_at < Duration::from_millis(100));
        assert_eq!(connector.attempts().len(), 2);
        conn.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn answers_ping_frames() {
        let (connector, mut peers) = MockConnector::new();
        let handler = Arc::new(Recorder::default());
        let mut conn = WsConnection::new(config());
        conn.start(connector.clone(), handler.clone()).unwrap();

        let mut peer = peers.recv().await.unwrap();
        peer.send_frame(WsFrame::Ping(vec![9]));
        assert_eq!(peer.recv_frame().await, Some(WsFrame::Pong(vec![9])));
        conn.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_and_never_retries() {
        let (connector, mut peers) = MockConnector::new();
        let handler = Arc::new(Recorder::default());
        let mut conn = WsConnection::new(config());
        conn.start(connector.clone(), handler.clone()).unwrap();

        let mut peer = peers.recv().await.unwrap();
        conn.stop().await;
        assert_eq!(peer.recv_frame().await, None);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.attempts().len(), 1);
        assert!(conn.send("late".into()).is_err());
    }

    #[test]
    fn start_outside_runtime_fails() {
        let (connector, _peers) = MockConnector::new();
        let mut conn = WsConnection::new(config());
        let err = conn.start(connector, Arc::new(Recorder::default())).err();
        assert!(matches!(err, Some(QsError::WebSocket(_))));
    }
}
