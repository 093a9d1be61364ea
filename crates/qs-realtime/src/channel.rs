//! The realtime quote channel.
//!
//! One [`QuoteChannel`] owns one logical streaming connection to the quote
//! feed, the client-side subscription set, the connection status and the
//! per-symbol quote snapshot.
//!
//! # Behavior
//!
//! - `connect()` opens the stream unless one is open or being opened. When a
//!   socket opens, the whole subscription set is replayed in a single
//!   `subscribe` message.
//! - `subscribe()` / `unsubscribe()` update the set immediately and, only if
//!   the socket is open, send a message for the requested symbols.
//! - Any close or error makes the status `Disconnected` and schedules another
//!   attempt after the fixed reconnect delay, forever.
//! - `disconnect()` (or dropping the last handle) closes the socket and
//!   cancels the retry.
//!
//! No operation blocks or returns an error; failures are logged and healed by
//! the retry loop.
//!
//! # Observing
//!
//! Status and quotes are published through [`tokio::sync::watch`]. Do not hold
//! a `borrow()` guard across calls into the channel.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use qs_core::config::DEFAULT_RECONNECT_DELAY_MS;
use qs_core::types::{
    ClientCommand, ConnectionStatus, QuoteBook, RealtimeQuote, ServerMessage, normalize_ts_codes, parse_server_message,
};
use qs_core::ws::{ConnectionHandler, Connector, TungsteniteConnector, WsConnConfig, WsConnection};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::RealtimeSettings;

/// Channel parameters.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Stream endpoint, e.g. `ws://127.0.0.1:8000/ws/realtime`.
    pub url: String,
    /// Fixed delay between a close and the next attempt.
    pub reconnect_delay: Duration,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS) }
    }
}

impl From<&RealtimeSettings> for ChannelConfig {
    fn from(s: &RealtimeSettings) -> Self {
        Self { url: s.ws_url.clone(), reconnect_delay: s.reconnect_delay }
    }
}

/// Cloneable handle to a realtime quote channel.
#[derive(Clone)]
pub struct QuoteChannel {
    inner: Arc<Inner>,
}

struct Inner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    status: watch::Sender<ConnectionStatus>,
    quotes: watch::Sender<QuoteBook>,
    shared: Mutex<Shared>,
}

/// State guarded together so status transitions, the open flag and the
/// subscription set never disagree.
struct Shared {
    subscriptions: BTreeSet<String>,
    active: Option<ActiveConnection>,
    next_conn_id: usize,
}

struct ActiveConnection {
    conn: WsConnection,
    open: bool,
}

impl Shared {
    /// The active connection, if `conn_id` still names it.
    fn current(&mut self, conn_id: usize) -> Option<&mut ActiveConnection> {
        self.active.as_mut().filter(|a| a.conn.id() == conn_id)
    }

    /// The active connection, if its socket is open.
    fn open_connection(&self) -> Option<&WsConnection> {
        self.active.as_ref().filter(|a| a.open).map(|a| &a.conn)
    }
}

impl QuoteChannel {
    /// Create a channel over the production WebSocket connector.
    pub fn new(config: ChannelConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    /// Create a channel over a custom connector.
    pub fn with_connector(config: ChannelConfig, connector: Arc<dyn Connector>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let (quotes, _) = watch::channel(QuoteBook::default());
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                status,
                quotes,
                shared: Mutex::new(Shared { subscriptions: BTreeSet::new(), active: None, next_conn_id: 0 }),
            }),
        }
    }

    /// Open the stream.
    ///
    /// No-op while a socket is open or an attempt is in flight. While waiting
    /// out the reconnect delay, retries immediately instead. Either way the
    /// status reads `Connecting` on return unless a socket is open.
    pub fn connect(&self) {
        let mut shared = self.inner.lock();

        if let Some(active) = &shared.active {
            if !active.open {
                active.conn.wake();
                self.inner.set_status(ConnectionStatus::Connecting);
            }
            return;
        }

        let conn_id = shared.next_conn_id;
        shared.next_conn_id += 1;

        let mut conn = WsConnection::new(WsConnConfig {
            url: self.inner.config.url.clone(),
            reconnect_delay: self.inner.config.reconnect_delay,
            id: conn_id,
        });
        let hooks = Arc::new(ChannelHooks { inner: Arc::downgrade(&self.inner) });
        if let Err(e) = conn.start(self.inner.connector.clone(), hooks) {
            error!("[quotes] cannot start connection: {e}");
            return;
        }

        info!("[quotes] connecting to {}", self.inner.config.url);
        shared.active = Some(ActiveConnection { conn, open: false });
        self.inner.set_status(ConnectionStatus::Connecting);
    }

    /// Close the stream and cancel any pending retry. Idempotent.
    pub fn disconnect(&self) {
        let mut shared = self.inner.lock();
        if let Some(mut active) = shared.active.take() {
            info!("[quotes] disconnecting (ws-{})", active.conn.id());
            active.conn.signal_stop();
        }
        self.inner.set_status(ConnectionStatus::Disconnected);
    }

    /// Track `symbols`. If the socket is open, a `subscribe` message for just
    /// these symbols goes out now; otherwise the next open's resync covers them.
    pub fn subscribe<I, S>(&self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = normalize_ts_codes(symbols);
        if codes.is_empty() {
            return;
        }

        let mut shared = self.inner.lock();
        shared.subscriptions.extend(codes.iter().cloned());
        debug!("[quotes] tracking {} symbol(s)", shared.subscriptions.len());

        if let Some(conn) = shared.open_connection() {
            send_command(conn, &ClientCommand::subscribe(codes));
        }
    }

    /// Stop tracking `symbols`, telling the server right away if connected.
    pub fn unsubscribe<I, S>(&self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = normalize_ts_codes(symbols);
        if codes.is_empty() {
            return;
        }

        let mut shared = self.inner.lock();
        for code in &codes {
            shared.subscriptions.remove(code);
        }
        debug!("[quotes] tracking {} symbol(s)", shared.subscriptions.len());

        if let Some(conn) = shared.open_connection() {
            send_command(conn, &ClientCommand::unsubscribe(codes));
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Receiver notified on every status transition.
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Tracked symbols, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.lock().subscriptions.iter().cloned().collect()
    }

    /// Latest snapshot for one symbol.
    pub fn quote(&self, ts_code: &str) -> Option<RealtimeQuote> {
        self.inner.quotes.borrow().get(ts_code).cloned()
    }

    /// Copy of every snapshot received so far.
    pub fn quotes(&self) -> QuoteBook {
        self.inner.quotes.borrow().clone()
    }

    /// Receiver notified on every snapshot replacement.
    pub fn quotes_watch(&self) -> watch::Receiver<QuoteBook> {
        self.inner.quotes.subscribe()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a status; watchers only hear about actual transitions.
    fn set_status(&self, next: ConnectionStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn apply_inbound(&self, text: &str) {
        let msg = match parse_server_message(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("[quotes] discarding malformed message: {e}");
                return;
            }
        };

        match msg {
            ServerMessage::Quote(quote) => {
                self.quotes.send_modify(|book| {
                    book.insert(quote.ts_code().to_string(), quote);
                });
            }
            ServerMessage::Ping => {}
            ServerMessage::Error { message } => {
                warn!("[quotes] server error: {}", message.as_deref().unwrap_or("(no message)"));
            }
            ServerMessage::Subscribed { ts_codes } => {
                debug!("[quotes] server confirms {} subscription(s)", ts_codes.len());
            }
            ServerMessage::Unsubscribed { ts_codes } => {
                debug!("[quotes] server confirms {} subscription(s) remain", ts_codes.len());
            }
            ServerMessage::Unrecognized => {
                debug!("[quotes] ignoring unrecognized message");
            }
        }
    }
}

fn send_command(conn: &WsConnection, cmd: &ClientCommand) {
    match cmd.to_json() {
        Ok(text) => {
            if let Err(e) = conn.send(text) {
                warn!("[quotes] send failed: {e}");
            }
        }
        Err(e) => error!("[quotes] cannot encode command: {e}"),
    }
}

/// Connection hooks. Holds the channel weakly so dropping the last
/// [`QuoteChannel`] handle ends the connection task.
struct ChannelHooks {
    inner: Weak<Inner>,
}

impl ConnectionHandler for ChannelHooks {
    fn on_connecting(&self, conn_id: usize) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut shared = inner.lock();
        if shared.current(conn_id).is_none() {
            return false;
        }
        inner.set_status(ConnectionStatus::Connecting);
        true
    }

    fn on_open(&self, conn_id: usize) -> Option<Vec<String>> {
        let inner = self.inner.upgrade()?;
        let mut shared = inner.lock();
        shared.current(conn_id)?.open = true;
        inner.set_status(ConnectionStatus::Connected);

        if shared.subscriptions.is_empty() {
            return Some(Vec::new());
        }

        let all: Vec<String> = shared.subscriptions.iter().cloned().collect();
        info!("[quotes] connected, resyncing {} symbol(s)", all.len());
        match ClientCommand::subscribe(all).to_json() {
            Ok(text) => Some(vec![text]),
            Err(e) => {
                error!("[quotes] cannot encode resync: {e}");
                Some(Vec::new())
            }
        }
    }

    fn on_text(&self, conn_id: usize, text: &str) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let live = inner.lock().current(conn_id).is_some();
        if live {
            inner.apply_inbound(text);
        }
    }

    fn on_closed(&self, conn_id: usize) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut shared = inner.lock();
        if let Some(active) = shared.current(conn_id) {
            active.open = false;
            inner.set_status(ConnectionStatus::Disconnected);
        }
    }
}
