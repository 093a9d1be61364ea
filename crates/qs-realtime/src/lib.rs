//! # qs-realtime
//!
//! Realtime quote streaming for the screener dashboard.
//!
//! ## Architecture
//!
//! ```text
//! AppConfig ──► RealtimeSettings ──► QuoteChannel ──► WsConnection task
//!                        │                 │
//!                        │                 ├── subscription set (resynced on open)
//!                        │                 ├── status watch
//!                        │                 └── QuoteBook watch (last write wins)
//!                        └──► WatchlistClient (REST: status, watchlist add/remove)
//! ```
//!
//! - [`channel`]: the quote channel (connect, disconnect, subscribe, unsubscribe)
//! - [`config`]: endpoint derivation and resolved settings
//! - [`watchlist`]: REST bindings for the server-side watchlist
//! - [`monitor`]: watchlist table rows, formatting and status banner

pub mod channel;
pub mod config;
pub mod monitor;
pub mod watchlist;

pub use channel::{ChannelConfig, QuoteChannel};
pub use config::RealtimeSettings;
pub use watchlist::WatchlistClient;
