//! Error type shared by the realtime crates.
//!
//! Library seams that callers may branch on (endpoint derivation, the socket
//! transport, frame decoding) return [`QsError`]. Glue code wraps it in
//! `anyhow` with context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QsError {
    /// Invalid or inconsistent settings (bad origin, zero delay).
    #[error("config error: {0}")]
    Config(String),

    /// Handshake failure, socket error, or a connection that is not running.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// A frame that is not valid JSON, or a command that cannot be encoded.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for QsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
