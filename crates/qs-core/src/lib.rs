//! # qs-core
//!
//! Core crate for the quant-screener realtime client, providing:
//!
//! - **Types** (`types`): connection status, realtime quotes, wire protocol, symbol utils
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): domain-specific `QsError` via thiserror
//! - **WebSocket** (`ws`): transport seam + connection loop with fixed-delay reconnect
//! - **JSON helpers** (`json_util`): lenient numeric field parsing
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod json_util;
pub mod logging;
pub mod types;
pub mod ws;

pub use error::QsError;
// Re-export types at crate root for convenience.
pub use types::*;
