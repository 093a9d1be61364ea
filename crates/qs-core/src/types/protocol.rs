//! Quote feed wire protocol.
//!
//! Client → server commands are JSON objects tagged by `action`:
//!
//! ```json
//! {"action": "subscribe",   "ts_codes": ["600519.SH"]}
//! {"action": "unsubscribe", "ts_codes": ["600519.SH"]}
//! ```
//!
//! Server → client messages are discriminated by `type` when present
//! (`ping`, `error`, `subscribed`, `unsubscribed`); anything else that carries
//! a `ts_code` is a quote update.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::quote::RealtimeQuote;
use crate::error::QsError;

/// Outbound command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientCommand {
    Subscribe { ts_codes: Vec<String> },
    Unsubscribe { ts_codes: Vec<String> },
}

impl ClientCommand {
    pub fn subscribe(ts_codes: Vec<String>) -> Self {
        Self::Subscribe { ts_codes }
    }

    pub fn unsubscribe(ts_codes: Vec<String>) -> Self {
        Self::Unsubscribe { ts_codes }
    }

    /// Serialize to the JSON text frame sent on the socket.
    pub fn to_json(&self) -> Result<String, QsError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound message, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Server keep-alive.
    Ping,
    /// Server-side rejection (unknown action, watch limit exceeded, bad JSON).
    Error { message: Option<String> },
    /// Acknowledgement; carries the server's view of this socket's set.
    Subscribed { ts_codes: Vec<String> },
    /// Acknowledgement; carries the server's view of this socket's set.
    Unsubscribed { ts_codes: Vec<String> },
    /// Quote update for one symbol.
    Quote(RealtimeQuote),
    /// Valid JSON that is neither a control message nor a quote.
    Unrecognized,
}

/// Parse and classify one inbound text frame.
///
/// Returns an error only for malformed JSON. Control types take precedence
/// over `ts_code`: a `{"type":"subscribed","ts_code":...}` is an ack, not a
/// quote.
pub fn parse_server_message(text: &str) -> Result<ServerMessage, QsError> {
    let v: Value = serde_json::from_str(text)?;

    let Value::Object(obj) = v else {
        return Ok(ServerMessage::Unrecognized);
    };

    match obj.get("type").and_then(|t| t.as_str()) {
        Some("ping") => return Ok(ServerMessage::Ping),
        Some("error") => {
            let message = obj.get("message").and_then(|m| m.as_str()).map(str::to_string);
            return Ok(ServerMessage::Error { message });
        }
        Some("subscribed") => return Ok(ServerMessage::Subscribed { ts_codes: string_list(obj.get("ts_codes")) }),
        Some("unsubscribed") => {
            return Ok(ServerMessage::Unsubscribed { ts_codes: string_list(obj.get("ts_codes")) });
        }
        _ => {}
    }

    match RealtimeQuote::from_map(obj) {
        Some(quote) => Ok(ServerMessage::Quote(quote)),
        None => Ok(ServerMessage::Unrecognized),
    }
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(|a| a.as_array())
        .map(|arr| arr.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
