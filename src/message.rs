//! Websocket message envelope.
//!
//! ARCHITECTURE
//! ============
//! Every frame is a JSON object discriminated by `type`. Clients only ever
//! send `move` and `ping`; anything else fails to decode and is discarded by
//! the session reader. The server emits `init`, `id`, `join`, `leave`, `move`
//! and `ping`, all carrying camelCase field names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Normalized pointer position with an optional display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A visitor arrival shared with every connected viewer. Missing fields
/// decode as empty strings or zero so partial pings still get relayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingEvent {
    /// Network-facing address label as reported by the client.
    pub ip: String,
    /// Human-readable location.
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    /// Unix seconds. Overwritten by the server on receipt.
    pub timestamp: i64,
}

/// Inbound frames. Unknown `type` values do not decode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Move { position: CursorPosition },
    Ping { ping: PingEvent },
}

impl ClientMessage {
    /// Decode one inbound payload.
    ///
    /// # Errors
    ///
    /// Returns the decode error for malformed JSON or an unsupported `type`.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Outbound frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Snapshot delivered to a session right after it registers.
    Init { cursors: HashMap<String, CursorPosition>, user_count: usize, pings: Vec<PingEvent> },
    /// The session's own identity.
    Id { id: String },
    Join { id: String, user_count: usize },
    Leave { id: String, user_count: usize },
    Move { id: String, position: CursorPosition },
    Ping { id: String, ping: PingEvent },
}

impl ServerMessage {
    /// Wire name of the message, matching the `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Id { .. } => "id",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Move { .. } => "move",
            Self::Ping { .. } => "ping",
        }
    }

    /// Serialize to the JSON text sent on the wire.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
