//! JSON message types for the echo protocol.
//!
//! The client may send any JSON document.  The server always answers with an
//! envelope carrying the document back and the moment it was decoded:
//!
//! ```json
//! {"message":{"hi":1},"at":"2024-05-01T12:00:00.123Z"}
//! ```
//!
//! Field order on the wire is `message` then `at`, matching the struct.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The reply sent for every inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoEnvelope {
    /// The client's document, unchanged.
    pub message: Value,

    /// ISO-8601 UTC timestamp with millisecond precision and a `Z` suffix,
    /// taken when the inbound frame was decoded.
    pub at: String,
}

impl EchoEnvelope {
    pub fn new(message: Value, at: DateTime<Utc>) -> Self {
        Self {
            message,
            at: format_timestamp(at),
        }
    }
}

/// Formats `at` as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
