//! Echo logic: inbound payload → JSON value → reply envelope text.
//!
//! These functions are pure.  The timestamp is passed in rather than read
//! from the clock so the output is deterministic under test; the
//! infrastructure layer samples `Utc::now()` at decode time.
//!
//! ```text
//! payload bytes ──decode_message──► Value ──build_reply──► {"message":…,"at":…}
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use wsecho_core::{decode_json, DecodeError};

use crate::domain::messages::EchoEnvelope;

/// Errors on the echo path.  Every variant is fatal to the connection.
#[derive(Debug, Error)]
pub enum EchoError {
    /// The frame payload is not UTF-8 JSON.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The reply envelope could not be serialized.
    #[error("failed to serialize reply: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Parses a frame payload into the client's JSON document.
///
/// # Errors
///
/// [`EchoError::Decode`] wrapping a payload error when the bytes are not
/// UTF-8 or not JSON.
pub fn decode_message(payload: &[u8]) -> Result<Value, EchoError> {
    decode_json(payload)
        .map_err(DecodeError::from)
        .map_err(EchoError::from)
}

/// Wraps `message` in an [`EchoEnvelope`] stamped with `at` and serializes it.
///
/// # Errors
///
/// [`EchoError::Serialize`] if serialization fails.
pub fn build_reply(message: Value, at: DateTime<Utc>) -> Result<String, EchoError> {
    serde_json::to_string(&EchoEnvelope::new(message, at)).map_err(EchoError::Serialize)
}

/// Runs the whole echo path for one payload.
///
/// # Errors
///
/// See [`decode_message`] and [`build_reply`].
pub fn echo(payload: &[u8], at: DateTime<Utc>) -> Result<String, EchoError> {
    let message = decode_message(payload)?;
    build_reply(message, at)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
