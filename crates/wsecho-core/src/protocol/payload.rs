//! Interpreting an unmasked payload as a JSON message.

use serde_json::Value;

use crate::protocol::error::PayloadError;

/// Parses `payload` as UTF-8 text holding one JSON document.
///
/// # Errors
///
/// [`PayloadError::InvalidUtf8`] or [`PayloadError::InvalidJson`].
pub fn decode_json(payload: &[u8]) -> Result<Value, PayloadError> {
    let text = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str(text)?)
}
