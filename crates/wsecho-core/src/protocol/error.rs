//! Error taxonomy for the WebSocket codec.
//!
//! Two failure families are kept apart on purpose:
//!
//! - [`ProtocolError`]: the bytes on the wire do not form a frame this codec
//!   accepts (bad length indicator, oversized payload, truncated input).
//! - [`PayloadError`]: the frame was well-formed but its payload is not UTF-8
//!   JSON.
//!
//! Both are fatal to the connection that produced them.  [`DecodeError`]
//! joins them for callers that run the whole inbound path in one step.

use thiserror::Error;

/// Errors raised while encoding or decoding frame bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The second header byte does not map to a length indicator in
    /// `0..=127` once the expected mask bit is removed.
    ///
    /// For client frames this means the mask bit was not set.
    #[error("invalid message length: indicator {indicator}")]
    InvalidLength { indicator: i16 },

    /// The declared payload length exceeds the decoder's configured limit.
    #[error("payload of {declared} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { declared: u64, limit: usize },

    /// The payload is too long for the selected length mode to encode.
    #[error("cannot encode a {len} byte payload in {mode} length mode")]
    UnsupportedLength { len: usize, mode: &'static str },

    /// A one-shot decode was given fewer bytes than one complete frame.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },
}

/// Errors raised while interpreting an unmasked payload as a JSON message.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload bytes are not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The payload is UTF-8 but not a JSON document.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Any failure on the inbound path: framing or payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("protocol decode error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("payload decode error: {0}")]
    Payload(#[from] PayloadError),
}
