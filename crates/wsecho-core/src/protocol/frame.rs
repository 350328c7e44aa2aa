//! Frame layout constants, header types and the outbound encoder.
//!
//! Wire format (RFC 6455 §5.2):
//! ```text
//! [FIN|RSV|opcode:1][MASK|len:1][ext len:0/2/8][mask key:0/4][payload:N]
//! ```
//!
//! The 7-bit length indicator selects one of three size classes:
//!
//! | Indicator | Payload length                          |
//! |-----------|-----------------------------------------|
//! | `0..=125` | the indicator itself                    |
//! | `126`     | next 2 bytes, big-endian `u16`          |
//! | `127`     | next 8 bytes, big-endian `u64`          |
//!
//! Server frames are never masked; client frames always are.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::error::ProtocolError;
use crate::protocol::mask::MASK_KEY_LEN;

/// Opcode of a text frame.
pub const OPCODE_TEXT: u8 = 0x01;
/// FIN bit in the first header byte.
pub const FIN_BIT: u8 = 0x80;
/// MASK bit in the second header byte.
pub const MASK_BIT: u8 = 0x80;
/// Largest length carried inline in the 7-bit indicator.
pub const SEVEN_BIT_MAX: u8 = 125;
/// Indicator announcing a 16-bit extended length.
pub const SIXTEEN_BIT_MARKER: u8 = 126;
/// Indicator announcing a 64-bit extended length.
pub const SIXTY_FOUR_BIT_MARKER: u8 = 127;
/// Largest header the encoder ever writes: 2 + 8 bytes.
pub const MAX_SERVER_HEADER_LEN: usize = 10;

/// Which side of the connection produced the frames being decoded.
///
/// The decoding side determines whether a masking key is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decoding frames sent by a client: mask bit set, masking key present.
    Server,
    /// Decoding frames sent by a server: mask bit clear, no masking key.
    Client,
}

impl Role {
    /// The value of the second header byte's high bit this role expects.
    pub fn expected_mask_bit(self) -> u8 {
        match self {
            Role::Server => MASK_BIT,
            Role::Client => 0,
        }
    }

    pub fn expects_mask(self) -> bool {
        self == Role::Server
    }
}

/// How the 64-bit size class is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LengthMode {
    /// Full RFC 6455 behaviour: indicator 127 reads an 8-byte length and the
    /// encoder emits it for payloads of 65536 bytes and up.
    #[default]
    Rfc6455,
    /// Behaviour of the original deployment: indicator 127 reads nothing and
    /// yields an empty payload; payloads of 65536 bytes and up cannot be
    /// encoded.
    Legacy,
}

impl LengthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LengthMode::Rfc6455 => "rfc6455",
            LengthMode::Legacy => "legacy",
        }
    }
}

impl fmt::Display for LengthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header fields of one decoded frame.  Derived per frame, never stored
/// beyond the frame it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// FIN bit.  Recorded only; fragmentation is not supported.
    pub fin: bool,
    /// Low four bits of the first byte.  Recorded only; every frame is
    /// treated as text.
    pub opcode: u8,
    /// The 7-bit length indicator after removing the mask bit.
    pub length_indicator: u8,
    /// Resolved payload length.
    pub payload_len: usize,
    /// Masking key, present for client frames.
    pub mask_key: Option<[u8; MASK_KEY_LEN]>,
}

impl FrameHeader {
    pub(crate) fn from_first_byte(first: u8) -> Self {
        Self {
            fin: first & FIN_BIT != 0,
            opcode: first & 0x0F,
            length_indicator: 0,
            payload_len: 0,
            mask_key: None,
        }
    }
}

/// A complete decoded frame: header plus unmasked payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    pub fn is_text(&self) -> bool {
        self.header.opcode == OPCODE_TEXT
    }
}

/// Size class the encoder picks for a payload of `len` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    /// `len <= 125`: carried in the indicator itself.
    Inline(u8),
    /// `126 <= len <= 65535`: indicator 126 + 2-byte length.
    Extended16(u16),
    /// `len >= 65536`: indicator 127 + 8-byte length.
    Extended64(u64),
}

impl LengthClass {
    pub fn of(len: usize) -> Self {
        if len <= usize::from(SEVEN_BIT_MAX) {
            LengthClass::Inline(len as u8)
        } else if let Ok(short) = u16::try_from(len) {
            LengthClass::Extended16(short)
        } else {
            LengthClass::Extended64(len as u64)
        }
    }

    /// Header length for this class on an unmasked frame.
    pub fn header_len(self) -> usize {
        match self {
            LengthClass::Inline(_) => 2,
            LengthClass::Extended16(_) => 4,
            LengthClass::Extended64(_) => 10,
        }
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes `text` as a single unmasked, final text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::UnsupportedLength`] when `text` is 65536 bytes or
/// longer and `mode` is [`LengthMode::Legacy`].
///
/// # Examples
///
/// ```rust
/// use wsecho_core::protocol::frame::{encode_frame, LengthMode};
///
/// let bytes = encode_frame("hi", LengthMode::Rfc6455).unwrap();
/// assert_eq!(bytes, [0x81, 2, b'h', b'i']);
/// ```
pub fn encode_frame(text: &str, mode: LengthMode) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = BytesMut::with_capacity(MAX_SERVER_HEADER_LEN + text.len());
    encode_frame_into(text, mode, &mut buf)?;
    Ok(buf.to_vec())
}

/// Appends the frame for `text` to `dst`.
///
/// Nothing is written when an error is returned.
///
/// # Errors
///
/// See [`encode_frame`].
pub fn encode_frame_into(
    text: &str,
    mode: LengthMode,
    dst: &mut BytesMut,
) -> Result<(), ProtocolError> {
    let payload = text.as_bytes();
    let class = LengthClass::of(payload.len());

    if matches!(class, LengthClass::Extended64(_)) && mode == LengthMode::Legacy {
        return Err(ProtocolError::UnsupportedLength {
            len: payload.len(),
            mode: mode.as_str(),
        });
    }

    dst.reserve(class.header_len() + payload.len());
    dst.put_u8(FIN_BIT | OPCODE_TEXT);
    match class {
        LengthClass::Inline(len) => dst.put_u8(len),
        LengthClass::Extended16(len) => {
            dst.put_u8(SIXTEEN_BIT_MARKER);
            dst.put_u16(len);
        }
        LengthClass::Extended64(len) => {
            dst.put_u8(SIXTY_FOUR_BIT_MARKER);
            dst.put_u64(len);
        }
    }
    dst.extend_from_slice(payload);
    Ok(())
}

/// Encodes `text` the way a client must send it: final text frame, mask bit
/// set, payload XOR-ed with `mask_key`.  Always uses RFC 6455 size classes.
///
/// The server never sends these; they exist for test clients and tooling.
pub fn encode_client_frame(text: &str, mask_key: [u8; MASK_KEY_LEN]) -> Vec<u8> {
    let payload = text.as_bytes();
    let class = LengthClass::of(payload.len());

    let mut buf = BytesMut::with_capacity(class.header_len() + MASK_KEY_LEN + payload.len());
    buf.put_u8(FIN_BIT | OPCODE_TEXT);
    match class {
        LengthClass::Inline(len) => buf.put_u8(MASK_BIT | len),
        LengthClass::Extended16(len) => {
            buf.put_u8(MASK_BIT | SIXTEEN_BIT_MARKER);
            buf.put_u16(len);
        }
        LengthClass::Extended64(len) => {
            buf.put_u8(MASK_BIT | SIXTY_FOUR_BIT_MARKER);
            buf.put_u64(len);
        }
    }
    buf.put_slice(&mask_key);
    let start = buf.len();
    buf.extend_from_slice(payload);
    crate::protocol::mask::apply_mask(&mut buf[start..], mask_key);
    buf.to_vec()
}
