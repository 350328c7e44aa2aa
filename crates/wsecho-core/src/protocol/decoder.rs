//! Incremental frame decoder.
//!
//! TCP delivers a byte stream, not frames: one read may end in the middle of
//! a header, or carry two frames at once.  [`FrameDecoder`] therefore walks a
//! fixed sequence of steps and only advances when the bytes for the current
//! step are buffered:
//!
//! ```text
//! Header (2) ─► ExtendedLength (0/2/8) ─► MaskKey (0/4) ─► Payload (N) ─┐
//!    ▲                                                                  │
//!    └──────────────────────────── frame emitted ───────────────────────┘
//! ```
//!
//! Each step consumes its bytes from the caller's buffer in one go, so a
//! partially received step leaves the buffer untouched and the next call
//! retries it once more bytes have arrived.

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::protocol::error::ProtocolError;
use crate::protocol::frame::{
    Frame, FrameHeader, LengthMode, Role, SEVEN_BIT_MAX, SIXTEEN_BIT_MARKER,
};
use crate::protocol::mask::{apply_mask, MASK_KEY_LEN};

/// Default ceiling on a single frame's payload: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// Most the decoder grows the read buffer by while waiting for a payload.
/// The rest is allocated as the bytes actually arrive.
const MAX_RESERVE_CHUNK: usize = 64 * 1024;

/// The 64-bit extended length must leave this bit clear.
const LENGTH_64_RESERVED_BIT: u64 = 1 << 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Header,
    ExtendedLength { header: FrameHeader, width: usize },
    MaskKey { header: FrameHeader },
    Payload { header: FrameHeader },
}

/// Stateful decoder for a single connection's inbound byte stream.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    role: Role,
    mode: LengthMode,
    max_payload_len: usize,
    state: DecodeState,
}

impl FrameDecoder {
    /// Creates a decoder for frames received by `role`.
    pub fn new(role: Role, mode: LengthMode) -> Self {
        Self {
            role,
            mode,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            state: DecodeState::Header,
        }
    }

    /// Replaces the payload ceiling.  Frames declaring more are rejected
    /// before any payload byte is buffered.
    pub fn with_max_payload_len(mut self, max_payload_len: usize) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    /// `true` when no frame is partially decoded.
    pub fn is_idle(&self) -> bool {
        self.state == DecodeState::Header
    }

    /// Bytes the current step still needs before it can make progress.
    pub fn step_len(&self) -> usize {
        match self.state {
            DecodeState::Header => 2,
            DecodeState::ExtendedLength { width, .. } => width,
            DecodeState::MaskKey { .. } => MASK_KEY_LEN,
            DecodeState::Payload { header } => header.payload_len,
        }
    }

    /// Decodes at most one frame from the front of `src`.
    ///
    /// Returns `Ok(None)` when `src` runs out mid-frame; the consumed header
    /// bytes are remembered and decoding resumes on the next call.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidLength`] if the mask bit does not match the
    ///   decoder's role.
    /// - [`ProtocolError::PayloadTooLarge`] if the declared length exceeds the
    ///   ceiling, or a 64-bit length has its most significant bit set.
    ///
    /// Either error leaves the stream desynchronised; the connection must be
    /// dropped.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        loop {
            match self.state {
                DecodeState::Header => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    let first = src.get_u8();
                    let second = src.get_u8();
                    let header = FrameHeader::from_first_byte(first);
                    self.state = self.resolve_indicator(header, second)?;
                }

                DecodeState::ExtendedLength { mut header, width } => {
                    if src.len() < width {
                        return Ok(None);
                    }
                    let declared = if width == 2 {
                        u64::from(src.get_u16())
                    } else {
                        src.get_u64()
                    };
                    // Rejected whatever the configured ceiling is.
                    if declared & LENGTH_64_RESERVED_BIT != 0 {
                        return Err(ProtocolError::PayloadTooLarge {
                            declared,
                            limit: self.max_payload_len,
                        });
                    }
                    header.payload_len = self.check_payload_len(declared)?;
                    self.state = self.after_length(header);
                }

                DecodeState::MaskKey { mut header } => {
                    if src.len() < MASK_KEY_LEN {
                        return Ok(None);
                    }
                    let mut key = [0u8; MASK_KEY_LEN];
                    src.copy_to_slice(&mut key);
                    header.mask_key = Some(key);
                    self.state = DecodeState::Payload { header };
                }

                DecodeState::Payload { header } => {
                    if src.len() < header.payload_len {
                        let missing = header.payload_len - src.len();
                        src.reserve(missing.min(MAX_RESERVE_CHUNK));
                        return Ok(None);
                    }
                    let mut payload = src.split_to(header.payload_len);
                    if let Some(key) = header.mask_key {
                        apply_mask(&mut payload, key);
                    }
                    self.state = DecodeState::Header;
                    trace!(
                        opcode = header.opcode,
                        fin = header.fin,
                        len = header.payload_len,
                        "frame decoded"
                    );
                    return Ok(Some(Frame {
                        header,
                        payload: payload.freeze(),
                    }));
                }
            }
        }
    }

    /// Maps the second header byte to the next decode step.
    fn resolve_indicator(
        &self,
        mut header: FrameHeader,
        second: u8,
    ) -> Result<DecodeState, ProtocolError> {
        // For client frames the mask bit is assumed set and simply
        // subtracted; anything outside 0..=127 afterwards means it was not.
        let indicator = i16::from(second) - i16::from(self.role.expected_mask_bit());
        let length_indicator = match u8::try_from(indicator) {
            Ok(value) if value <= 127 => value,
            _ => return Err(ProtocolError::InvalidLength { indicator }),
        };
        header.length_indicator = length_indicator;

        Ok(match length_indicator {
            0..=SEVEN_BIT_MAX => {
                header.payload_len = self.check_payload_len(u64::from(length_indicator))?;
                self.after_length(header)
            }
            SIXTEEN_BIT_MARKER => DecodeState::ExtendedLength { header, width: 2 },
            _ => match self.mode {
                LengthMode::Rfc6455 => DecodeState::ExtendedLength { header, width: 8 },
                // The 64-bit length is never read: the payload is empty and
                // the next four bytes are taken as the masking key.
                LengthMode::Legacy => {
                    header.payload_len = 0;
                    self.after_length(header)
                }
            },
        })
    }

    fn after_length(&self, header: FrameHeader) -> DecodeState {
        if self.role.expects_mask() {
            DecodeState::MaskKey { header }
        } else {
            DecodeState::Payload { header }
        }
    }

    fn check_payload_len(&self, declared: u64) -> Result<usize, ProtocolError> {
        match usize::try_from(declared) {
            Ok(len) if len <= self.max_payload_len => Ok(len),
            _ => Err(ProtocolError::PayloadTooLarge {
                declared,
                limit: self.max_payload_len,
            }),
        }
    }
}

/// Decodes one frame from the start of `bytes`.
///
/// Returns the frame and the number of bytes it occupied, so the caller can
/// advance their cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when `bytes` holds less than a
/// complete frame, plus any error [`FrameDecoder::decode`] can raise.
pub fn decode_frame(
    bytes: &[u8],
    role: Role,
    mode: LengthMode,
) -> Result<(Frame, usize), ProtocolError> {
    let mut buf = BytesMut::from(bytes);
    let mut decoder = FrameDecoder::new(role, mode);
    match decoder.decode(&mut buf)? {
        Some(frame) => Ok((frame, bytes.len() - buf.len())),
        None => Err(ProtocolError::InsufficientData {
            needed: bytes.len() - buf.len() + decoder.step_len(),
            available: bytes.len(),
        }),
    }
}
