//! Protocol module: handshake, masking, frame codec and payload decoding.

pub mod decoder;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod payload;

pub use decoder::{decode_frame, FrameDecoder, DEFAULT_MAX_PAYLOAD_LEN};
pub use error::{DecodeError, PayloadError, ProtocolError};
pub use frame::{
    encode_client_frame, encode_frame, encode_frame_into, Frame, FrameHeader, LengthClass,
    LengthMode, Role,
};
pub use handshake::{accept_key, negotiate, switching_protocols_response, WEBSOCKET_GUID};
pub use mask::{apply_mask, mask, unmask, MASK_KEY_LEN};
pub use payload::decode_json;
