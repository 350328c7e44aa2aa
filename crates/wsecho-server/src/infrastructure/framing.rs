//! `tokio-util` codec adapter around the wsecho-core frame codec.
//!
//! [`Framed`](tokio_util::codec::Framed) owns the read buffer and calls
//! [`WsCodec::decode`] every time new bytes arrive, so a frame split across
//! several TCP segments is reassembled by the stateful
//! [`FrameDecoder`] rather than misread.

use bytes::BytesMut;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use wsecho_core::protocol::encode_frame_into;
use wsecho_core::{Frame, FrameDecoder, LengthMode, ProtocolError, Role};

use crate::domain::ServerConfig;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol decode error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Server-side codec: decodes masked client frames, encodes unmasked text
/// frames.
#[derive(Debug, Clone)]
pub struct WsCodec {
    decoder: FrameDecoder,
    mode: LengthMode,
}

impl WsCodec {
    pub fn new(mode: LengthMode, max_payload_len: usize) -> Self {
        Self {
            decoder: FrameDecoder::new(Role::Server, mode).with_max_payload_len(max_payload_len),
            mode,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.length_mode, config.max_payload_len)
    }
}

impl Decoder for WsCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.decoder.decode(src)?)
    }
}

impl Encoder<String> for WsCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Ok(encode_frame_into(&item, self.mode, dst)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wsecho_core::protocol::encode_client_frame;

    #[test]
    fn test_decode_waits_for_complete_frame() {
        // Arrange
        let bytes = encode_client_frame("{\"hi\":1}", [1, 2, 3, 4]);
        let mut codec = WsCodec::new(LengthMode::Rfc6455, 1024);
        let mut buf = BytesMut::from(&bytes[..5]);

        // Act + Assert
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&bytes[5..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"{\"hi\":1}");
    }

    #[test]
    fn test_encode_writes_unmasked_text_frame() {
        let mut codec = WsCodec::new(LengthMode::Rfc6455, 1024);
        let mut buf = BytesMut::new();

        codec.encode("ok".to_string(), &mut buf).unwrap();

        assert_eq!(&buf[..], &[0x81, 2, b'o', b'k']);
    }

    #[test]
    fn test_legacy_encode_of_large_reply_is_protocol_error() {
        let mut codec = WsCodec::new(LengthMode::Legacy, 1024);
        let mut buf = BytesMut::new();

        let err = codec.encode("x".repeat(70_000), &mut buf).unwrap_err();

        assert!(matches!(err, CodecError::Protocol(ProtocolError::UnsupportedLength { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_payload_limit_comes_from_config() {
        let config = ServerConfig {
            max_payload_len: 4,
            ..ServerConfig::default()
        };
        let mut codec = WsCodec::from_config(&config);
        let mut buf = BytesMut::from(&encode_client_frame("12345", [0; 4])[..]);

        let err = codec.decode(&mut buf).unwrap_err();

        assert!(matches!(err, CodecError::Protocol(ProtocolError::PayloadTooLarge { .. })));
    }
}
