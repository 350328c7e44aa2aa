//! # wsecho-core
//!
//! The WebSocket wire protocol, server side, with no I/O attached.
//!
//! This crate is used by the `wsecho-server` binary and by its tests.  It has
//! no dependency on sockets or an async runtime: every function takes bytes
//! or strings and returns bytes, strings or typed errors.
//!
//! # Overview
//!
//! - **`protocol::handshake`** – Turns the client's `Sec-WebSocket-Key` into
//!   the `101 Switching Protocols` response that completes the upgrade.
//!
//! - **`protocol::decoder`** – A stateful parser that turns the inbound byte
//!   stream into frames, tolerating frames split across any number of reads.
//!
//! - **`protocol::frame`** – Frame constants and the outbound encoder
//!   (unmasked, final, text).
//!
//! - **`protocol::mask`** – The XOR masking applied to client payloads.
//!
//! - **`protocol::payload`** – UTF-8 + JSON interpretation of a payload.
//!
//! Fragmentation, control frames (ping, pong, close) and extensions are not
//! handled: every frame is treated as a complete text message.

pub mod protocol;

pub use protocol::{
    accept_key, decode_frame, decode_json, encode_frame, negotiate, DecodeError, Frame,
    FrameDecoder, LengthMode, PayloadError, ProtocolError, Role,
};
