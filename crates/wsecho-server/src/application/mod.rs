//! Application layer for wsecho-server.
//!
//! Knows *what* to answer for a decoded frame; the infrastructure layer
//! decides *how* bytes get on and off the socket.
//!
//! # What does NOT belong here?
//!
//! - Sockets, the accept loop, HTTP parsing (infrastructure)
//! - Frame encoding and decoding (`wsecho-core`)

pub mod echo_service;

pub use echo_service::{build_reply, decode_message, echo, EchoError};
