//! Server side of the WebSocket opening handshake (RFC 6455 §4.2.2).
//!
//! The server proves it understood the upgrade by hashing the client's
//! `Sec-WebSocket-Key` together with a fixed GUID:
//!
//! ```text
//! Sec-WebSocket-Accept = base64( sha1( Sec-WebSocket-Key ++ GUID ) )
//! ```
//!
//! Any standard client recomputes the same value and rejects the upgrade if
//! the two differ, so the transform must match byte-for-byte.

use base64::{engine::general_purpose::STANDARD, Engine};
use sha1::{Digest, Sha1};

/// The GUID every WebSocket endpoint appends to the client key.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the `Sec-WebSocket-Accept` value for a client key.
///
/// The key is treated as an opaque string; no base64 or length validation is
/// performed.
///
/// # Examples
///
/// ```rust
/// use wsecho_core::protocol::handshake::accept_key;
///
/// assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Builds the complete `101 Switching Protocols` response for a client key.
///
/// Lines are CRLF-terminated and the block ends with an empty line, so the
/// returned string can be written to the socket as-is.  A malformed key still
/// yields a syntactically valid response; the client is left to reject it.
pub fn negotiate(client_key: &str) -> String {
    switching_protocols_response(&accept_key(client_key))
}

/// Builds the `101` response around an already computed accept value.
pub fn switching_protocols_response(accept: &str) -> String {
    [
        "HTTP/1.1 101 Switching Protocols",
        "Upgrade: websocket",
        "Connection: Upgrade",
        &format!("Sec-WebSocket-Accept: {accept}"),
        "\r\n",
    ]
    .join("\r\n")
}
