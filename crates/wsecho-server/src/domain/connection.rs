//! Per-connection identity and protocol state.
//!
//! A connection moves through two states only:
//!
//! ```text
//! Handshaking ──(101 sent)──► Open
//! ```
//!
//! There is no Closing state: the server never sends or answers a close
//! frame, it simply drops the stream when the client goes away or a frame
//! fails to decode.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;
use uuid::Uuid;

/// Random identifier attached to every log line of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for (or answering) the HTTP upgrade request.
    Handshaking,
    /// Upgrade complete; frames flow in both directions.
    Open,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The handshake was completed twice.  The accept key is write-once.
    #[error("handshake already completed for connection {0}")]
    AlreadyOpen(ConnectionId),
}

/// One accepted TCP connection, minus the stream itself.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    state: ConnectionState,
    accept_key: Option<String>,
}

impl Connection {
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            state: ConnectionState::Handshaking,
            accept_key: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The negotiated `Sec-WebSocket-Accept` value, once open.
    pub fn accept_key(&self) -> Option<&str> {
        self.accept_key.as_deref()
    }

    /// Records the accept key and moves to [`ConnectionState::Open`].
    ///
    /// # Errors
    ///
    /// [`ConnectionError::AlreadyOpen`] if called a second time; the stored
    /// key is left unchanged.
    pub fn complete_handshake(&mut self, accept_key: String) -> Result<(), ConnectionError> {
        if self.state == ConnectionState::Open {
            return Err(ConnectionError::AlreadyOpen(self.id));
        }
        self.accept_key = Some(accept_key);
        self.state = ConnectionState::Open;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
