//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings.  It
//! is populated from CLI arguments in `main.rs`, or from defaults in tests.
//! Nothing in the domain reads the environment itself.

use std::net::SocketAddr;

use wsecho_core::protocol::DEFAULT_MAX_PAYLOAD_LEN;
use wsecho_core::LengthMode;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 3000;

/// All runtime configuration for the echo server.
///
/// Built once at startup and shared behind an `Arc` with every connection
/// task.
///
/// # Example
///
/// ```rust
/// use wsecho_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 3000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address and port the TCP listener binds to.
    pub bind_addr: SocketAddr,

    /// How the 64-bit payload size class is handled on both decode and
    /// encode.  See [`LengthMode`].
    pub length_mode: LengthMode,

    /// Largest payload a client frame may declare.  Frames above this are a
    /// protocol error and close the connection.
    pub max_payload_len: usize,
}

impl Default for ServerConfig {
    /// | Field           | Default        |
    /// |-----------------|----------------|
    /// | bind_addr       | `0.0.0.0:3000` |
    /// | length_mode     | `rfc6455`      |
    /// | max_payload_len | 16 MiB         |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            length_mode: LengthMode::Rfc6455,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
