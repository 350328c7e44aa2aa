//! Domain layer for wsecho-server.
//!
//! Pure types with no I/O: configuration, the echo envelope, and the
//! per-connection state machine.  Nothing here touches `tokio` or a socket,
//! so every type can be tested in isolation.

pub mod config;
pub mod connection;
pub mod messages;

pub use config::ServerConfig;
pub use connection::{Connection, ConnectionError, ConnectionId, ConnectionState};
pub use messages::EchoEnvelope;
