//! Infrastructure layer for wsecho-server.
//!
//! All I/O lives here.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and spawning per-connection tasks
//! - Reading the HTTP request head and routing upgrade vs. plain requests
//! - Adapting the wsecho-core frame codec to `tokio_util::codec::Framed`
//! - Handling the graceful shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Building the reply envelope (application layer)
//! - Message and state types (domain layer)
//! - Configuration parsing (done in `main.rs`)

pub mod framing;
pub mod http;
pub mod ws_server;

pub use ws_server::{bind, run_connection, run_server, serve};
