//! wsecho-server library crate.
//!
//! A WebSocket echo server that performs the RFC 6455 upgrade and framing
//! itself (via `wsecho-core`) on top of plain tokio TCP streams.
//!
//! # Architecture
//!
//! ```text
//! Client (JSON over WebSocket)
//!         ↕
//! [wsecho-server]
//!   ├── domain/           Pure types: ServerConfig, EchoEnvelope, Connection
//!   ├── application/      Payload → JSON → reply envelope
//!   └── infrastructure/
//!         ├── http/       Request head parsing, upgrade vs. plain routing
//!         ├── framing/    tokio-util codec over wsecho-core
//!         └── ws_server/  Accept loop and per-connection lifecycle
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `wsecho-core` only.
//! - `infrastructure` depends on all other layers plus `tokio`.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: echo logic.
pub mod application;

/// Infrastructure layer: TCP, HTTP head parsing, framing.
pub mod infrastructure;
