//! wsecho WebSocket echo server: entry point.
//!
//! Accepts TCP connections, answers plain HTTP requests with
//! `Hello, World!`, upgrades WebSocket requests, and echoes every JSON
//! message back as `{"message": <input>, "at": <timestamp>}`.
//!
//! # Usage
//!
//! ```text
//! wsecho-server [OPTIONS]
//!
//! Options:
//!   --port        <PORT>   TCP port [default: 3000]
//!   --bind        <ADDR>   Bind address [default: 0.0.0.0]
//!   --length-mode <MODE>   rfc6455 | legacy [default: rfc6455]
//!   --max-payload <BYTES>  Largest accepted frame payload [default: 16777216]
//! ```
//!
//! Every option can also be set through the environment (`WSECHO_PORT`,
//! `WSECHO_BIND`, `WSECHO_LENGTH_MODE`, `WSECHO_MAX_PAYLOAD`).  CLI args win
//! when both are present.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wsecho_core::LengthMode;
use wsecho_server::domain::config::DEFAULT_PORT;
use wsecho_server::domain::ServerConfig;
use wsecho_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Handling of the 64-bit payload size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LengthModeArg {
    /// Full RFC 6455 extended lengths.
    Rfc6455,
    /// Indicator 127 reads no length; replies of 65536+ bytes fail.
    Legacy,
}

impl From<LengthModeArg> for LengthMode {
    fn from(arg: LengthModeArg) -> Self {
        match arg {
            LengthModeArg::Rfc6455 => LengthMode::Rfc6455,
            LengthModeArg::Legacy => LengthMode::Legacy,
        }
    }
}

/// Minimal WebSocket echo server.
#[derive(Debug, Parser)]
#[command(name = "wsecho-server", about = "Minimal WebSocket echo server", version)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "WSECHO_PORT")]
    port: u16,

    /// IP address to bind to.  `0.0.0.0` accepts connections on every
    /// interface; `127.0.0.1` only local ones.
    #[arg(long, default_value = "0.0.0.0", env = "WSECHO_BIND")]
    bind: String,

    /// How frames with the 64-bit length indicator are handled.
    #[arg(long, value_enum, default_value_t = LengthModeArg::Rfc6455, env = "WSECHO_LENGTH_MODE")]
    length_mode: LengthModeArg,

    /// Largest payload, in bytes, a client frame may declare.
    #[arg(long, default_value_t = wsecho_core::protocol::DEFAULT_MAX_PAYLOAD_LEN, env = "WSECHO_MAX_PAYLOAD")]
    max_payload: usize,
}

impl Cli {
    /// Converts the parsed arguments into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        Ok(ServerConfig {
            bind_addr,
            length_mode: self.length_mode.into(),
            max_payload_len: self.max_payload,
        })
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Routes panics through `tracing` so they reach the same sink as every
/// other log line.  A panicking connection task is torn down by tokio; the
/// rest of the server keeps running.
fn install_panic_logger() {
    std::panic::set_hook(Box::new(|panic| {
        let payload = panic
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");
        let location = panic
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unknown>".to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        tracing::error!("panic at {location}: {payload}\n{backtrace}");
    }));
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// A single-threaded runtime drives every connection; each connection is a
/// task that owns its stream, so no state is shared between them.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── Step 1: Logging ────────────────────────────────────────────────────
    // `RUST_LOG` wins when set (e.g. `RUST_LOG=wsecho_core=trace` shows every
    // decoded frame); otherwise `info` and above.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    install_panic_logger();

    // ── Step 2: Configuration ──────────────────────────────────────────────
    let config = Cli::parse().into_server_config()?;

    info!(
        "wsecho server starting: bind={}, length_mode={}, max_payload={}",
        config.bind_addr, config.length_mode, config.max_payload_len
    );

    // ── Step 3: Shutdown signal ────────────────────────────────────────────
    // The accept loop polls this flag. Connections still open when `main`
    // returns are dropped with the runtime.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Step 4: Serve until the flag is cleared ────────────────────────────
    run_server(config, running).await?;

    info!("wsecho server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
