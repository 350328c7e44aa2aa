//! TCP accept loop and per-connection lifecycle.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting connections and spawning one task per connection.
//! 3. Reading the HTTP request head and either answering `Hello, World!` or
//!    completing the WebSocket upgrade.
//! 4. Decoding client frames, echoing each one back inside an envelope.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Failure isolation
//!
//! A connection's errors end that connection only.  They are logged with the
//! connection's id and peer address by [`handle_connection`] and never
//! propagate to the accept loop.  No close frame is sent on any error path:
//! the stream is simply dropped.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::{Framed, FramedParts};
use tracing::{debug, error, info, warn};

use wsecho_core::protocol::{accept_key, switching_protocols_response};

use crate::application::{build_reply, decode_message};
use crate::domain::{Connection, ServerConfig};
use crate::infrastructure::framing::WsCodec;
use crate::infrastructure::http::{
    read_request, RequestHead, BAD_REQUEST_RESPONSE, HELLO_WORLD_RESPONSE,
};

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the listener and serves connections until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(config: ServerConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = bind(&config).await?;
    serve(listener, config, running).await
}

/// Binds a TCP listener on `config.bind_addr`.
///
/// # Errors
///
/// Returns an error if the port is in use or the process may not bind it.
pub async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind_addr))?;

    info!("listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts connections on `listener` until `running` is set to `false`.
///
/// Each connection runs in its own task; the loop never waits on one.
///
/// # Errors
///
/// Currently infallible after binding; accept errors are logged and the loop
/// continues.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    // Every connection task holds a clone of the same config.
    let config = Arc::new(config);

    loop {
        // Check the shutdown flag before each accept attempt.
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Bounded accept, so the flag is seen even when nobody connects.
        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                // One task per connection; the loop goes straight back to
                // accepting.
                let cfg = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, cfg).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection in the last interval; re-check the flag.
            }
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Runs one connection to completion and logs how it ended.
async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, config: Arc<ServerConfig>) {
    let mut connection = Connection::new(peer_addr);
    let id = connection.id();
    debug!("connection {id}: accepted from {peer_addr}");

    match run_connection(stream, &mut connection, &config).await {
        Ok(()) => info!("connection {id} ({peer_addr}) closed"),
        Err(e) => warn!("connection {id} ({peer_addr}) closed with error: {e:#}"),
    }
}

/// Drives the full lifecycle of one connection over any duplex stream.
///
/// 1. Reads the HTTP request head.
/// 2. Plain request → writes `200 Hello, World!` and returns.
/// 3. Upgrade without a key → writes `400` and fails.
/// 4. Upgrade → writes the `101` response, marks `connection` open, then
///    echoes every decoded frame until the client closes the stream.
///
/// # Errors
///
/// Any I/O failure, a malformed request head, a protocol decode error or a
/// payload decode error.  All of them end the connection.
pub async fn run_connection<S>(
    mut stream: S,
    connection: &mut Connection,
    config: &ServerConfig,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = connection.id();

    // ── Step 1: Read the HTTP request head ─────────────────────────────────
    let request = read_request(&mut stream)
        .await
        .context("failed to read HTTP request")?;

    // ── Step 2: Route plain requests and reject keyless upgrades ───────────
    let key = match request.head {
        RequestHead::Plain { method, path } => {
            debug!("connection {id}: plain HTTP request {method} {path}");
            stream.write_all(HELLO_WORLD_RESPONSE.as_bytes()).await?;
            stream.shutdown().await?;
            return Ok(());
        }
        RequestHead::Upgrade { key: None, path } => {
            stream.write_all(BAD_REQUEST_RESPONSE.as_bytes()).await?;
            stream.shutdown().await?;
            anyhow::bail!("upgrade request for {path} has no Sec-WebSocket-Key header");
        }
        RequestHead::Upgrade { key: Some(key), .. } => key,
    };

    info!("connection {id}: client connected: {key}");

    // ── Step 3: Complete the upgrade ───────────────────────────────────────
    // The 101 response goes out before any frame is read; from here on the
    // stream carries WebSocket frames only.

    let accept = accept_key(&key);
    stream
        .write_all(switching_protocols_response(&accept).as_bytes())
        .await
        .context("failed to write handshake response")?;
    connection.complete_handshake(accept)?;

    // ── Step 4: Switch the stream to frame mode ────────────────────────────
    // Bytes that arrived behind the request head belong to the first frame.
    let mut parts = FramedParts::new::<String>(stream, WsCodec::from_config(config));
    parts.read_buf = request.leftover;
    let mut framed = Framed::from_parts(parts);

    // ── Step 5: Echo loop ──────────────────────────────────────────────────
    // `None` means the client closed its side; any error ends the connection
    // without a close frame.
    while let Some(frame) = framed.next().await {
        let frame = frame.context("failed to decode frame")?;
        // Timestamp taken at decode time, before the payload is parsed.
        let at = Utc::now();

        let message = decode_message(&frame.payload).context("failed to decode message")?;
        info!("connection {id}: message received: {message}");

        let reply = build_reply(message, at)?;
        framed
            .send(reply)
            .await
            .context("failed to send reply frame")?;
    }

    debug!("connection {id}: client closed the stream");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
