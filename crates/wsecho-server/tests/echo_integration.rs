//! End-to-end tests for the echo server over real TCP sockets.
//!
//! # Purpose
//!
//! Each test binds the server on an ephemeral loopback port, runs the accept
//! loop in a background task, and talks to it the way a client would.  They
//! verify:
//!
//! - The happy path: handshake, one masked JSON frame, one enveloped reply.
//! - Framing across reads: a frame split over several TCP writes is still
//!   decoded once complete.
//! - The plain HTTP front door answers `Hello, World!`.
//! - An invalid frame closes the connection without a reply, including the
//!   64-bit indicator in legacy length mode.
//! - A standard client (`tokio-tungstenite`) interoperates with the server.
//! - Connections are independent of one another.
//!
//! # Wire layout used by the raw-socket tests
//!
//! ```text
//! Client                                   Server
//! ──────                                   ──────
//! GET / + Sec-WebSocket-Key  ───────────▶
//!                            ◀───────────  101 + Sec-WebSocket-Accept
//! 0x81 | 0x80+len | key | masked payload ─▶
//!                            ◀───────────  0x81 | len | {"message":…,"at":…}
//! ```

use std::net::SocketAddr;
use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use wsecho_core::protocol::encode_client_frame;
use wsecho_core::LengthMode;
use wsecho_server::domain::ServerConfig;
use wsecho_server::infrastructure::{bind, serve};

const CLIENT_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
const EXPECTED_ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Starts a default server on `127.0.0.1:0` and returns its address.
async fn start_server() -> SocketAddr {
    start_server_with(LengthMode::Rfc6455).await
}

/// Starts a server on `127.0.0.1:0` with the given length mode.
///
/// The accept loop runs until the test's runtime shuts down.
async fn start_server_with(length_mode: LengthMode) -> SocketAddr {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        length_mode,
        ..ServerConfig::default()
    };
    let listener = bind(&config).await.expect("bind loopback listener");
    let addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    tokio::spawn(async move {
        serve(listener, config, running).await.unwrap();
    });

    addr
}

fn upgrade_request() -> String {
    format!(
        "GET / HTTP/1.1\r\n\
         Host: localhost\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {CLIENT_KEY}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    )
}

/// Reads bytes until the blank line that ends an HTTP response head.
async fn read_response_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.expect("read response head");
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

/// Reads one small (< 126 byte payload) unmasked server frame.
async fn read_small_text_frame(stream: &mut TcpStream) -> Value {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await.expect("read frame header");
    assert_eq!(header[0], 0x81, "expected FIN + text opcode");
    assert!(header[1] < 126, "server frames are unmasked and small here");

    let mut payload = vec![0u8; usize::from(header[1])];
    stream.read_exact(&mut payload).await.expect("read frame payload");
    serde_json::from_slice(&payload).expect("reply is JSON")
}

async fn connect_and_upgrade(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();
    stream.write_all(upgrade_request().as_bytes()).await.unwrap();

    let head = read_response_head(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    assert!(head.contains(&format!("Sec-WebSocket-Accept: {EXPECTED_ACCEPT}\r\n")));
    stream
}

// ── Raw-socket tests ──────────────────────────────────────────────────────────

/// Handshake, then `{"hi":1}` masked with key `01 02 03 04`.  The reply
/// carries the same value and a timestamp taken while the test was running.
#[tokio::test]
async fn test_echo_single_message_over_tcp() {
    // Arrange
    let addr = start_server().await;
    let mut stream = connect_and_upgrade(addr).await;
    let before = Utc::now();

    // Act
    stream
        .write_all(&encode_client_frame("{\"hi\":1}", [1, 2, 3, 4]))
        .await
        .unwrap();
    let reply = read_small_text_frame(&mut stream).await;
    let after = Utc::now();

    // Assert
    assert_eq!(reply["message"], json!({"hi": 1}));
    let at = reply["at"].as_str().expect("at is a string");
    assert_eq!(at.len(), "2024-05-01T12:00:00.123Z".len());
    assert!(at.ends_with('Z'));
    let at: DateTime<Utc> = DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc);
    // Millisecond truncation can put `at` just before `before`.
    assert!(at >= before - chrono::TimeDelta::milliseconds(1));
    assert!(at <= after);
}

/// Several messages on one connection are answered in order.
#[tokio::test]
async fn test_echo_multiple_messages_in_order() {
    let addr = start_server().await;
    let mut stream = connect_and_upgrade(addr).await;

    for n in 0..3 {
        let text = format!("{{\"n\":{n}}}");
        stream
            .write_all(&encode_client_frame(&text, [7, 7, 7, 7]))
            .await
            .unwrap();
        let reply = read_small_text_frame(&mut stream).await;
        assert_eq!(reply["message"], json!({"n": n}));
    }
}

/// The frame is written in three pieces with pauses in between; the server
/// must wait for the whole frame instead of misreading the prefix.
#[tokio::test]
async fn test_frame_split_across_writes_is_reassembled() {
    // Arrange
    let addr = start_server().await;
    let mut stream = connect_and_upgrade(addr).await;
    let frame = encode_client_frame("[1,2,3]", [0xA1, 0xB2, 0xC3, 0xD4]);

    // Act: header byte, then header + part of the mask, then the rest
    for chunk in [&frame[..1], &frame[1..4], &frame[4..]] {
        stream.write_all(chunk).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let reply = read_small_text_frame(&mut stream).await;

    // Assert
    assert_eq!(reply["message"], json!([1, 2, 3]));
}

/// A payload in the 16-bit size class is decoded and echoed in a 16-bit
/// class reply.
#[tokio::test]
async fn test_medium_payload_uses_extended_length() {
    let addr = start_server().await;
    let mut stream = connect_and_upgrade(addr).await;
    let text = format!("\"{}\"", "a".repeat(300));

    stream
        .write_all(&encode_client_frame(&text, [5, 6, 7, 8]))
        .await
        .unwrap();

    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0], 0x81);
    assert_eq!(header[1], 126);
    let len = usize::from(u16::from_be_bytes([header[2], header[3]]));
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    let reply: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(reply["message"], json!("a".repeat(300)));
}

/// A request without upgrade headers gets the plain-text greeting.
#[tokio::test]
async fn test_plain_http_request_gets_hello_world() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("\r\n\r\nHello, World!"));
}

/// An unmasked client frame is a protocol error: no reply, connection
/// closed.
#[tokio::test]
async fn test_unmasked_frame_closes_connection_without_reply() {
    let addr = start_server().await;
    let mut stream = connect_and_upgrade(addr).await;

    stream.write_all(&[0x81, 0x02, b'{', b'}']).await.unwrap();
    let mut rest = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .expect("server closes the connection");

    // Either a clean EOF or a reset, but never a reply frame.
    if let Ok(n) = read {
        assert_eq!(n, 0);
    }
}

/// In legacy mode small frames still echo, but the 64-bit indicator reads
/// no length: the payload is empty, fails JSON parsing and the connection
/// closes without a reply.
#[tokio::test]
async fn test_legacy_mode_64_bit_indicator_closes_connection() {
    // Arrange
    let addr = start_server_with(LengthMode::Legacy).await;
    let mut stream = connect_and_upgrade(addr).await;
    stream
        .write_all(&encode_client_frame("{\"ok\":1}", [3, 1, 4, 1]))
        .await
        .unwrap();
    let reply = read_small_text_frame(&mut stream).await;
    assert_eq!(reply["message"], json!({"ok": 1}));

    // Act: indicator 127, then the four bytes legacy mode takes as the key
    stream
        .write_all(&[0x81, 0x80 | 127, 0, 0, 0, 0])
        .await
        .unwrap();
    let mut rest = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .expect("server closes the connection");

    // Assert
    if let Ok(n) = read {
        assert_eq!(n, 0, "no reply frame expected");
    }
}

/// One client's failure does not affect another client's session.
#[tokio::test]
async fn test_connections_are_independent() {
    // Arrange
    let addr = start_server().await;
    let mut good = connect_and_upgrade(addr).await;
    let mut bad = connect_and_upgrade(addr).await;

    // Act: break the second connection, then use the first one
    bad.write_all(&encode_client_frame("not json", [1, 1, 1, 1]))
        .await
        .unwrap();
    let mut sink = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), bad.read_to_end(&mut sink)).await;

    good.write_all(&encode_client_frame("true", [2, 2, 2, 2]))
        .await
        .unwrap();
    let reply = read_small_text_frame(&mut good).await;

    // Assert
    assert_eq!(reply["message"], json!(true));
}

// ── Interoperability ──────────────────────────────────────────────────────────

/// A stock client library accepts the handshake and reads the reply frame.
#[tokio::test]
async fn test_tungstenite_client_round_trip() {
    // Arrange
    let addr = start_server().await;
    let (mut ws, response) = connect_async(format!("ws://{addr}/"))
        .await
        .expect("handshake accepted by tungstenite");
    assert_eq!(response.status().as_u16(), 101);

    // Act
    ws.send(Message::Text("{\"user\":\"ada\",\"tags\":[1,2]}".to_string()))
        .await
        .unwrap();
    let reply = ws.next().await.expect("one reply").expect("valid frame");

    // Assert
    let text = match reply {
        Message::Text(text) => text,
        other => panic!("expected a text frame, got {other:?}"),
    };
    let reply: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reply["message"], json!({"user": "ada", "tags": [1, 2]}));
    // Key order of the envelope is message, then at.
    assert!(text.starts_with("{\"message\":"));
    assert!(reply["at"].is_string());
}
