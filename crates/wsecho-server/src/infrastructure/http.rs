//! HTTP/1.1 front door: reads the request head and decides whether the
//! connection is a WebSocket upgrade or a plain request.
//!
//! # Why keep the leftover bytes?
//!
//! A client may send its first frame right behind the upgrade request, and
//! one `read()` can return both.  Whatever follows the blank line that ends
//! the head is returned as [`ParsedRequest::leftover`] so the frame decoder
//! starts with it instead of losing it.

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on the request head.  Larger heads close the connection.
pub const MAX_REQUEST_HEAD_LEN: usize = 8 * 1024;

const MAX_HEADERS: usize = 64;

/// Response for any request that is not a WebSocket upgrade.
pub const HELLO_WORLD_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/plain\r\n\
    Content-Length: 13\r\n\
    Connection: close\r\n\
    \r\n\
    Hello, World!";

/// Response for an upgrade request without `Sec-WebSocket-Key`.
pub const BAD_REQUEST_RESPONSE: &str = "HTTP/1.1 400 Bad Request\r\n\
    Content-Length: 0\r\n\
    Connection: close\r\n\
    \r\n";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("connection closed before the request head was complete")]
    UnexpectedEof,

    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    #[error("malformed request head: {0}")]
    Malformed(#[from] httparse::Error),

    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),
}

/// What kind of request arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestHead {
    /// `Upgrade: websocket` was present.  `key` is the raw
    /// `Sec-WebSocket-Key` value, if any.
    Upgrade { path: String, key: Option<String> },
    /// Anything else.
    Plain { method: String, path: String },
}

/// A complete request head plus the bytes that arrived after it.
#[derive(Debug)]
pub struct ParsedRequest {
    pub head: RequestHead,
    pub leftover: BytesMut,
}

/// Reads from `stream` until a full request head is buffered.
///
/// # Errors
///
/// - [`HttpError::UnexpectedEof`] if the peer closes first.
/// - [`HttpError::HeadTooLarge`] past [`MAX_REQUEST_HEAD_LEN`] bytes.
/// - [`HttpError::Malformed`] if `httparse` rejects the head.
pub async fn read_request<S>(stream: &mut S) -> Result<ParsedRequest, HttpError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);

    loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(HttpError::UnexpectedEof);
        }

        let parsed = {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut req = httparse::Request::new(&mut headers);
            match req.parse(&buf)? {
                httparse::Status::Complete(head_len) => Some((classify(&req), head_len)),
                httparse::Status::Partial => None,
            }
        };

        match parsed {
            Some((head, head_len)) => {
                let leftover = buf.split_off(head_len);
                return Ok(ParsedRequest { head, leftover });
            }
            None if buf.len() >= MAX_REQUEST_HEAD_LEN => {
                return Err(HttpError::HeadTooLarge(MAX_REQUEST_HEAD_LEN));
            }
            None => {}
        }
    }
}

fn classify(req: &httparse::Request<'_, '_>) -> RequestHead {
    let path = req.path.unwrap_or("/").to_string();
    let is_upgrade = header_value(req.headers, "upgrade")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("websocket"));

    if is_upgrade {
        RequestHead::Upgrade {
            path,
            key: header_value(req.headers, "sec-websocket-key").map(|v| v.trim().to_string()),
        }
    } else {
        RequestHead::Plain {
            method: req.method.unwrap_or("GET").to_string(),
            path,
        }
    }
}

fn header_value(headers: &[httparse::Header<'_>], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| String::from_utf8_lossy(h.value).into_owned())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
