//! Minimal HTTP/1.1 request/response shapes for peer traffic.
//!
//! Peer reads are one `GET /<base>/<group>/<key>` per connection, so a
//! full HTTP stack is not needed; this is an incremental parser over
//! `BytesMut` in the usual need-more-data style: `Ok(None)` means the
//! buffer does not yet hold a complete message.

use bytes::{Buf, BytesMut};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Maximum size of a request or response head - prevents memory
/// exhaustion from an endless header stream
const MAX_HEAD_SIZE: usize = 8 * 1024;

/// Maximum response body accepted by the peer client
const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Bytes escaped in a path segment: everything except unreserved
/// characters, matching what peers expect to decode.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Parsed request line of an incoming peer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
}

impl Request {
    /// Parse a request head from the buffer, consuming it on success.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<Request>, String> {
        let head_end = match find_head_end(buf) {
            Some(end) => end,
            None => {
                if buf.len() > MAX_HEAD_SIZE {
                    return Err("request head too large".to_string());
                }
                return Ok(None);
            }
        };
        if head_end > MAX_HEAD_SIZE {
            return Err("request head too large".to_string());
        }

        let line_end = buf[..head_end]
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(head_end);
        let line = std::str::from_utf8(&buf[..line_end])
            .map_err(|_| "request line is not UTF-8".to_string())?;

        let mut parts = line.split_whitespace();
        let method = parts.next().ok_or("missing method")?.to_string();
        let path = parts.next().ok_or("missing path")?.to_string();
        let version = parts.next().ok_or("missing HTTP version")?;
        if !version.starts_with("HTTP/") {
            return Err(format!("bad HTTP version: {}", version));
        }

        buf.advance(head_end + 4);
        Ok(Some(Request { method, path }))
    }
}

/// Outgoing (or, on the client side, parsed) HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Response {
    /// A 200 response carrying a cached value.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "application/octet-stream".to_string(),
            body,
        }
    }

    /// An error response with a plain-text message body.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: format!("{}\n", message).into_bytes(),
        }
    }

    /// Serialize head and body for the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse a full response from the buffer (used by the peer client).
    ///
    /// Requires a `Content-Length` header; peers always send one.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<Response>, String> {
        let head_end = match find_head_end(buf) {
            Some(end) => end,
            None => {
                if buf.len() > MAX_HEAD_SIZE {
                    return Err("response head too large".to_string());
                }
                return Ok(None);
            }
        };

        let head = std::str::from_utf8(&buf[..head_end])
            .map_err(|_| "response head is not UTF-8".to_string())?;
        let mut lines = head.split("\r\n");

        let status_line = lines.next().ok_or("empty response head")?;
        let mut parts = status_line.split_whitespace();
        let version = parts.next().ok_or("missing HTTP version")?;
        if !version.starts_with("HTTP/") {
            return Err(format!("bad HTTP version: {}", version));
        }
        let status: u16 = parts
            .next()
            .ok_or("missing status code")?
            .parse()
            .map_err(|_| "bad status code".to_string())?;

        let mut content_type = String::new();
        let mut content_length: Option<usize> = None;
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-type") {
                content_type = value.to_string();
            } else if name.eq_ignore_ascii_case("content-length") {
                let len = value
                    .parse()
                    .map_err(|_| "bad content-length".to_string())?;
                content_length = Some(len);
            }
        }

        let body_len = content_length.ok_or("missing content-length")?;
        if body_len > MAX_BODY_SIZE {
            return Err(format!(
                "response body too large: {} bytes (max: {} bytes)",
                body_len, MAX_BODY_SIZE
            ));
        }

        let body_start = head_end + 4;
        if buf.len() < body_start + body_len {
            return Ok(None);
        }

        buf.advance(body_start);
        let body = buf.split_to(body_len).to_vec();
        Ok(Some(Response {
            status,
            content_type,
            body,
        }))
    }
}

/// Escape a group name or key for use as one URL path segment.
pub fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT).to_string()
}

/// Decode one percent-encoded URL path segment.
pub fn decode_segment(s: &str) -> Result<String, String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| format!("invalid percent-encoding: {}", s))
}

fn find_head_end(buf: &BytesMut) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
