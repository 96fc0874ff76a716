//! Framing codec for the V8 debugger protocol.
//!
//! Wire format:
//! ```text
//! Name: value\r\n
//! Content-Length: N\r\n
//! \r\n
//! <N bytes of UTF-8 JSON>
//! ```
//!
//! `Content-Length` counts bytes, not characters.  The very first frame the
//! debuggee sends after a TCP connect is a handshake with an empty body:
//!
//! ```text
//! Type: connect\r\nV8-Version: 3.28.71.19\r\nProtocol-Version: 1\r\nContent-Length: 0\r\n\r\n
//! ```
//!
//! # What is framing? (for beginners)
//!
//! TCP delivers a stream of bytes, not a sequence of messages.  One `read()`
//! may return half a message, or the tail of one message followed by the
//! start of the next.  A *framing* scheme marks where each message ends.
//!
//! Here the marker is the `Content-Length` header: after the blank line
//! (`\r\n\r\n`) come exactly that many body bytes.  The decoder therefore
//! works in two stages:
//!
//! 1. Find the blank line.  Until it arrives, the answer is
//!    [`CodecError::InsufficientData`] and the caller reads more.
//! 2. Parse `Content-Length` and check that the whole body is buffered.
//!
//! The decoder returns how many bytes it consumed so the caller can drop
//! them from its buffer and decode the next frame.
//!
//! # Limits
//!
//! `Content-Length` comes from the other side of a socket, so it is bounded
//! by [`MAX_FRAME_LEN`] and the header block by a few kilobytes.  A frame over
//! either limit is reported as [`CodecError::MalformedHeader`] rather than
//! buffered forever.

use thiserror::Error;
use tracing::trace;

use crate::protocol::messages::{WireMessage, WireRequest};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "Content-Length";

/// Largest body the codec accepts.  Script sources are the biggest bodies the
/// debuggee sends; anything past this means the stream is corrupt.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Largest header block the codec waits for before giving up on finding
/// the blank line.
const MAX_HEADER_LEN: usize = 8 * 1024;

/// Errors that can occur while framing or unframing messages.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// The buffer does not yet hold a complete frame.  Not fatal: read more
    /// bytes and try again.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// A header line was not valid UTF-8 or not of the form `Name: value`.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The header block has no `Content-Length` line.
    #[error("frame has no Content-Length header")]
    MissingContentLength,

    /// The body was not valid UTF-8.
    #[error("frame body is not valid UTF-8")]
    InvalidUtf8,

    /// The body was not a recognised JSON message.
    #[error("invalid message body: {0}")]
    InvalidJson(String),
}

/// One decoded frame: its headers and raw body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl WireFrame {
    /// Returns the value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `true` for the connect handshake the debuggee sends first.
    pub fn is_handshake(&self) -> bool {
        self.header("Type")
            .is_some_and(|v| v.eq_ignore_ascii_case("connect"))
    }

    /// Parses the body into a [`WireMessage`].
    ///
    /// Returns `Ok(None)` for an empty body (the handshake).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidJson`] if the body is not a known message.
    pub fn message(&self) -> Result<Option<WireMessage>, CodecError> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|e| CodecError::InvalidJson(e.to_string()))
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a request as one frame.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`] if the arguments cannot be serialised
/// (only possible with non-string map keys inside a hand-built `Value`).
///
/// # Examples
///
/// ```rust
/// use inspector_core::protocol::{encode_request, decode_frame, WireRequest};
///
/// let bytes = encode_request(&WireRequest::new(1, "suspend", None)).unwrap();
/// let (frame, consumed) = decode_frame(&bytes).unwrap();
/// assert_eq!(consumed, bytes.len());
/// assert!(frame.body.contains("\"suspend\""));
/// ```
pub fn encode_request(request: &WireRequest) -> Result<Vec<u8>, CodecError> {
    encode_message(&WireMessage::Request(request.clone()))
}

/// Encodes any message as one frame.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`] if serialisation fails.
pub fn encode_message(message: &WireMessage) -> Result<Vec<u8>, CodecError> {
    let body = serde_json::to_string(message).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    let mut buf = Vec::with_capacity(body.len() + 32);
    buf.extend_from_slice(format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len()).as_bytes());
    buf.extend_from_slice(body.as_bytes());
    Ok(buf)
}

/// Decodes one frame from the beginning of `bytes`.
///
/// Returns the frame and the number of bytes consumed so the caller can
/// advance its buffer.
///
/// # Errors
///
/// [`CodecError::InsufficientData`] when the header block or body is not
/// complete yet; any other variant means the stream is corrupt.
pub fn decode_frame(bytes: &[u8]) -> Result<(WireFrame, usize), CodecError> {
    let Some(header_end) = find_terminator(bytes) else {
        if bytes.len() > MAX_HEADER_LEN {
            return Err(CodecError::MalformedHeader(format!(
                "no end of headers within {MAX_HEADER_LEN} bytes"
            )));
        }
        return Err(CodecError::InsufficientData {
            needed: bytes.len() + 1,
            available: bytes.len(),
        });
    };

    let header_text = std::str::from_utf8(&bytes[..header_end])
        .map_err(|_| CodecError::MalformedHeader("header block is not UTF-8".to_string()))?;
    let headers = parse_headers(header_text)?;

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(CONTENT_LENGTH))
        .ok_or(CodecError::MissingContentLength)?
        .1
        .parse::<usize>()
        .map_err(|_| CodecError::MalformedHeader(format!("bad {CONTENT_LENGTH}")))?;
    if content_length > MAX_FRAME_LEN {
        return Err(CodecError::MalformedHeader(format!(
            "{CONTENT_LENGTH} {content_length} exceeds {MAX_FRAME_LEN}"
        )));
    }

    let body_start = header_end + HEADER_TERMINATOR.len();
    let total = body_start
        .checked_add(content_length)
        .ok_or_else(|| CodecError::MalformedHeader(format!("{CONTENT_LENGTH} overflows")))?;
    if bytes.len() < total {
        return Err(CodecError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }

    let body = std::str::from_utf8(&bytes[body_start..total])
        .map_err(|_| CodecError::InvalidUtf8)?
        .to_string();

    trace!(content_length, "decoded frame");
    Ok((WireFrame { headers, body }, total))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

fn parse_headers(text: &str) -> Result<Vec<(String, String)>, CodecError> {
    text.split("\r\n")
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| CodecError::MalformedHeader(line.to_string()))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::WireResponse;
    use serde_json::json;

    const HANDSHAKE: &[u8] =
        b"Type: connect\r\nV8-Version: 3.28.71.19\r\nProtocol-Version: 1\r\nEmbedding-Host: node v0.12.7\r\nContent-Length: 0\r\n\r\n";

    fn frame_with_body(body: &str) -> Vec<u8> {
        let mut buf = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        buf.extend_from_slice(body.as_bytes());
        buf
    }

    #[test]
    fn test_decode_handshake_frame() {
        // Act
        let (frame, consumed) = decode_frame(HANDSHAKE).unwrap();

        // Assert
        assert_eq!(consumed, HANDSHAKE.len());
        assert!(frame.is_handshake());
        assert_eq!(frame.header("v8-version"), Some("3.28.71.19"));
        assert_eq!(frame.message().unwrap(), None);
    }

    #[test]
    fn test_partial_header_returns_insufficient_data() {
        // Arrange: cut the handshake before the blank line
        let partial = &HANDSHAKE[..20];

        // Act
        let result = decode_frame(partial);

        // Assert
        assert!(matches!(result, Err(CodecError::InsufficientData { .. })));
    }

    #[test]
    fn test_partial_body_returns_insufficient_data_with_total_needed() {
        let full = frame_with_body(r#"{"seq":1,"type":"event","event":"break"}"#);
        let partial = &full[..full.len() - 5];

        let result = decode_frame(partial);

        assert_eq!(
            result,
            Err(CodecError::InsufficientData {
                needed: full.len(),
                available: full.len() - 5
            })
        );
    }

    #[test]
    fn test_two_frames_in_one_buffer_decode_independently() {
        // Arrange: handshake immediately followed by a response (TCP coalescing)
        let response = r#"{"seq":2,"type":"response","request_seq":1,"success":true,"running":false}"#;
        let mut buf = HANDSHAKE.to_vec();
        buf.extend_from_slice(&frame_with_body(response));

        // Act
        let (first, n1) = decode_frame(&buf).unwrap();
        let (second, n2) = decode_frame(&buf[n1..]).unwrap();

        // Assert
        assert!(first.is_handshake());
        assert_eq!(n1 + n2, buf.len());
        match second.message().unwrap() {
            Some(WireMessage::Response(WireResponse { request_seq, running, .. })) => {
                assert_eq!(request_seq, 1);
                assert_eq!(running, Some(false));
            }
            other => panic!("expected Response, got {other:?}"),
        }
    }

    #[test]
    fn test_content_length_counts_bytes_not_chars() {
        // "ü" is two bytes in UTF-8
        let request = WireRequest::new(5, "evaluate", Some(json!({"expression": "'ü'"})));
        let bytes = encode_request(&request).unwrap();

        let (frame, consumed) = decode_frame(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(
            frame.header("Content-Length").unwrap().parse::<usize>().unwrap(),
            frame.body.len()
        );
    }

    #[test]
    fn test_missing_content_length_is_an_error() {
        let result = decode_frame(b"Type: connect\r\n\r\n");
        assert_eq!(result, Err(CodecError::MissingContentLength));
    }

    #[test]
    fn test_header_line_without_colon_is_malformed() {
        let result = decode_frame(b"garbage\r\nContent-Length: 0\r\n\r\n");
        assert!(matches!(result, Err(CodecError::MalformedHeader(_))));
    }

    #[test]
    fn test_non_numeric_content_length_is_malformed() {
        let result = decode_frame(b"Content-Length: ten\r\n\r\n");
        assert!(matches!(result, Err(CodecError::MalformedHeader(_))));
    }

    #[test]
    fn test_huge_content_length_is_rejected_without_panicking() {
        // Arrange
        let bytes = b"Content-Length: 18446744073709551615\r\n\r\n{}";

        // Act
        let result = decode_frame(bytes);

        // Assert
        assert!(matches!(result, Err(CodecError::MalformedHeader(_))));
    }

    #[test]
    fn test_content_length_above_cap_is_malformed() {
        let header = format!("Content-Length: {}\r\n\r\n", MAX_FRAME_LEN + 1);
        let result = decode_frame(header.as_bytes());
        assert!(matches!(result, Err(CodecError::MalformedHeader(_))));
    }

    #[test]
    fn test_content_length_at_cap_waits_for_body() {
        let header = format!("Content-Length: {MAX_FRAME_LEN}\r\n\r\n");
        let result = decode_frame(header.as_bytes());
        assert!(matches!(result, Err(CodecError::InsufficientData { .. })));
    }

    #[test]
    fn test_endless_header_block_is_malformed() {
        let bytes = vec![b'a'; MAX_HEADER_LEN + 1];
        let result = decode_frame(&bytes);
        assert!(matches!(result, Err(CodecError::MalformedHeader(_))));
    }

    #[test]
    fn test_unknown_body_type_is_invalid_json() {
        let bytes = frame_with_body(r#"{"type":"gossip"}"#);
        let (frame, _) = decode_frame(&bytes).unwrap();
        assert!(matches!(frame.message(), Err(CodecError::InvalidJson(_))));
    }
}
