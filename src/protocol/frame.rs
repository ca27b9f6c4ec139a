//! Request frame parsing and encoding
//!
//! A request frame is `*<count>\r\n` followed by `<count>` bulk elements,
//! each `$<len>\r\n<len bytes>\r\n`. Parsing is incremental: until a whole
//! frame is buffered the parser reports no progress and consumes nothing,
//! so callers simply retry once more bytes arrive.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

const CRLF: &[u8] = b"\r\n";

/// A completely parsed request frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Command name followed by its arguments.
    pub tokens: Vec<Bytes>,
    /// Total encoded length, the number of bytes the caller must consume.
    pub len: usize,
}

/// Malformed frame conditions.
///
/// Missing bytes are not an error; `parse` signals those with `Ok(None)`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame must start with '*'")]
    MissingArrayHeader,
    #[error("invalid {0} integer")]
    InvalidInteger(&'static str),
    #[error("bulk element must start with '$'")]
    MissingBulkHeader,
    #[error("bulk element not terminated by CRLF")]
    MissingTerminator,
}

/// Try to parse one frame from the start of `buf`.
///
/// Returns `Ok(Some(frame))` when a whole frame is present, `Ok(None)` when
/// more bytes are needed, and `Err` when the buffered bytes cannot form a
/// valid frame. Stateless: identical input always yields identical output.
pub fn parse(buf: &[u8]) -> Result<Option<Frame>, FrameError> {
    if buf.is_empty() {
        return Ok(None);
    }
    if buf[0] != b'*' {
        return Err(FrameError::MissingArrayHeader);
    }

    let line_end = match find_crlf(buf, 1) {
        Some(end) => end,
        None => return Ok(None),
    };
    let count = parse_decimal(&buf[1..line_end]).ok_or(FrameError::InvalidInteger("count"))?;
    let mut pos = line_end + 2;

    // The count comes straight off the wire; cap the preallocation hint so
    // a bogus header cannot demand the memory up front. Growth past the
    // cap is amortized as usual.
    let mut tokens = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        if pos >= buf.len() {
            return Ok(None);
        }
        if buf[pos] != b'$' {
            return Err(FrameError::MissingBulkHeader);
        }
        let line_end = match find_crlf(buf, pos + 1) {
            Some(end) => end,
            None => return Ok(None),
        };
        let len =
            parse_decimal(&buf[pos + 1..line_end]).ok_or(FrameError::InvalidInteger("length"))?;

        let payload = line_end + 2;
        if payload + len + 2 > buf.len() {
            return Ok(None);
        }
        if &buf[payload + len..payload + len + 2] != CRLF {
            return Err(FrameError::MissingTerminator);
        }
        tokens.push(Bytes::copy_from_slice(&buf[payload..payload + len]));
        pos = payload + len + 2;
    }

    Ok(Some(Frame { tokens, len: pos }))
}

/// Encode a token list as a request frame.
///
/// This is the exact grammar `parse` accepts; the store uses it to
/// serialize mutating commands into the append-only log.
pub fn encode(buf: &mut BytesMut, tokens: &[Bytes]) {
    buf.put_u8(b'*');
    buf.put_slice(tokens.len().to_string().as_bytes());
    buf.put_slice(CRLF);
    for token in tokens {
        buf.put_u8(b'$');
        buf.put_slice(token.len().to_string().as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(token);
        buf.put_slice(CRLF);
    }
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    if buf.len() < 2 {
        return None;
    }
    (from..buf.len() - 1).find(|&i| &buf[i..i + 2] == CRLF)
}

/// Non-negative ASCII decimal; anything else (including a leading '-') is
/// rejected.
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}
