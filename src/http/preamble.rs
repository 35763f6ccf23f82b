//! Request preamble parsing
//!
//! Only the request line, the raw header lines and the Host value are
//! extracted. Nothing else about the request is interpreted: the preamble is
//! replayed to the upstream as-is and the rest of the stream is relayed
//! untouched.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ParseError;

/// Largest preamble accepted before giving up on a client.
pub const MAX_PREAMBLE_SIZE: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

/// The request line and headers of an HTTP/1.x request.
///
/// Lines are stored without their `\r\n` / `\n` terminator but otherwise
/// byte-for-byte as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPreamble {
    /// e.g. "GET / HTTP/1.1" (not validated)
    pub request_line: String,
    /// Header lines in arrival order
    pub header_lines: Vec<String>,
    /// Trimmed value of the last `Host:` header, if any
    pub host: Option<String>,
}

impl RequestPreamble {
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}

/// Parses a preamble from the start of `buf`.
///
/// Returns the preamble and the number of bytes it occupied, or
/// [`ParseError::Incomplete`] if the terminating blank line is not in `buf`
/// yet.
pub fn parse_preamble(buf: &[u8]) -> Result<(RequestPreamble, usize), ParseError> {
    let mut pos = 0;

    let request_line = next_line(buf, &mut pos).ok_or(ParseError::Incomplete)?;
    let request_line = decode(request_line)?.to_string();

    let mut header_lines = Vec::new();
    let mut host = None;

    loop {
        let line = next_line(buf, &mut pos).ok_or(ParseError::Incomplete)?;
        if line.is_empty() {
            break;
        }

        let line = decode(line)?;
        if let Some(value) = host_value(line) {
            // last one wins
            host = Some(value.to_string());
        }
        header_lines.push(line.to_string());
    }

    let preamble = RequestPreamble {
        request_line,
        header_lines,
        host,
    };

    Ok((preamble, pos))
}

/// Reads from `reader` into `buf` until a full preamble is available.
///
/// On success the preamble bytes are removed from `buf`; anything the client
/// sent after the blank line (a body, pipelined requests) is left in `buf`.
pub async fn read_preamble<R>(reader: &mut R, buf: &mut BytesMut) -> Result<RequestPreamble, ParseError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        match parse_preamble(&buf[..]) {
            Ok((preamble, consumed)) => {
                buf.advance(consumed);
                return Ok(preamble);
            }
            Err(ParseError::Incomplete) => {}
            Err(e) => return Err(e),
        }

        if buf.len() >= MAX_PREAMBLE_SIZE {
            return Err(ParseError::TooLarge {
                limit: MAX_PREAMBLE_SIZE,
            });
        }

        buf.reserve(READ_CHUNK);
        let n = reader.read_buf(buf).await?;

        if n == 0 {
            return Err(if buf.contains(&b'\n') {
                ParseError::UnterminatedHeaders
            } else {
                ParseError::MissingRequestLine
            });
        }
    }
}

/// Next `\n`-terminated line starting at `pos`, without `\n` or a trailing `\r`.
fn next_line<'a>(buf: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let rest = &buf[*pos..];
    let end = rest.iter().position(|&b| b == b'\n')?;
    *pos += end + 1;

    let line = &rest[..end];
    Some(line.strip_suffix(b"\r").unwrap_or(line))
}

fn decode(line: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)
}

fn host_value(line: &str) -> Option<&str> {
    let name = line.get(..5)?;
    if name.eq_ignore_ascii_case("host:") {
        Some(line[5..].trim())
    } else {
        None
    }
}
