use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::preamble::RequestPreamble;
use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";
const CRLF: &[u8] = b"\r\n";

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(CRLF);
    }

    // Header/body separator
    buf.extend_from_slice(CRLF);

    buf.extend_from_slice(&resp.body);

    buf
}

/// Encodes a preamble for replay to the upstream: the request line and each
/// header line followed by `\r\n`, then one blank line.
pub fn serialize_preamble(preamble: &RequestPreamble) -> Vec<u8> {
    let size = preamble.request_line.len()
        + preamble.header_lines.iter().map(|l| l.len() + 2).sum::<usize>()
        + 4;
    let mut buf = Vec::with_capacity(size);

    buf.extend_from_slice(preamble.request_line.as_bytes());
    buf.extend_from_slice(CRLF);

    for line in &preamble.header_lines {
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(CRLF);
    }

    buf.extend_from_slice(CRLF);

    buf
}

pub async fn write_response<W>(stream: &mut W, response: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(&serialize_response(response)).await?;
    stream.flush().await
}
