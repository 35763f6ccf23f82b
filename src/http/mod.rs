//! Just enough HTTP/1.x to route a request.
//!
//! - **`preamble`**: reads the request line and headers and extracts the Host value
//! - **`response`**: the few responses the proxy produces itself (404, 502)
//! - **`writer`**: serializes responses and replays preambles
//!
//! Bodies, keep-alive and everything after the preamble are never parsed;
//! they are relayed as raw bytes by [`crate::proxy::bridge`].

pub mod preamble;
pub mod response;
pub mod writer;
