//! hostgate - host-based reverse proxy
//!
//! Reads the preamble of each HTTP/1.x request, picks an upstream by the
//! Host header and splices client and upstream together.

pub mod config;
pub mod error;
pub mod http;
pub mod proxy;
pub mod server;
