//! Error types
//!
//! Configuration errors are fatal at startup. Everything else is scoped to a
//! single client connection and never reaches the accept loop.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading settings or site files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidSetting {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read site file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write site file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to link {from} into {to}")]
    Link {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize default site")]
    Serialize(#[source] serde_yaml::Error),
}

/// Failure while reading the request preamble from a client.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The terminating blank line has not been buffered yet.
    #[error("preamble incomplete")]
    Incomplete,

    #[error("connection closed before the request line")]
    MissingRequestLine,

    #[error("connection closed before the end of the headers")]
    UnterminatedHeaders,

    #[error("preamble exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("preamble line is not valid UTF-8")]
    InvalidUtf8,

    #[error("no preamble received within {0:?}")]
    TimedOut(std::time::Duration),

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-session failure. The session that produced it is closed; nothing else
/// is affected.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no route for host {host:?}")]
    RouteNotFound { host: String },

    #[error("failed to connect to upstream {upstream}: {source}")]
    Dial {
        upstream: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replay preamble to upstream: {0}")]
    Replay(#[source] std::io::Error),

    #[error("relay failed: {0}")]
    Relay(#[source] std::io::Error),
}
