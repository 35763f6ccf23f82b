//! Process settings and site configuration.
//!
//! Settings come from environment variables; routes come from the YAML site
//! files handled by [`sites`].

pub mod sites;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub use sites::{ServerEntry, SiteConfig};

const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
const DEFAULT_QUEUE_CAPACITY: usize = 512;
/// Largest accepted `QUEUE_CAPACITY`
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;
const DEFAULT_PREAMBLE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the proxy listens on (e.g. "0.0.0.0:8000")
    pub listen_addr: String,
    /// Directory holding `sites-available/` and `sites-enabled/`
    pub sites_dir: PathBuf,
    /// Capacity of the queue between the accept loop and the dispatcher
    pub queue_capacity: usize,
    /// Deadline for receiving the request preamble; `None` waits forever
    pub preamble_timeout: Option<Duration>,
    /// Deadline for connecting to an upstream; `None` uses the OS default
    pub connect_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN.to_string(),
            sites_dir: PathBuf::from("."),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            preamble_timeout: Some(Duration::from_secs(DEFAULT_PREAMBLE_TIMEOUT_SECS)),
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
        }
    }
}

impl Config {
    /// Reads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    ///
    /// Recognised keys: `LISTEN`, `SITES_DIR`, `QUEUE_CAPACITY`,
    /// `PREAMBLE_TIMEOUT_SECS` and `CONNECT_TIMEOUT_SECS`. Missing keys keep
    /// their defaults; a timeout of `0` disables that timeout.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(listen) = lookup("LISTEN") {
            cfg.listen_addr = listen;
        }

        if let Some(dir) = lookup("SITES_DIR") {
            cfg.sites_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("QUEUE_CAPACITY") {
            let capacity = parse_number("QUEUE_CAPACITY", &raw)?;
            if capacity == 0 || capacity > MAX_QUEUE_CAPACITY as u64 {
                return Err(ConfigError::InvalidSetting {
                    key: "QUEUE_CAPACITY",
                    value: raw,
                    reason: format!("must be between 1 and {MAX_QUEUE_CAPACITY}"),
                });
            }
            cfg.queue_capacity = capacity as usize;
        }

        if let Some(raw) = lookup("PREAMBLE_TIMEOUT_SECS") {
            cfg.preamble_timeout = parse_timeout("PREAMBLE_TIMEOUT_SECS", &raw)?;
        }

        if let Some(raw) = lookup("CONNECT_TIMEOUT_SECS") {
            cfg.connect_timeout = parse_timeout("CONNECT_TIMEOUT_SECS", &raw)?;
        }

        Ok(cfg)
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidSetting {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

fn parse_timeout(key: &'static str, raw: &str) -> Result<Option<Duration>, ConfigError> {
    match parse_number(key, raw)? {
        0 => Ok(None),
        secs => Ok(Some(Duration::from_secs(secs))),
    }
}
