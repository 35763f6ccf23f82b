//! Site files
//!
//! Routes live in YAML files under a sites root:
//!
//! ```text
//! <root>/
//! ├── sites-available/   every site file
//! │   └── default.yaml
//! └── sites-enabled/     the files that are actually loaded
//!     └── default.yaml   (hard link)
//! ```
//!
//! Each file maps logical server names to a backend address (`path`) and the
//! virtual host it serves (`address`):
//!
//! ```yaml
//! servers:
//!   blog:
//!     path: 127.0.0.1:9001
//!     address: blog.example.com
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const AVAILABLE_DIR: &str = "sites-available";
pub const ENABLED_DIR: &str = "sites-enabled";
pub const DEFAULT_SITE_FILE: &str = "default.yaml";

/// A single backend declaration inside a site file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Backend address as "host:port"
    #[serde(rename = "path")]
    pub upstream: String,

    /// Virtual host matched against the request's Host header
    #[serde(rename = "address", default)]
    pub virtual_host: String,
}

/// Contents of one site file. Servers keep the order they are declared in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default, with = "ordered_servers")]
    pub servers: Vec<(String, ServerEntry)>,
}

impl SiteConfig {
    /// The site written on first start: one server forwarding to
    /// `localhost:3000` with an empty virtual host.
    pub fn default_site() -> Self {
        Self {
            servers: vec![(
                "default".to_string(),
                ServerEntry {
                    upstream: "localhost:3000".to_string(),
                    virtual_host: String::new(),
                },
            )],
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

/// Creates the directory layout on first start.
///
/// A missing `sites-available/` is created with a `default.yaml`; a missing
/// `sites-enabled/` is created with a hard link to that default file.
pub fn bootstrap(root: &Path) -> Result<(), ConfigError> {
    let available = root.join(AVAILABLE_DIR);
    let enabled = root.join(ENABLED_DIR);
    let default_file = available.join(DEFAULT_SITE_FILE);

    if !dir_exists(&available)? {
        create_dir(&available)?;

        let yaml = serde_yaml::to_string(&SiteConfig::default_site())
            .map_err(ConfigError::Serialize)?;
        fs::write(&default_file, yaml).map_err(|source| ConfigError::Write {
            path: default_file.clone(),
            source,
        })?;

        tracing::info!(path = %default_file.display(), "Created default site file");
    }

    if !dir_exists(&enabled)? {
        create_dir(&enabled)?;

        let link = enabled.join(DEFAULT_SITE_FILE);
        fs::hard_link(&default_file, &link).map_err(|source| ConfigError::Link {
            from: default_file.clone(),
            to: link.clone(),
            source,
        })?;

        tracing::info!(path = %link.display(), "Enabled default site");
    }

    Ok(())
}

/// Loads every file in `sites-enabled/`, sorted by file name.
///
/// Subdirectories are skipped. Any unreadable or malformed file aborts the
/// whole load.
pub fn load_enabled(root: &Path) -> Result<Vec<SiteConfig>, ConfigError> {
    let enabled = root.join(ENABLED_DIR);

    let read_dir_err = |source: std::io::Error| ConfigError::ReadDir {
        path: enabled.clone(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(&enabled).map_err(read_dir_err)? {
        paths.push(entry.map_err(read_dir_err)?.path());
    }
    paths.sort();

    let mut sites = Vec::with_capacity(paths.len());
    for path in paths {
        // Follows symlinks, so a link to a directory is skipped as well
        let meta = fs::metadata(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        if meta.is_dir() {
            continue;
        }

        let site = load_site_file(&path)?;
        tracing::info!(
            file = %path.display(),
            servers = site.servers.len(),
            "Loaded site file"
        );
        sites.push(site);
    }

    Ok(sites)
}

/// Bootstraps the layout if needed, then loads the enabled sites.
pub fn load_sites(root: &Path) -> Result<Vec<SiteConfig>, ConfigError> {
    bootstrap(root)?;
    load_enabled(root)
}

pub fn load_site_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    SiteConfig::from_yaml(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn dir_exists(path: &Path) -> Result<bool, ConfigError> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ConfigError::ReadDir {
            path: PathBuf::from(path),
            source,
        }),
    }
}

fn create_dir(path: &Path) -> Result<(), ConfigError> {
    let mut builder = fs::DirBuilder::new();

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(path).map_err(|source| ConfigError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// (De)serializes the `servers` map into a list that keeps file order.
mod ordered_servers {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::ServerEntry;

    pub fn serialize<S>(servers: &[(String, ServerEntry)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(servers.len()))?;
        for (name, entry) in servers {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, ServerEntry)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ServersVisitor;

        impl<'de> Visitor<'de> for ServersVisitor {
            type Value = Vec<(String, ServerEntry)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of server names to server entries")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut servers = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, entry)) = access.next_entry::<String, ServerEntry>()? {
                    servers.push((name, entry));
                }
                Ok(servers)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Vec::new())
            }
        }

        deserializer.deserialize_map(ServersVisitor)
    }
}
