//! Host-based routing table
//!
//! Built once from the enabled site files before the listener starts, then
//! shared read-only with every session.

use std::collections::HashSet;

use crate::config::SiteConfig;

/// One virtual host and the upstream that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Logical server name from the site file
    pub name: String,
    /// Host header value this entry answers to, matched exactly
    pub virtual_host: String,
    /// Backend address as "host:port"
    pub upstream: String,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    /// Flattens every server of every site into one table.
    ///
    /// Order is site order, then declaration order within a site. When a
    /// virtual host is declared more than once the first declaration wins.
    pub fn build(sites: &[SiteConfig]) -> Self {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for site in sites {
            for (name, server) in &site.servers {
                if !server.virtual_host.is_empty() && !seen.insert(server.virtual_host.clone()) {
                    tracing::warn!(
                        host = %server.virtual_host,
                        server = %name,
                        "Duplicate virtual host, earlier entry takes precedence"
                    );
                }

                entries.push(RouteEntry {
                    name: name.clone(),
                    virtual_host: server.virtual_host.clone(),
                    upstream: server.upstream.clone(),
                });
            }
        }

        Self { entries }
    }

    /// Finds the first entry whose virtual host equals `host`.
    ///
    /// Matching is exact: case-sensitive, no port stripping, no wildcards.
    /// An empty `host` never matches.
    pub fn resolve(&self, host: &str) -> Option<&RouteEntry> {
        if host.is_empty() {
            return None;
        }

        self.entries.iter().find(|e| e.virtual_host == host)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
