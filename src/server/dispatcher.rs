//! Per-connection dispatch
//!
//! Drains the accept queue and runs every connection as its own task, so a
//! slow client only ever holds up itself.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::ProxyError;
use crate::proxy::bridge::Bridge;
use crate::proxy::routes::RoutingTable;
use crate::server::session::Session;

/// An accepted connection waiting for dispatch.
pub type Accepted = (TcpStream, SocketAddr);

#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: Arc<RoutingTable>,
    bridge: Bridge,
    preamble_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(routes: Arc<RoutingTable>, bridge: Bridge, preamble_timeout: Option<Duration>) -> Self {
        Self {
            routes,
            bridge,
            preamble_timeout,
        }
    }

    pub fn from_config(cfg: &Config, routes: Arc<RoutingTable>) -> Self {
        Self::new(routes, Bridge::new(cfg.connect_timeout), cfg.preamble_timeout)
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn preamble_timeout(&self) -> Option<Duration> {
        self.preamble_timeout
    }

    /// Spawns a session for every connection pulled off `queue`. Returns once
    /// the sending side of the queue is gone.
    pub async fn run(self, mut queue: mpsc::Receiver<Accepted>) {
        let shared = Arc::new(self);

        while let Some((stream, peer)) = queue.recv().await {
            let dispatcher = Arc::clone(&shared);
            tokio::spawn(async move {
                dispatcher.handle(stream, peer).await;
            });
        }

        tracing::debug!("Connection queue closed, dispatcher stopping");
    }

    /// Runs one session and reports how it ended.
    pub async fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let result = Session::new(stream, peer, self).run().await;

        match result {
            Ok(_) => {}
            Err(ProxyError::Parse(e)) => {
                tracing::warn!(peer = %peer, error = %e, "Failed to read request preamble");
            }
            Err(ProxyError::RouteNotFound { host }) => {
                tracing::info!(peer = %peer, host = %host, "No server found for host");
            }
            Err(e @ ProxyError::Dial { .. }) => {
                tracing::error!(peer = %peer, error = %e, "Upstream unreachable");
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Session aborted");
            }
        }
    }
}
