use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::proxy::routes::RoutingTable;
use crate::server::dispatcher::{Accepted, Dispatcher};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The accept side of the proxy.
///
/// Accepted connections go through a bounded queue to the [`Dispatcher`].
/// When the queue is full the accept loop waits, which in turn leaves new
/// clients in the kernel backlog.
pub struct Server {
    listener: TcpListener,
    queue_capacity: usize,
}

impl Server {
    pub async fn bind(addr: &str, queue_capacity: usize) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            queue_capacity: queue_capacity.max(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, handing each one to `dispatcher`.
    pub async fn run(self, dispatcher: Dispatcher) -> anyhow::Result<()> {
        let (queue, pending) = mpsc::channel(self.queue_capacity);
        tokio::spawn(dispatcher.run(pending));

        self.accept_into(queue).await
    }

    /// Accepts connections into `queue`. A full queue stops accepting until
    /// the consumer makes room.
    pub async fn accept_into(self, queue: mpsc::Sender<Accepted>) -> anyhow::Result<()> {
        accept_loop(&self.listener, queue).await
    }
}

/// Source of accepted connections for [`accept_loop`].
pub trait Acceptor {
    fn accept(&self) -> impl Future<Output = io::Result<Accepted>> + Send;
}

impl Acceptor for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<Accepted>> + Send {
        TcpListener::accept(self)
    }
}

/// Feeds accepted connections into `queue` until the consumer is gone.
///
/// A failed accept is logged and the loop carries on after a short pause,
/// so running out of file descriptors does not spin or stop the proxy.
pub async fn accept_loop<A>(acceptor: &A, queue: mpsc::Sender<Accepted>) -> anyhow::Result<()>
where
    A: Acceptor + ?Sized,
{
    loop {
        let (socket, peer) = match acceptor.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        debug!("Accepted connection from {}", peer);

        if queue.send((socket, peer)).await.is_err() {
            anyhow::bail!("dispatcher stopped");
        }
    }
}

pub async fn run(cfg: &Config, routes: Arc<RoutingTable>) -> anyhow::Result<()> {
    let server = Server::bind(&cfg.listen_addr, cfg.queue_capacity).await?;
    info!(
        "Listening on {} with {} routes",
        server.local_addr()?,
        routes.len()
    );

    server.run(Dispatcher::from_config(cfg, routes)).await
}
