//! Loopback helpers shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hostgate::config::{ServerEntry, SiteConfig};
use hostgate::proxy::{Bridge, RoutingTable};
use hostgate::server::{Dispatcher, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a site from `(name, virtual_host, upstream)` triples.
pub fn site<N, H, U>(servers: &[(N, H, U)]) -> SiteConfig
where
    N: AsRef<str>,
    H: AsRef<str>,
    U: AsRef<str>,
{
    SiteConfig {
        servers: servers
            .iter()
            .map(|(name, host, upstream)| {
                (
                    name.as_ref().to_string(),
                    ServerEntry {
                        upstream: upstream.as_ref().to_string(),
                        virtual_host: host.as_ref().to_string(),
                    },
                )
            })
            .collect(),
    }
}

pub async fn spawn_proxy(routes: RoutingTable) -> SocketAddr {
    spawn_proxy_with(routes, Some(Duration::from_secs(5))).await
}

pub async fn spawn_proxy_with(routes: RoutingTable, preamble_timeout: Option<Duration>) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0", 16).await.unwrap();
    let addr = server.local_addr().unwrap();

    let dispatcher = Dispatcher::new(
        Arc::new(routes),
        Bridge::new(Some(Duration::from_secs(2))),
        preamble_timeout,
    );
    tokio::spawn(server.run(dispatcher));

    addr
}

/// A stub upstream: reads one request head, reports it, answers with a fixed
/// response and closes.
pub struct Backend {
    pub addr: SocketAddr,
    pub accepted: Arc<AtomicUsize>,
    pub requests: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Backend {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub async fn next_request(&mut self) -> Vec<u8> {
        timeout(IO_TIMEOUT, self.requests.recv())
            .await
            .expect("backend saw no request")
            .expect("backend stopped")
    }
}

pub async fn spawn_backend(response: &[u8]) -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::unbounded_channel();
    let response = response.to_vec();

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            let response = response.clone();

            tokio::spawn(async move {
                let request = read_head(&mut stream).await;
                let _ = tx.send(request);
                let _ = stream.write_all(&response).await;
            });
        }
    });

    Backend {
        addr,
        accepted,
        requests: rx,
    }
}

/// Reads until the end of an HTTP head (`\r\n\r\n`) or EOF.
pub async fn read_head(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    buf
}

/// Reads exactly `len` bytes, or whatever arrives before EOF.
pub async fn read_len(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(len);
    let mut chunk = [0u8; 1024];

    while buf.len() < len {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    buf
}

/// Sends `request` through the proxy and collects everything until close.
pub async fn send(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_to_close(&mut stream).await
}

pub async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    timeout(IO_TIMEOUT, stream.read_to_end(&mut out))
        .await
        .expect("connection was not closed")
        .unwrap();
    out
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
