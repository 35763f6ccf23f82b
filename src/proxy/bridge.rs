//! Upstream connection and byte relay
//!
//! Once a route is known the bridge dials the upstream, replays the captured
//! preamble and then copies bytes in both directions until either side
//! closes or fails. The two directions run as separate tasks so a client
//! still sending a body never blocks a backend that has started answering.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

use crate::error::ProxyError;
use crate::http::preamble::RequestPreamble;
use crate::http::response::Response;
use crate::http::writer::{serialize_preamble, write_response};
use crate::proxy::routes::RouteEntry;

/// Default buffer size for streaming
const BUFFER_SIZE: usize = 8192;

/// Bytes moved in each direction during one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Client to upstream, excluding the replayed preamble
    pub to_upstream: u64,
    /// Upstream to client
    pub to_client: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Bridge {
    /// Connection timeout duration; `None` leaves it to the OS
    connect_timeout: Option<Duration>,
}

impl Bridge {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    /// Runs one proxied exchange.
    ///
    /// `leftover` holds client bytes that were read past the preamble; they
    /// are sent to the upstream before anything else from the client. Both
    /// connections are closed when this returns, whatever the outcome.
    pub async fn serve(
        &self,
        mut client: TcpStream,
        leftover: BytesMut,
        preamble: &RequestPreamble,
        route: &RouteEntry,
    ) -> Result<RelayStats, ProxyError> {
        let mut upstream = match self.dial(&route.upstream).await {
            Ok(stream) => stream,
            Err(source) => {
                if let Err(e) = write_response(&mut client, &Response::bad_gateway()).await {
                    tracing::debug!(error = %e, "Failed to send 502 to client");
                }
                return Err(ProxyError::Dial {
                    upstream: route.upstream.clone(),
                    source,
                });
            }
        };

        tracing::trace!(upstream = %route.upstream, "Connected to upstream");

        upstream
            .write_all(&serialize_preamble(preamble))
            .await
            .map_err(ProxyError::Replay)?;

        let (client_read, mut client_write) = client.into_split();
        let (mut upstream_read, upstream_write) = upstream.into_split();

        let sent = Arc::new(AtomicU64::new(0));
        let mut outbound = tokio::spawn(relay_to_upstream(
            client_read,
            leftover,
            upstream_write,
            Arc::clone(&sent),
        ));

        // Whichever direction ends first ends the session
        let mut to_client = 0u64;
        let finished = tokio::select! {
            res = pump(&mut upstream_read, &mut client_write, &mut to_client) => Some(res),
            joined = &mut outbound => {
                if let Ok(Err(e)) = joined {
                    tracing::debug!(error = %e, "Client to upstream relay ended with error");
                }
                tracing::trace!(upstream = %route.upstream, "Client closed, ending session");
                None
            }
        };

        let inbound = match finished {
            Some(res) => {
                outbound.abort();
                if let Ok(Err(e)) = outbound.await {
                    tracing::debug!(error = %e, "Client to upstream relay ended with error");
                }
                res
            }
            None => Ok(()),
        };
        let to_upstream = sent.load(Ordering::Relaxed);

        let _ = client_write.shutdown().await;
        drop(upstream_read);

        inbound.map_err(ProxyError::Relay)?;

        Ok(RelayStats {
            to_upstream,
            to_client,
        })
    }

    async fn dial(&self, addr: &str) -> std::io::Result<TcpStream> {
        match self.connect_timeout {
            Some(limit) => timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect timed out after {limit:?}"),
                    )
                })?,
            None => TcpStream::connect(addr).await,
        }
    }
}

/// Copies the rest of the client stream to the upstream. Returning drops the
/// upstream write half, and `serve` then drops the read half, closing the
/// upstream connection.
async fn relay_to_upstream(
    mut client_read: OwnedReadHalf,
    leftover: BytesMut,
    mut upstream_write: OwnedWriteHalf,
    sent: Arc<AtomicU64>,
) -> std::io::Result<()> {
    if !leftover.is_empty() {
        upstream_write.write_all(&leftover).await?;
        sent.fetch_add(leftover.len() as u64, Ordering::Relaxed);
    }

    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let n = client_read.read(&mut buffer).await?;
        if n == 0 {
            break;
        }

        upstream_write.write_all(&buffer[..n]).await?;
        sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    upstream_write.shutdown().await
}

/// Copies `reader` into `writer` until EOF, counting bytes as they are
/// written so the total stays accurate if the copy is cancelled.
async fn pump<R, W>(reader: &mut R, writer: &mut W, count: &mut u64) -> std::io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        writer.write_all(&buffer[..n]).await?;
        *count += n as u64;
    }
}
