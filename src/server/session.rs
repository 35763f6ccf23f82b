use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ParseError, ProxyError};
use crate::http::preamble::{self, RequestPreamble};
use crate::http::response::Response;
use crate::http::writer::write_response;
use crate::proxy::bridge::RelayStats;
use crate::proxy::routes::RouteEntry;
use crate::server::dispatcher::Dispatcher;

/// One client connection, from accept until it is closed.
pub struct Session<'a> {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: BytesMut,
    dispatcher: &'a Dispatcher,
}

pub enum SessionState {
    Accepted,
    PreambleParsed(RequestPreamble),
    RouteResolved(RequestPreamble, RouteEntry),
}

impl<'a> Session<'a> {
    pub fn new(stream: TcpStream, peer: SocketAddr, dispatcher: &'a Dispatcher) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(4096),
            dispatcher,
        }
    }

    /// Drives the session to completion. The client connection is closed
    /// when this returns, on success and on every error path.
    pub async fn run(mut self) -> Result<RelayStats, ProxyError> {
        let mut state = SessionState::Accepted;

        loop {
            state = match state {
                SessionState::Accepted => {
                    let preamble = self.read_preamble().await?;

                    tracing::debug!(
                        peer = %self.peer,
                        request = %preamble.request_line,
                        host = ?preamble.host(),
                        "Preamble received"
                    );

                    SessionState::PreambleParsed(preamble)
                }

                SessionState::PreambleParsed(preamble) => {
                    let host = preamble.host().unwrap_or_default();

                    match self.dispatcher.routes().resolve(host) {
                        Some(route) => SessionState::RouteResolved(preamble, route.clone()),
                        None => {
                            if let Err(e) = write_response(&mut self.stream, &Response::not_found()).await {
                                tracing::debug!(peer = %self.peer, error = %e, "Failed to send 404 to client");
                            }
                            return Err(ProxyError::RouteNotFound {
                                host: host.to_string(),
                            });
                        }
                    }
                }

                SessionState::RouteResolved(preamble, route) => {
                    return self.bridge(preamble, route).await;
                }
            };
        }
    }

    async fn read_preamble(&mut self) -> Result<RequestPreamble, ParseError> {
        let read = preamble::read_preamble(&mut self.stream, &mut self.buffer);

        match self.dispatcher.preamble_timeout() {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| ParseError::TimedOut(limit))?,
            None => read.await,
        }
    }

    async fn bridge(self, preamble: RequestPreamble, route: RouteEntry) -> Result<RelayStats, ProxyError> {
        tracing::debug!(
            peer = %self.peer,
            server = %route.name,
            upstream = %route.upstream,
            "Bridging to upstream"
        );

        let stats = self
            .dispatcher
            .bridge()
            .serve(self.stream, self.buffer, &preamble, &route)
            .await?;

        tracing::info!(
            peer = %self.peer,
            host = %route.virtual_host,
            upstream = %route.upstream,
            request = %preamble.request_line,
            to_upstream = stats.to_upstream,
            to_client = stats.to_client,
            "Session closed"
        );

        Ok(stats)
    }
}
