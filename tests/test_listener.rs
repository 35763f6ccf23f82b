//! Tests for the accept loop and its bounded queue

mod common;

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use common::IO_TIMEOUT;
use hostgate::server::Server;
use hostgate::server::dispatcher::Accepted;
use hostgate::server::listener::{Acceptor, accept_loop};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn test_full_queue_holds_back_next_connection() {
    let server = Server::bind("127.0.0.1:0", 1).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (queue, mut pending) = mpsc::channel(1);
    tokio::spawn(server.accept_into(queue));

    let first = TcpStream::connect(addr).await.unwrap();
    let second = TcpStream::connect(addr).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    // Only one connection fits; the second waits in the accept loop
    let (_, peer) = pending.try_recv().unwrap();
    assert_eq!(peer, first.local_addr().unwrap());
    assert!(matches!(pending.try_recv(), Err(TryRecvError::Empty)));

    let (_, peer) = timeout(IO_TIMEOUT, pending.recv())
        .await
        .expect("second connection was never queued")
        .unwrap();
    assert_eq!(peer, second.local_addr().unwrap());
}

#[tokio::test]
async fn test_accept_loop_stops_when_dispatcher_is_gone() {
    let server = Server::bind("127.0.0.1:0", 1).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (queue, pending) = mpsc::channel(1);
    drop(pending);

    let accepting = tokio::spawn(server.accept_into(queue));
    let _client = TcpStream::connect(addr).await.unwrap();

    let result = timeout(IO_TIMEOUT, accepting).await.unwrap().unwrap();
    assert!(result.is_err());
}

/// Hands out a fixed sequence of accept results, then never returns.
struct Scripted {
    results: Mutex<VecDeque<io::Result<Accepted>>>,
}

impl Acceptor for Scripted {
    fn accept(&self) -> impl Future<Output = io::Result<Accepted>> + Send {
        let next = self.results.lock().unwrap().pop_front();
        async move {
            match next {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }
}

#[tokio::test]
async fn test_accept_errors_do_not_stop_the_loop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
    let accepted = listener.accept().await.unwrap();

    let acceptor = Scripted {
        results: Mutex::new(VecDeque::from([
            Err(io::Error::from(io::ErrorKind::ConnectionAborted)),
            Err(io::Error::other("too many open files")),
            Ok(accepted),
        ])),
    };

    let (queue, mut pending) = mpsc::channel(4);
    let accepting = tokio::spawn(async move { accept_loop(&acceptor, queue).await });

    let (_, peer) = timeout(IO_TIMEOUT, pending.recv())
        .await
        .expect("accept loop gave up after an error")
        .unwrap();

    assert_eq!(peer, client.local_addr().unwrap());
    assert!(!accepting.is_finished());
    accepting.abort();
}
