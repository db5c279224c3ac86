//! TCP implementations of the socket seam.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::socket::{read_message, write_message, ReplySocket, RequestSocket};

/// Default depth of the inbound message queue on a reply socket.
const DEFAULT_QUEUE_DEPTH: usize = 64;

/// [`RequestSocket`] over a single TCP connection.
#[derive(Debug)]
pub struct TcpRequestSocket {
    max_message_size: usize,
    stream: Option<TcpStream>,
}

impl TcpRequestSocket {
    /// Creates an unconnected socket.
    #[must_use]
    pub const fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            stream: None,
        }
    }
}

#[async_trait]
impl RequestSocket for TcpRequestSocket {
    async fn connect(&mut self, addr: &str) -> Result<(), TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_owned(),
                source,
            })?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        write_message(stream, message).await
    }

    async fn recv(&mut self) -> Result<Bytes, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        read_message(stream, self.max_message_size)
            .await?
            .ok_or(TransportError::PeerClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            use tokio::io::AsyncWriteExt;
            // Shutdown failures at close are uninteresting.
            let _ = stream.shutdown().await;
        }
        Ok(())
    }
}

/// [`ReplySocket`] over a TCP listener.
///
/// Accepts any number of peer connections; a background task per connection
/// funnels inbound messages into one queue, and each reply is routed back
/// to the connection that delivered the request it answers.
pub struct TcpReplySocket {
    max_message_size: usize,
    queue_depth: usize,
    inner: Option<ReplyInner>,
}

struct ReplyInner {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<(u64, Bytes)>,
    writers: Arc<DashMap<u64, Arc<Mutex<OwnedWriteHalf>>>>,
    current: Option<u64>,
    cancel: CancellationToken,
}

impl TcpReplySocket {
    /// Creates an unbound socket.
    #[must_use]
    pub const fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            inner: None,
        }
    }

    /// Sets the inbound queue depth (backpressure on fast peers).
    #[must_use]
    pub const fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }
}

impl std::fmt::Debug for TcpReplySocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpReplySocket")
            .field("max_message_size", &self.max_message_size)
            .field("bound", &self.inner.is_some())
            .finish()
    }
}

#[async_trait]
impl ReplySocket for TcpReplySocket {
    async fn bind(&mut self, addr: &str) -> Result<(), TransportError> {
        if self.inner.is_some() {
            return Ok(());
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = mpsc::channel(self.queue_depth);
        let writers: Arc<DashMap<u64, Arc<Mutex<OwnedWriteHalf>>>> = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();

        let accept_writers = writers.clone();
        let accept_cancel = cancel.clone();
        let max_message_size = self.max_message_size;
        tokio::spawn(async move {
            let next_id = AtomicU64::new(1);
            loop {
                let (stream, peer) = tokio::select! {
                    () = accept_cancel.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("accept failed: {e}");
                            continue;
                        }
                    },
                };

                let id = next_id.fetch_add(1, Ordering::Relaxed);
                let (mut read_half, write_half) = stream.into_split();
                accept_writers.insert(id, Arc::new(Mutex::new(write_half)));
                debug!(conn = id, %peer, "peer connected");

                let tx = tx.clone();
                let writers = accept_writers.clone();
                let cancel = accept_cancel.clone();
                tokio::spawn(async move {
                    loop {
                        let message = tokio::select! {
                            () = cancel.cancelled() => break,
                            read = read_message(&mut read_half, max_message_size) => match read {
                                Ok(Some(message)) => message,
                                Ok(None) => break,
                                Err(e) => {
                                    debug!(conn = id, %peer, "read failed: {e}");
                                    break;
                                }
                            },
                        };
                        if tx.send((id, message)).await.is_err() {
                            break;
                        }
                    }
                    writers.remove(&id);
                    debug!(conn = id, %peer, "peer disconnected");
                });
            }
        });

        self.inner = Some(ReplyInner {
            local_addr,
            rx,
            writers,
            current: None,
            cancel,
        });
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes, TransportError> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        match inner.rx.recv().await {
            Some((id, message)) => {
                inner.current = Some(id);
                Ok(message)
            }
            None => Err(TransportError::Closed),
        }
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        let id = inner.current.take().ok_or(TransportError::NoPendingRequest)?;

        let writer = inner
            .writers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(TransportError::PeerClosed)?;

        let mut writer = writer.lock().await;
        write_message(&mut *writer, message).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(inner) = self.inner.take() {
            inner.cancel.cancel();
            inner.writers.clear();
        }
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.as_ref().map(|inner| inner.local_addr)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_socket_requires_connect() {
        let mut socket = TcpRequestSocket::new(1024);
        assert!(matches!(
            socket.send(b"x").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            socket.recv().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connect_failure_reports_the_address() {
        let mut socket = TcpRequestSocket::new(1024);
        // Port 1 on loopback refuses immediately.
        let err = socket.connect("127.0.0.1:1").await;
        match err {
            Err(TransportError::Connect { addr, .. }) => assert_eq!(addr, "127.0.0.1:1"),
            other => panic!("expected Connect error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_socket_roundtrip() {
        let mut reply = TcpReplySocket::new(1024);
        reply.bind("127.0.0.1:0").await.unwrap();
        let addr = reply.local_addr().unwrap();

        let mut request = TcpRequestSocket::new(1024);
        request.connect(&addr.to_string()).await.unwrap();
        request.send(b"ping").await.unwrap();

        let inbound = reply.recv().await.unwrap();
        assert_eq!(&inbound[..], b"ping");
        reply.send(b"pong").await.unwrap();

        let reply_msg = request.recv().await.unwrap();
        assert_eq!(&reply_msg[..], b"pong");

        request.close().await.unwrap();
        reply.close().await.unwrap();
    }

    #[tokio::test]
    async fn reply_without_pending_request_is_rejected() {
        let mut reply = TcpReplySocket::new(1024);
        reply.bind("127.0.0.1:0").await.unwrap();
        assert!(matches!(
            reply.send(b"orphan").await,
            Err(TransportError::NoPendingRequest)
        ));
        reply.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut reply = TcpReplySocket::new(1024);
        reply.bind("127.0.0.1:0").await.unwrap();
        reply.close().await.unwrap();
        reply.close().await.unwrap();

        let mut request = TcpRequestSocket::new(1024);
        request.close().await.unwrap();
        request.close().await.unwrap();
    }
}
