//! The socket seam and length-delimited message framing.
//!
//! Sockets move whole messages, not byte streams: each message on a TCP
//! connection is prefixed with its length as a big-endian u32. The protocol
//! frame (header + body) travels as one such message, so frame boundaries
//! survive the stream transport.
//!
//! The two traits here are the only transport-dependent seam in the
//! workspace. Implement them against a different primitive to move the
//! whole stack onto it.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::TransportError;

/// Active side of the request/reply conversation.
///
/// One logical connection to a peer: `send` a request message, `recv` the
/// reply. Implementations are not required to be usable concurrently; the
/// channel serialises access.
#[async_trait]
pub trait RequestSocket: Send {
    /// Opens the connection to the peer.
    async fn connect(&mut self, addr: &str) -> Result<(), TransportError>;

    /// Sends one message.
    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError>;

    /// Receives one message.
    async fn recv(&mut self) -> Result<Bytes, TransportError>;

    /// Releases the connection. Idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Passive side of the request/reply conversation.
///
/// `recv` yields the next inbound message from any peer connection; `send`
/// answers the connection that delivered it. Strict alternation per
/// message: every `recv` is followed by at most one `send`.
#[async_trait]
pub trait ReplySocket: Send {
    /// Binds the passive endpoint and starts accepting peers.
    async fn bind(&mut self, addr: &str) -> Result<(), TransportError>;

    /// Receives the next inbound message.
    async fn recv(&mut self) -> Result<Bytes, TransportError>;

    /// Replies to the connection that delivered the last received message.
    async fn send(&mut self, message: &[u8]) -> Result<(), TransportError>;

    /// Stops accepting and releases all connections. Idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// The bound local address, once bound.
    fn local_addr(&self) -> Option<SocketAddr>;
}

/// Reads one length-delimited message from the stream.
///
/// Returns `None` on clean EOF at a message boundary. `max_len` caps the
/// accepted message size; an oversized announcement fails without reading
/// the body.
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<Bytes>, TransportError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_len {
        return Err(TransportError::MessageTooLarge {
            size: len,
            max: max_len,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(Bytes::from(buf)))
}

/// Writes one length-delimited message to the stream.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    message: &[u8],
) -> Result<(), TransportError> {
    writer.write_all(&(message.len() as u32).to_be_bytes()).await?;
    writer.write_all(message).await?;
    writer.flush().await?;
    Ok(())
}
