//! Transport errors.

use std::time::Duration;

use meridian_proto::ProtocolError;
use thiserror::Error;

/// Errors raised by channels, listeners and the socket seam.
///
/// Transport failures carry enough context (peer address, message type) to
/// diagnose and are propagated to the caller; retry policy belongs to a
/// layer above.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Operation requires a connected channel.
    #[error("not connected")]
    NotConnected,

    /// Operation on a closed channel or stopped listener.
    #[error("transport closed")]
    Closed,

    /// Failed to reach the peer.
    #[error("connection to {addr} failed: {source}")]
    Connect {
        /// Peer address.
        addr: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Failed to bind the passive endpoint.
    #[error("bind to {addr} failed: {source}")]
    Bind {
        /// Local address.
        addr: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing or payload error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The peer answered with a message type other than the paired response.
    #[error("unexpected response type {actual} (expected {expected})")]
    UnexpectedResponseType {
        /// Catalog name of the expected type.
        expected: String,
        /// Catalog name of the received type.
        actual: String,
    },

    /// `call` was invoked with a type that has no paired response.
    #[error("{0} is not a request type")]
    NotARequest(String),

    /// The caller canceled the wait; the request id is abandoned.
    #[error("call canceled")]
    Canceled,

    /// No response arrived within the call timeout.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// Inbound message exceeded the configured size limit.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Size announced by the peer.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// The peer closed the connection mid-conversation.
    #[error("peer closed the connection")]
    PeerClosed,

    /// Reply attempted with no request awaiting one.
    #[error("reply discipline violated: no request awaiting a reply")]
    NoPendingRequest,
}

impl TransportError {
    /// Whether this error is the cooperative-cancellation outcome, as
    /// opposed to a failure reported by the transport or the peer.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}
