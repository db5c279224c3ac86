//! Invoker errors.

use meridian_proto::ProtocolError;
use meridian_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the [`Invoker`](crate::Invoker).
#[derive(Error, Debug)]
pub enum InvokerError {
    /// Operation attempted after the invoker was disposed.
    #[error("invoker disposed")]
    Disposed,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote answered with a structured error.
    #[error("remote error ({code}): {message}")]
    Remote {
        /// Wire error code.
        code: meridian_proto::ErrorCode,
        /// Message from the remote.
        message: String,
    },

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Framing or payload failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
