//! Client errors.

use meridian_proto::ProtocolError;
use meridian_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the [`Client`](crate::Client).
#[derive(Error, Debug)]
pub enum ClientError {
    /// Descriptor failed validation; the registry was not touched.
    #[error("invalid function descriptor: {0}")]
    InvalidDescriptor(String),

    /// Operation attempted after the client was disposed.
    #[error("client disposed")]
    Disposed,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The agent rejected the registration handshake.
    #[error("agent rejected registration: {0}")]
    RegistrationRejected(String),

    /// The remote answered a call with a structured error.
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
