//! JSON payload helpers and the call reply envelope.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ProtocolError};

/// Encodes a payload value to JSON bytes for a frame body.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Bytes, ProtocolError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| ProtocolError::Serialisation(e.to_string()))
}

/// Decodes a payload value from a frame body.
pub fn decode_payload<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(bytes).map_err(|e| ProtocolError::Deserialisation(e.to_string()))
}

/// Outcome of a dispatched call, as carried on the wire.
///
/// The dispatch loop always answers with one of these (success payload or
/// structured error) so error replies stay parseable instead of being
/// whatever a formatter produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallReply {
    /// Successful call carrying the handler's response data.
    Ok {
        /// Response payload.
        data: String,
    },
    /// Failed call with a structured error.
    Error {
        /// Wire error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
}

impl CallReply {
    /// Creates a success reply.
    #[must_use]
    pub fn ok(data: impl Into<String>) -> Self {
        Self::Ok { data: data.into() }
    }

    /// Creates an error reply.
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Whether this reply carries a success payload.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Encodes this reply to a frame body.
    pub fn to_bytes(&self) -> Result<Bytes, ProtocolError> {
        encode_payload(self)
    }

    /// Decodes a reply from a frame body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        decode_payload(bytes)
    }
}
