//! Protocol errors and wire error codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while framing or serialising messages.
///
/// Framing errors are fatal to the single decode that produced them, never
/// to the connection.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Input shorter than the fixed frame header.
    #[error("frame too short: {len} bytes (header is 8)")]
    FrameTooShort {
        /// Length of the rejected input.
        len: usize,
    },

    /// Message exceeds the configured size limit.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Size of the rejected message.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Payload serialisation error.
    #[error("serialisation error: {0}")]
    Serialisation(String),

    /// Payload deserialisation error.
    #[error("deserialisation error: {0}")]
    Deserialisation(String),
}

/// Wire-visible error codes carried in error replies.
///
/// Grouped by category:
/// - 1-19: payload errors
/// - 20-39: function errors
/// - 40-49: call-state errors
/// - 50-59: internal errors
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ErrorCode {
    /// Request body could not be parsed.
    InvalidPayload = 2,
    /// Message exceeded the size limit.
    MessageTooLarge = 4,

    /// No function registered under the requested name.
    FunctionNotFound = 20,
    /// The function handler failed.
    FunctionFailed = 21,

    /// The call did not complete within its timeout.
    Timeout = 40,
    /// The caller gave up waiting; the remote may still be executing.
    Canceled = 41,
    /// Operation attempted without a connected channel.
    NotConnected = 42,

    /// Internal error.
    Internal = 50,
}

impl ErrorCode {
    /// Returns the numeric value of this error code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates an error code from a numeric value.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(Self::InvalidPayload),
            4 => Some(Self::MessageTooLarge),
            20 => Some(Self::FunctionNotFound),
            21 => Some(Self::FunctionFailed),
            40 => Some(Self::Timeout),
            41 => Some(Self::Canceled),
            42 => Some(Self::NotConnected),
            50 => Some(Self::Internal),
            _ => None,
        }
    }

    /// Checks if this is a payload error (1-19).
    #[must_use]
    pub const fn is_payload_error(self) -> bool {
        matches!(self.as_u8(), 1..=19)
    }

    /// Checks if this is a function error (20-39).
    #[must_use]
    pub const fn is_function_error(self) -> bool {
        matches!(self.as_u8(), 20..=39)
    }

    /// Checks if this is a call-state error (40-49).
    #[must_use]
    pub const fn is_call_error(self) -> bool {
        matches!(self.as_u8(), 40..=49)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPayload => write!(f, "invalid_payload"),
            Self::MessageTooLarge => write!(f, "message_too_large"),
            Self::FunctionNotFound => write!(f, "function_not_found"),
            Self::FunctionFailed => write!(f, "function_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Canceled => write!(f, "canceled"),
            Self::NotConnected => write!(f, "not_connected"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
