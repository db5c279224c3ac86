//! Framed request/reply transport for Meridian.
//!
//! This crate owns the two halves of the wire conversation:
//!
//! - [`Channel`]: the outbound side. Opens a connection to an agent,
//!   sends request frames and correlates the paired responses. Calls are
//!   serialised: one in-flight request per channel, concurrent callers
//!   queue behind a single lock.
//! - [`Listener`]: the inbound side. Binds a passive endpoint, decodes
//!   inbound request frames, raises them to a [`RequestCallback`] and
//!   transmits the callback's reply, answering even when the callback
//!   fails.
//!
//! Both sides talk through the narrow socket seam ([`RequestSocket`],
//! [`ReplySocket`]), implemented here once over TCP with 4-byte
//! length-delimited messages. Everything above the seam is
//! transport-agnostic.

mod channel;
mod error;
mod listener;
mod socket;
mod tcp;

pub use channel::{CallOptions, Channel, ChannelState};
pub use error::TransportError;
pub use listener::{InboundRequest, Listener, ListenerState, RequestCallback};
pub use socket::{read_message, write_message, ReplySocket, RequestSocket};
pub use tcp::{TcpReplySocket, TcpRequestSocket};

/// Boxed error type carried across the callback boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
