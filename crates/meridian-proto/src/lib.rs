//! Wire protocol for Meridian agent communication.
//!
//! Every message exchanged with an agent is a single frame with a fixed
//! 8-byte header followed by an opaque body:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │               Frame Header (8 bytes, fixed)               │
//! ├─────────────┬────────────────────┬────────────────────────┤
//! │ Version (1) │  Message Type (3)  │     Request Id (4)     │
//! ├─────────────┴────────────────────┴────────────────────────┤
//! │                      Body (opaque)                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All header fields are big-endian. Message types are partitioned by their
//! high byte into service areas (control, client, invoker, local control);
//! request types are odd and each is paired with the even response type one
//! above it, except the one-way [`MessageType::JobEvent`].
//!
//! The protocol carries raw bytes; payload encoding is the caller's
//! concern. The payload types in [`invoke`], [`job`] and [`control`] are the
//! JSON bodies the higher layers put inside frames, together with
//! [`encode_payload`]/[`decode_payload`] helpers.

mod control;
mod error;
mod frame;
mod invoke;
mod job;
mod payload;
mod types;

pub use control::{HeartbeatAck, HeartbeatPayload, RegisterAck, RegisterPayload};
pub use error::{ErrorCode, ProtocolError};
pub use frame::{Frame, FRAME_HEADER_SIZE, MAX_MESSAGE_TYPE, PROTOCOL_VERSION};
pub use invoke::{InvokeEnvelope, InvokeOptions, DEFAULT_CALL_TIMEOUT};
pub use job::{
    CancelJobPayload, CancelJobReply, Job, JobStatus, JobStatusPayload, JobStatusReply,
    StartJobPayload, StartJobReply,
};
pub use payload::{decode_payload, encode_payload, CallReply};
pub use types::{describe_type, is_request, is_response, paired_response_type, MessageType};

/// Default maximum message size accepted on a connection (4 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
