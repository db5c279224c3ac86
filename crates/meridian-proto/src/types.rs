//! Message type catalog and classification.
//!
//! The 24-bit type space is partitioned by high byte:
//!
//! | Area | High byte |
//! |---|---|
//! | Control plane | 0x01 |
//! | Client | 0x02 |
//! | Invoker | 0x03 |
//! | Local control | 0x04 |
//!
//! Requests are odd, responses even, and a response type is always its
//! request type plus one. The pairing is kept in an explicit table
//! ([`MessageType::paired_response`]) so the invariant stays checkable and
//! the one-way [`MessageType::JobEvent`] cannot be paired by accident.
//! 0x030108 is deliberately unassigned: `JobEvent` occupies the odd slot
//! 0x030107, and leaving its even neighbour empty keeps `CancelJobRequest`
//! (0x030109) odd.

/// Known message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    /// Control-plane service registration.
    ControlRegisterRequest = 0x01_0101,
    /// Response to [`Self::ControlRegisterRequest`].
    ControlRegisterResponse = 0x01_0102,
    /// Control-plane heartbeat.
    ControlHeartbeatRequest = 0x01_0103,
    /// Response to [`Self::ControlHeartbeatRequest`].
    ControlHeartbeatResponse = 0x01_0104,

    /// Client registration with the agent.
    ClientRegisterRequest = 0x02_0101,
    /// Response to [`Self::ClientRegisterRequest`].
    ClientRegisterResponse = 0x02_0102,
    /// Client heartbeat.
    ClientHeartbeatRequest = 0x02_0103,
    /// Response to [`Self::ClientHeartbeatRequest`].
    ClientHeartbeatResponse = 0x02_0104,

    /// Function invocation.
    InvokeRequest = 0x03_0101,
    /// Response to [`Self::InvokeRequest`].
    InvokeResponse = 0x03_0102,
    /// Start a long-running job.
    StartJobRequest = 0x03_0103,
    /// Response to [`Self::StartJobRequest`].
    StartJobResponse = 0x03_0104,
    /// Query a job's status.
    JobStatusRequest = 0x03_0105,
    /// Response to [`Self::JobStatusRequest`].
    JobStatusResponse = 0x03_0106,
    /// One-way job progress event. Neither request nor response.
    JobEvent = 0x03_0107,
    /// Cancel a running job.
    CancelJobRequest = 0x03_0109,
    /// Response to [`Self::CancelJobRequest`].
    CancelJobResponse = 0x03_010A,

    /// Local-control service registration.
    LocalRegisterRequest = 0x04_0101,
    /// Response to [`Self::LocalRegisterRequest`].
    LocalRegisterResponse = 0x04_0102,
    /// Local-control heartbeat.
    LocalHeartbeatRequest = 0x04_0103,
    /// Response to [`Self::LocalHeartbeatRequest`].
    LocalHeartbeatResponse = 0x04_0104,
    /// List functions known to the local controller.
    LocalListRequest = 0x04_0105,
    /// Response to [`Self::LocalListRequest`].
    LocalListResponse = 0x04_0106,
}

impl MessageType {
    /// Creates a message type from its numeric value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x01_0101 => Some(Self::ControlRegisterRequest),
            0x01_0102 => Some(Self::ControlRegisterResponse),
            0x01_0103 => Some(Self::ControlHeartbeatRequest),
            0x01_0104 => Some(Self::ControlHeartbeatResponse),
            0x02_0101 => Some(Self::ClientRegisterRequest),
            0x02_0102 => Some(Self::ClientRegisterResponse),
            0x02_0103 => Some(Self::ClientHeartbeatRequest),
            0x02_0104 => Some(Self::ClientHeartbeatResponse),
            0x03_0101 => Some(Self::InvokeRequest),
            0x03_0102 => Some(Self::InvokeResponse),
            0x03_0103 => Some(Self::StartJobRequest),
            0x03_0104 => Some(Self::StartJobResponse),
            0x03_0105 => Some(Self::JobStatusRequest),
            0x03_0106 => Some(Self::JobStatusResponse),
            0x03_0107 => Some(Self::JobEvent),
            0x03_0109 => Some(Self::CancelJobRequest),
            0x03_010A => Some(Self::CancelJobResponse),
            0x04_0101 => Some(Self::LocalRegisterRequest),
            0x04_0102 => Some(Self::LocalRegisterResponse),
            0x04_0103 => Some(Self::LocalHeartbeatRequest),
            0x04_0104 => Some(Self::LocalHeartbeatResponse),
            0x04_0105 => Some(Self::LocalListRequest),
            0x04_0106 => Some(Self::LocalListResponse),
            _ => None,
        }
    }

    /// Returns the numeric value of this message type.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// The response type paired with this request type.
    ///
    /// `None` for responses and for [`Self::JobEvent`], which has no pair.
    #[must_use]
    pub const fn paired_response(self) -> Option<Self> {
        match self {
            Self::ControlRegisterRequest => Some(Self::ControlRegisterResponse),
            Self::ControlHeartbeatRequest => Some(Self::ControlHeartbeatResponse),
            Self::ClientRegisterRequest => Some(Self::ClientRegisterResponse),
            Self::ClientHeartbeatRequest => Some(Self::ClientHeartbeatResponse),
            Self::InvokeRequest => Some(Self::InvokeResponse),
            Self::StartJobRequest => Some(Self::StartJobResponse),
            Self::JobStatusRequest => Some(Self::JobStatusResponse),
            Self::CancelJobRequest => Some(Self::CancelJobResponse),
            Self::LocalRegisterRequest => Some(Self::LocalRegisterResponse),
            Self::LocalHeartbeatRequest => Some(Self::LocalHeartbeatResponse),
            Self::LocalListRequest => Some(Self::LocalListResponse),
            _ => None,
        }
    }

    /// Service area of this type (the high byte of its identifier).
    #[must_use]
    pub const fn area(self) -> u8 {
        (self.as_u32() >> 16) as u8
    }

    /// Human-readable catalog name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ControlRegisterRequest => "ControlRegisterRequest",
            Self::ControlRegisterResponse => "ControlRegisterResponse",
            Self::ControlHeartbeatRequest => "ControlHeartbeatRequest",
            Self::ControlHeartbeatResponse => "ControlHeartbeatResponse",
            Self::ClientRegisterRequest => "ClientRegisterRequest",
            Self::ClientRegisterResponse => "ClientRegisterResponse",
            Self::ClientHeartbeatRequest => "ClientHeartbeatRequest",
            Self::ClientHeartbeatResponse => "ClientHeartbeatResponse",
            Self::InvokeRequest => "InvokeRequest",
            Self::InvokeResponse => "InvokeResponse",
            Self::StartJobRequest => "StartJobRequest",
            Self::StartJobResponse => "StartJobResponse",
            Self::JobStatusRequest => "JobStatusRequest",
            Self::JobStatusResponse => "JobStatusResponse",
            Self::JobEvent => "JobEvent",
            Self::CancelJobRequest => "CancelJobRequest",
            Self::CancelJobResponse => "CancelJobResponse",
            Self::LocalRegisterRequest => "LocalRegisterRequest",
            Self::LocalRegisterResponse => "LocalRegisterResponse",
            Self::LocalHeartbeatRequest => "LocalHeartbeatRequest",
            Self::LocalHeartbeatResponse => "LocalHeartbeatResponse",
            Self::LocalListRequest => "LocalListRequest",
            Self::LocalListResponse => "LocalListResponse",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a raw type identifier names a request.
///
/// Requests are odd; the one-way [`MessageType::JobEvent`] is excluded even
/// though it sits in an odd slot.
#[must_use]
pub const fn is_request(msg_type: u32) -> bool {
    msg_type & 1 == 1 && msg_type != MessageType::JobEvent as u32
}

/// Whether a raw type identifier names a response.
#[must_use]
pub const fn is_response(msg_type: u32) -> bool {
    msg_type & 1 == 0 && msg_type != MessageType::JobEvent as u32
}

/// The response type paired with a raw request type, through the catalog
/// table. `None` for unknown types, responses and the event type.
#[must_use]
pub fn paired_response_type(request_type: u32) -> Option<u32> {
    MessageType::from_u32(request_type)
        .and_then(MessageType::paired_response)
        .map(MessageType::as_u32)
}

/// Human-readable name for a raw type identifier, for diagnostics.
///
/// Unrecognised identifiers get a deterministic `Unknown(0x……)` placeholder.
#[must_use]
pub fn describe_type(msg_type: u32) -> String {
    match MessageType::from_u32(msg_type) {
        Some(known) => known.name().to_owned(),
        None => format!("Unknown(0x{msg_type:06X})"),
    }
}
