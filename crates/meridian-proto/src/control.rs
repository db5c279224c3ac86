//! Registration and heartbeat payloads.
//!
//! A client announces itself after connecting and then heartbeats at a
//! configured interval so the agent can track liveness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a [`ClientRegisterRequest`](crate::MessageType::ClientRegisterRequest).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterPayload {
    /// Identifier of the registering service.
    pub service_id: String,

    /// Tenant game identifier.
    #[serde(default)]
    pub game_id: String,

    /// Tenant environment.
    #[serde(default)]
    pub environment: String,

    /// Full names of the functions this client serves.
    #[serde(default)]
    pub functions: Vec<String>,
}

impl RegisterPayload {
    /// Creates a registration payload with no functions listed.
    #[must_use]
    pub fn new(
        service_id: impl Into<String>,
        game_id: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            game_id: game_id.into(),
            environment: environment.into(),
            functions: Vec::new(),
        }
    }

    /// Sets the served function names.
    #[must_use]
    pub fn with_functions(mut self, functions: Vec<String>) -> Self {
        self.functions = functions;
        self
    }
}

/// Body of a [`ClientRegisterResponse`](crate::MessageType::ClientRegisterResponse).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterAck {
    /// Whether the agent accepted the registration.
    pub accepted: bool,

    /// Optional diagnostic message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of a [`ClientHeartbeatRequest`](crate::MessageType::ClientHeartbeatRequest).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatPayload {
    /// Identifier of the heartbeating service.
    pub service_id: String,

    /// Send time.
    pub timestamp: DateTime<Utc>,
}

impl HeartbeatPayload {
    /// Creates a heartbeat stamped with the current time.
    #[must_use]
    pub fn now(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of a [`ClientHeartbeatResponse`](crate::MessageType::ClientHeartbeatResponse).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartbeatAck {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payload::{decode_payload, encode_payload};

    #[test]
    fn register_payload_roundtrip() {
        let payload = RegisterPayload::new("svc-inventory", "game-1", "production")
            .with_functions(vec!["inventory.grant_item".into(), "inventory.list".into()]);
        let bytes = encode_payload(&payload).unwrap();
        let back: RegisterPayload = decode_payload(&bytes).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.functions.len(), 2);
    }

    #[test]
    fn heartbeat_carries_service_id() {
        let payload = HeartbeatPayload::now("svc-inventory");
        let bytes = encode_payload(&payload).unwrap();
        let back: HeartbeatPayload = decode_payload(&bytes).unwrap();
        assert_eq!(back.service_id, "svc-inventory");
    }

    #[test]
    fn ack_roundtrip() {
        let bytes = encode_payload(&RegisterAck {
            accepted: true,
            message: None,
        })
        .unwrap();
        let back: RegisterAck = decode_payload(&bytes).unwrap();
        assert!(back.accepted);

        let bytes = encode_payload(&HeartbeatAck::default()).unwrap();
        let _: HeartbeatAck = decode_payload(&bytes).unwrap();
    }
}
