//! Function invocation payloads and per-call options.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of an [`InvokeRequest`](crate::MessageType::InvokeRequest) frame.
///
/// Carries the target function's full name, the caller's tenant and
/// identity context, and the payload string. The payload is opaque to the
/// protocol; encoding is agreed between caller and handler.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InvokeEnvelope {
    /// Target function full name (`category.id`).
    pub function: String,

    /// Tenant game identifier.
    #[serde(default)]
    pub game_id: String,

    /// Tenant environment.
    #[serde(default)]
    pub environment: String,

    /// Calling user, when the call is made on a user's behalf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Idempotency key for safely retryable calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    /// Identifier of the calling service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_service_id: Option<String>,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    /// Request payload.
    pub payload: String,
}

impl InvokeEnvelope {
    /// Creates an envelope with just a function name and payload.
    #[must_use]
    pub fn new(function: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            game_id: String::new(),
            environment: String::new(),
            user_id: None,
            idempotency_key: None,
            caller_service_id: None,
            metadata: HashMap::new(),
            payload: payload.into(),
        }
    }

    /// Applies per-call options over the given tenant defaults.
    #[must_use]
    pub fn with_options(
        mut self,
        options: &InvokeOptions,
        default_game_id: &str,
        default_environment: &str,
    ) -> Self {
        self.game_id = options
            .game_id
            .clone()
            .unwrap_or_else(|| default_game_id.to_owned());
        self.environment = options
            .environment
            .clone()
            .unwrap_or_else(|| default_environment.to_owned());
        self.user_id = options.user_id.clone();
        self.idempotency_key = options.idempotency_key.clone();
        self.metadata = options.metadata.clone();
        self
    }
}

/// Per-call overrides supplied by an outbound caller.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// Overrides the configured game id for this call.
    pub game_id: Option<String>,

    /// Overrides the configured environment for this call.
    pub environment: Option<String>,

    /// How long to wait for the response.
    pub timeout: Duration,

    /// Idempotency key forwarded to the handler.
    pub idempotency_key: Option<String>,

    /// Explicit request id; allocated by the channel when absent.
    pub request_id: Option<u32>,

    /// Calling user forwarded to the handler.
    pub user_id: Option<String>,

    /// Free-form metadata forwarded to the handler.
    pub metadata: HashMap<String, String>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            game_id: None,
            environment: None,
            timeout: DEFAULT_CALL_TIMEOUT,
            idempotency_key: None,
            request_id: None,
            user_id: None,
            metadata: HashMap::new(),
        }
    }
}

impl InvokeOptions {
    /// Sets the call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Sets the calling user.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
