//! Per-invocation context handed to function handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Immutable metadata for one function invocation.
///
/// Built by the dispatcher immediately before the handler runs and dropped
/// when the call returns. Cheap to clone.
#[derive(Clone)]
pub struct FunctionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    function_id: String,
    call_id: String,
    game_id: String,
    environment: String,
    user_id: Option<String>,
    timestamp: DateTime<Utc>,
    idempotency_key: Option<String>,
    caller_service_id: Option<String>,
}

impl FunctionContext {
    /// Builds a context for one call, stamped with a fresh call id and the
    /// current time.
    #[must_use]
    pub fn new(
        function_id: impl Into<String>,
        game_id: impl Into<String>,
        environment: impl Into<String>,
        user_id: Option<String>,
        idempotency_key: Option<String>,
        caller_service_id: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                function_id: function_id.into(),
                call_id: ulid::Ulid::new().to_string(),
                game_id: game_id.into(),
                environment: environment.into(),
                user_id,
                timestamp: Utc::now(),
                idempotency_key,
                caller_service_id,
            }),
        }
    }

    /// The invoked function's full name.
    #[must_use]
    pub fn function_id(&self) -> &str {
        &self.inner.function_id
    }

    /// Unique id of this call.
    #[must_use]
    pub fn call_id(&self) -> &str {
        &self.inner.call_id
    }

    /// Tenant game identifier.
    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.inner.game_id
    }

    /// Tenant environment.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.inner.environment
    }

    /// Calling user, when the call is made on a user's behalf.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.inner.user_id.as_deref()
    }

    /// When the dispatcher accepted the call.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.inner.timestamp
    }

    /// Caller-supplied idempotency key.
    #[must_use]
    pub fn idempotency_key(&self) -> Option<&str> {
        self.inner.idempotency_key.as_deref()
    }

    /// Identifier of the calling service.
    #[must_use]
    pub fn caller_service_id(&self) -> Option<&str> {
        self.inner.caller_service_id.as_deref()
    }
}

impl std::fmt::Debug for FunctionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionContext")
            .field("function_id", &self.inner.function_id)
            .field("call_id", &self.inner.call_id)
            .field("game_id", &self.inner.game_id)
            .field("environment", &self.inner.environment)
            .finish()
    }
}
