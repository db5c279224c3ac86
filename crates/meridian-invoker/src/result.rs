//! Call outcomes.

use std::time::Duration;

use meridian_proto::ErrorCode;

/// Outcome of one outbound invocation.
///
/// Constructed once and immutable. Always carries the elapsed duration,
/// whether the call succeeded, failed remotely, timed out or was canceled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResult {
    /// Whether the call succeeded.
    pub success: bool,

    /// Response payload on success.
    pub data: Option<String>,

    /// Error message on failure.
    pub error: Option<String>,

    /// Wire error code on failure, when one applies.
    pub error_code: Option<ErrorCode>,

    /// How long the call took, success or not.
    pub elapsed: Duration,
}

impl InvokeResult {
    /// A successful outcome.
    #[must_use]
    pub fn ok(data: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
            error_code: None,
            elapsed,
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn failed(
        code: Option<ErrorCode>,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: code,
            elapsed,
        }
    }

    /// The cancellation outcome, distinguishable from remote failure.
    #[must_use]
    pub fn canceled(elapsed: Duration) -> Self {
        Self::failed(Some(ErrorCode::Canceled), "call canceled", elapsed)
    }

    /// Whether the caller gave up waiting rather than the call failing.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.error_code == Some(ErrorCode::Canceled)
    }
}
