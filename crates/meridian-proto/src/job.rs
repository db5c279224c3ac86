//! Long-running job payloads.
//!
//! Jobs track asynchronous server-side work by status and progress rather
//! than a direct call/response. The snapshots here are decoded from
//! [`JobStatusResponse`](crate::MessageType::JobStatusResponse) bodies;
//! only the remote side mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Canceled before completion.
    Canceled,
}

impl JobStatus {
    /// Whether the job can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Snapshot of a remote job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Job {
    /// Opaque job identifier.
    pub id: String,

    /// Current lifecycle state.
    pub status: JobStatus,

    /// Completion fraction in `[0.0, 1.0]`.
    #[serde(default)]
    pub progress: f32,

    /// Failure message, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Result payload, when completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// When execution started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When execution ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Body of a [`StartJobRequest`](crate::MessageType::StartJobRequest).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StartJobPayload {
    /// Function to run as a job.
    pub function: String,
    /// Request payload.
    pub payload: String,
}

/// Body of a [`StartJobResponse`](crate::MessageType::StartJobResponse).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StartJobReply {
    /// Identifier of the accepted job.
    pub job_id: String,
}

/// Body of a [`CancelJobRequest`](crate::MessageType::CancelJobRequest).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CancelJobPayload {
    /// Job to cancel.
    pub job_id: String,
}

/// Body of a [`CancelJobResponse`](crate::MessageType::CancelJobResponse).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CancelJobReply {
    /// Whether the remote accepted the cancellation.
    pub canceled: bool,
}

/// Body of a [`JobStatusRequest`](crate::MessageType::JobStatusRequest).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobStatusPayload {
    /// Job to query.
    pub job_id: String,
}

/// Body of a [`JobStatusResponse`](crate::MessageType::JobStatusResponse).
///
/// `job` is `None` when the remote does not know the id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobStatusReply {
    /// Snapshot, if the job is known.
    #[serde(default)]
    pub job: Option<Job>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payload::{decode_payload, encode_payload};

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
    }

    #[test]
    fn job_snapshot_roundtrip() {
        let job = Job {
            id: "job-123".into(),
            status: JobStatus::Running,
            progress: 0.25,
            error: None,
            result: None,
            started_at: Some(Utc::now()),
            ended_at: None,
        };
        let bytes = encode_payload(&job).unwrap();
        let back: Job = decode_payload(&bytes).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn status_reply_with_unknown_job() {
        let bytes = encode_payload(&JobStatusReply { job: None }).unwrap();
        let back: JobStatusReply = decode_payload(&bytes).unwrap();
        assert!(back.job.is_none());
    }

    #[test]
    fn status_serialises_as_snake_case() {
        let json = serde_json::to_string(&JobStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
        assert_eq!(JobStatus::Canceled.to_string(), "canceled");
    }
}
