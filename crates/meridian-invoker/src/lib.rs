//! Call-only Meridian client.
//!
//! An [`Invoker`] issues outbound calls without serving anything itself:
//! single [`invoke`](Invoker::invoke), fan-out
//! [`batch_invoke`](Invoker::batch_invoke), and the lifecycle of
//! long-running jobs (start, cancel, status).
//!
//! `invoke` never fails as a `Result` except after disposal: transport
//! failures, remote errors, timeouts and cancellation all fold into a
//! failed [`InvokeResult`] so callers branch on the outcome, not on a
//! nested error type.

mod config;
mod error;
mod invoker;
mod result;

pub use config::InvokerConfig;
pub use error::InvokerError;
pub use invoker::{BatchRequest, Invoker};
pub use result::InvokeResult;

// Re-exported so most callers need only this crate.
pub use meridian_proto::{InvokeOptions, Job, JobStatus};
