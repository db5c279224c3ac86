//! End-to-end invoker tests against a minimal in-process agent built on
//! the transport listener: invoke, batch fan-out, and the job lifecycle.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use meridian_invoker::{BatchRequest, Invoker, InvokerConfig, InvokerError};
use meridian_proto::{
    decode_payload, encode_payload, CallReply, CancelJobPayload, CancelJobReply, ErrorCode,
    InvokeEnvelope, InvokeOptions, Job, JobStatus, JobStatusPayload, JobStatusReply, MessageType,
    StartJobPayload, StartJobReply, DEFAULT_MAX_MESSAGE_SIZE,
};
use meridian_transport::{
    BoxError, InboundRequest, Listener, RequestCallback, TcpReplySocket,
};

/// Toy agent: echoes invokes (uppercasing the payload), fails a designated
/// function, and runs an in-memory job table.
struct ToyAgent {
    jobs: DashMap<String, Job>,
    next_job: std::sync::atomic::AtomicU32,
}

impl ToyAgent {
    fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            next_job: std::sync::atomic::AtomicU32::new(1),
        }
    }
}

#[async_trait]
impl RequestCallback for ToyAgent {
    async fn on_request(&self, request: InboundRequest) -> Result<Bytes, BoxError> {
        let t = request.msg_type;
        if t == MessageType::InvokeRequest as u32 {
            let envelope: InvokeEnvelope = decode_payload(&request.body)?;
            let reply = if envelope.function == "test.fail" {
                CallReply::error(ErrorCode::FunctionFailed, "induced failure")
            } else {
                CallReply::ok(envelope.payload.to_uppercase())
            };
            return Ok(reply.to_bytes()?);
        }
        if t == MessageType::StartJobRequest as u32 {
            let start: StartJobPayload = decode_payload(&request.body)?;
            let n = self
                .next_job
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let job_id = format!("job-{n}");
            self.jobs.insert(
                job_id.clone(),
                Job {
                    id: job_id.clone(),
                    status: JobStatus::Running,
                    progress: 0.5,
                    error: None,
                    result: Some(start.payload),
                    started_at: Some(Utc::now()),
                    ended_at: None,
                },
            );
            return Ok(encode_payload(&StartJobReply { job_id })?);
        }
        if t == MessageType::CancelJobRequest as u32 {
            let cancel: CancelJobPayload = decode_payload(&request.body)?;
            let canceled = match self.jobs.get_mut(&cancel.job_id) {
                Some(mut job) => {
                    job.status = JobStatus::Canceled;
                    job.ended_at = Some(Utc::now());
                    true
                }
                None => false,
            };
            return Ok(encode_payload(&CancelJobReply { canceled })?);
        }
        if t == MessageType::JobStatusRequest as u32 {
            let query: JobStatusPayload = decode_payload(&request.body)?;
            let job = self.jobs.get(&query.job_id).map(|entry| entry.value().clone());
            return Ok(encode_payload(&JobStatusReply { job })?);
        }
        Ok(CallReply::error(ErrorCode::InvalidPayload, "unsupported").to_bytes()?)
    }
}

async fn start_agent() -> (Listener, String) {
    let listener = Listener::new(
        "127.0.0.1:0",
        Box::new(TcpReplySocket::new(DEFAULT_MAX_MESSAGE_SIZE)),
        Arc::new(ToyAgent::new()),
    );
    listener.listen().await.expect("listen");
    let addr = listener.local_addr().expect("bound").to_string();
    (listener, addr)
}

fn invoker_for(addr: String) -> Invoker {
    Invoker::new(InvokerConfig {
        agent_address: addr,
        game_id: "game-1".to_owned(),
        ..InvokerConfig::default()
    })
}

#[tokio::test]
async fn invoke_times_the_call_and_returns_data() {
    let (listener, addr) = start_agent().await;
    let invoker = invoker_for(addr);
    invoker.connect().await.expect("connect");

    let result = invoker
        .invoke("test.echo", "hello", InvokeOptions::default(), None)
        .await
        .expect("invoke");
    assert!(result.success);
    assert_eq!(result.data.as_deref(), Some("HELLO"));
    assert!(result.elapsed > Duration::ZERO);

    invoker.close().await.expect("close");
    listener.stop().await.expect("stop");
}

#[tokio::test]
async fn remote_failure_folds_into_the_result() {
    let (listener, addr) = start_agent().await;
    let invoker = invoker_for(addr);
    invoker.connect().await.expect("connect");

    let result = invoker
        .invoke("test.fail", "x", InvokeOptions::default(), None)
        .await
        .expect("invoke");
    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::FunctionFailed));
    assert_eq!(result.error.as_deref(), Some("induced failure"));

    listener.stop().await.expect("stop");
}

#[tokio::test]
async fn batch_preserves_order_and_isolates_failures() {
    let (listener, addr) = start_agent().await;
    let invoker = invoker_for(addr);
    invoker.connect().await.expect("connect");

    let requests = vec![
        BatchRequest::new("test.echo", "one"),
        BatchRequest::new("test.fail", "two"),
        BatchRequest::new("test.echo", "three"),
    ];
    let results = invoker
        .batch_invoke(requests, InvokeOptions::default())
        .await
        .expect("batch");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].data.as_deref(), Some("ONE"));
    assert!(!results[1].success);
    assert_eq!(results[2].data.as_deref(), Some("THREE"));

    listener.stop().await.expect("stop");
}

#[tokio::test]
async fn job_lifecycle_start_status_cancel() {
    let (listener, addr) = start_agent().await;
    let invoker = invoker_for(addr);
    invoker.connect().await.expect("connect");

    let job_id = invoker
        .start_job("test.long", "{\"work\":true}")
        .await
        .expect("start");
    assert!(job_id.starts_with("job-"));

    let job = invoker
        .job_status(&job_id)
        .await
        .expect("status")
        .expect("known job");
    assert_eq!(job.status, JobStatus::Running);
    assert!((job.progress - 0.5).abs() < f32::EPSILON);

    assert!(invoker.cancel_job(&job_id).await.expect("cancel"));
    let job = invoker
        .job_status(&job_id)
        .await
        .expect("status")
        .expect("known job");
    assert_eq!(job.status, JobStatus::Canceled);
    assert!(job.ended_at.is_some());

    // Canceling an unknown job is answered, not an error.
    assert!(!invoker.cancel_job("job-unknown").await.expect("cancel"));

    listener.stop().await.expect("stop");
}

#[tokio::test]
async fn unknown_job_status_is_none() {
    let (listener, addr) = start_agent().await;
    let invoker = invoker_for(addr);
    invoker.connect().await.expect("connect");

    let status = invoker.job_status("job-nope").await.expect("status");
    assert!(status.is_none());

    listener.stop().await.expect("stop");
}

#[tokio::test]
async fn connect_failure_propagates_with_context() {
    let invoker = invoker_for("127.0.0.1:1".to_owned());
    let err = invoker.connect().await.expect_err("refused");
    match err {
        InvokerError::Transport(meridian_transport::TransportError::Connect { addr, .. }) => {
            assert_eq!(addr, "127.0.0.1:1");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}
