//! The call-only façade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use meridian_proto::{
    decode_payload, encode_payload, CallReply, CancelJobPayload, CancelJobReply, ErrorCode,
    InvokeEnvelope, InvokeOptions, Job, JobStatusPayload, JobStatusReply, MessageType,
    StartJobPayload, StartJobReply,
};
use meridian_transport::{CallOptions, Channel, TcpRequestSocket, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::InvokerConfig;
use crate::error::InvokerError;
use crate::result::InvokeResult;

/// One request in a [`batch_invoke`](Invoker::batch_invoke) fan-out.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Target function full name.
    pub function_id: String,
    /// Request payload.
    pub payload: String,
}

impl BatchRequest {
    /// Creates a batch request.
    #[must_use]
    pub fn new(function_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            function_id: function_id.into(),
            payload: payload.into(),
        }
    }
}

/// Call-only client over one [`Channel`]: invoke, batch invoke, job
/// lifecycle. Cheap to clone; all clones share the channel.
#[derive(Clone)]
pub struct Invoker {
    inner: Arc<InvokerInner>,
}

struct InvokerInner {
    config: InvokerConfig,
    channel: Channel,
    disposed: AtomicBool,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("agent", &self.inner.config.agent_address)
            .finish()
    }
}

impl Invoker {
    /// Creates an invoker from configuration, talking TCP to the agent.
    #[must_use]
    pub fn new(config: InvokerConfig) -> Self {
        let channel = Channel::with_socket(
            config.agent_address.clone(),
            Box::new(TcpRequestSocket::new(config.max_message_size)),
        );
        Self::with_channel(config, channel)
    }

    /// Creates an invoker over an existing channel.
    #[must_use]
    pub fn with_channel(config: InvokerConfig, channel: Channel) -> Self {
        Self {
            inner: Arc::new(InvokerInner {
                config,
                channel,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_live(&self) -> Result<(), InvokerError> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(InvokerError::Disposed);
        }
        Ok(())
    }

    /// Connects the underlying channel.
    pub async fn connect(&self) -> Result<(), InvokerError> {
        self.ensure_live()?;
        self.inner.channel.connect().await?;
        Ok(())
    }

    /// Closes the underlying channel. Idempotent.
    pub async fn close(&self) -> Result<(), InvokerError> {
        self.inner.channel.close().await?;
        Ok(())
    }

    /// Tears the invoker down. Idempotent; afterwards every operation
    /// fails fast with [`InvokerError::Disposed`].
    pub async fn dispose(&self) -> Result<(), InvokerError> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.channel.close().await?;
        Ok(())
    }

    /// Invokes a function and folds every failure into the returned
    /// [`InvokeResult`].
    ///
    /// Only prior disposal surfaces as an `Err`; transport failures, remote
    /// errors, timeout and cancellation all come back as failed results
    /// with the matching error code and the elapsed duration.
    pub async fn invoke(
        &self,
        function_id: &str,
        payload: &str,
        options: InvokeOptions,
        cancellation: Option<CancellationToken>,
    ) -> Result<InvokeResult, InvokerError> {
        self.ensure_live()?;

        let started = Instant::now();

        let mut envelope = InvokeEnvelope::new(function_id, payload).with_options(
            &options,
            &self.inner.config.game_id,
            &self.inner.config.environment,
        );
        envelope.caller_service_id = Some(self.inner.config.service_id.clone());

        let body = match encode_payload(&envelope) {
            Ok(body) => body,
            Err(e) => {
                return Ok(InvokeResult::failed(
                    Some(ErrorCode::InvalidPayload),
                    e.to_string(),
                    started.elapsed(),
                ))
            }
        };

        let call_options = CallOptions {
            timeout: Some(options.timeout),
            cancellation,
            request_id: options.request_id,
        };

        let outcome = self
            .inner
            .channel
            .call_with(MessageType::InvokeRequest as u32, body, call_options)
            .await;
        let elapsed = started.elapsed();

        let reply_bytes = match outcome {
            Ok(bytes) => bytes,
            Err(TransportError::Canceled) => return Ok(InvokeResult::canceled(elapsed)),
            Err(e @ TransportError::Timeout(_)) => {
                return Ok(InvokeResult::failed(
                    Some(ErrorCode::Timeout),
                    e.to_string(),
                    elapsed,
                ))
            }
            Err(e @ (TransportError::NotConnected | TransportError::Closed)) => {
                return Ok(InvokeResult::failed(
                    Some(ErrorCode::NotConnected),
                    e.to_string(),
                    elapsed,
                ))
            }
            Err(e) => {
                return Ok(InvokeResult::failed(
                    Some(ErrorCode::Internal),
                    e.to_string(),
                    elapsed,
                ))
            }
        };

        debug!(function = function_id, elapsed_ms = elapsed.as_millis() as u64, "invoke answered");

        match CallReply::from_bytes(&reply_bytes) {
            Ok(CallReply::Ok { data }) => Ok(InvokeResult::ok(data, elapsed)),
            Ok(CallReply::Error { code, message }) => {
                Ok(InvokeResult::failed(Some(code), message, elapsed))
            }
            Err(e) => Ok(InvokeResult::failed(
                Some(ErrorCode::InvalidPayload),
                e.to_string(),
                elapsed,
            )),
        }
    }

    /// Invokes every request concurrently and joins all outcomes.
    ///
    /// Order is preserved and failures are independent: one failed sibling
    /// never aborts the rest.
    pub async fn batch_invoke(
        &self,
        requests: Vec<BatchRequest>,
        options: InvokeOptions,
    ) -> Result<Vec<InvokeResult>, InvokerError> {
        self.ensure_live()?;

        let calls = requests.iter().map(|request| {
            let options = options.clone();
            async move {
                match self
                    .invoke(&request.function_id, &request.payload, options, None)
                    .await
                {
                    Ok(result) => result,
                    Err(e) => InvokeResult::failed(
                        Some(ErrorCode::Internal),
                        e.to_string(),
                        std::time::Duration::ZERO,
                    ),
                }
            }
        });

        Ok(join_all(calls).await)
    }

    /// Starts a long-running job; returns its opaque id.
    pub async fn start_job(
        &self,
        function_id: &str,
        payload: &str,
    ) -> Result<String, InvokerError> {
        self.ensure_live()?;

        let body = encode_payload(&StartJobPayload {
            function: function_id.to_owned(),
            payload: payload.to_owned(),
        })?;
        let reply = self.round_trip(MessageType::StartJobRequest, body).await?;
        let reply: StartJobReply = decode_reply(&reply)?;
        Ok(reply.job_id)
    }

    /// Asks the remote to cancel a job; `true` means it accepted.
    pub async fn cancel_job(&self, job_id: &str) -> Result<bool, InvokerError> {
        self.ensure_live()?;

        let body = encode_payload(&CancelJobPayload {
            job_id: job_id.to_owned(),
        })?;
        let reply = self.round_trip(MessageType::CancelJobRequest, body).await?;
        let reply: CancelJobReply = decode_reply(&reply)?;
        Ok(reply.canceled)
    }

    /// Fetches a job snapshot; `None` when the remote does not know the id.
    pub async fn job_status(&self, job_id: &str) -> Result<Option<Job>, InvokerError> {
        self.ensure_live()?;

        let body = encode_payload(&JobStatusPayload {
            job_id: job_id.to_owned(),
        })?;
        let reply = self.round_trip(MessageType::JobStatusRequest, body).await?;
        let reply: JobStatusReply = decode_reply(&reply)?;
        Ok(reply.job)
    }

    async fn round_trip(
        &self,
        msg_type: MessageType,
        body: bytes::Bytes,
    ) -> Result<bytes::Bytes, InvokerError> {
        let reply = self
            .inner
            .channel
            .call_with(
                msg_type as u32,
                body,
                CallOptions::default().with_timeout(self.inner.config.call_timeout()),
            )
            .await?;
        Ok(reply)
    }
}

/// Decodes a typed reply, falling back to a structured error reply when
/// the remote answered one instead.
fn decode_reply<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, InvokerError> {
    match decode_payload::<T>(bytes) {
        Ok(value) => Ok(value),
        Err(decode_error) => match CallReply::from_bytes(bytes) {
            Ok(CallReply::Error { code, message }) => Err(InvokerError::Remote { code, message }),
            _ => Err(decode_error.into()),
        },
    }
}
