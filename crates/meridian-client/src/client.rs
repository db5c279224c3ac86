//! The serving client: registry ownership, inbound dispatch, outbound
//! invoke, agent registration and heartbeating.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use meridian_proto::{
    decode_payload, describe_type, encode_payload, CallReply, ErrorCode, HeartbeatAck,
    HeartbeatPayload, InvokeEnvelope, InvokeOptions, MessageType, RegisterAck, RegisterPayload,
};
use meridian_transport::{
    BoxError, CallOptions, Channel, InboundRequest, Listener, RequestCallback, TcpReplySocket,
    TcpRequestSocket,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::context::FunctionContext;
use crate::descriptor::FunctionDescriptor;
use crate::error::ClientError;
use crate::handler::{AsyncFnHandler, FunctionHandler, HandlerError, SyncFnHandler};
use crate::registry::FunctionRegistry;

/// The combined inbound-serving and outbound-invoking client.
///
/// Owns the function registry, a [`Channel`] to the agent, and (while
/// serving) a [`Listener`] for inbound calls. Cheap to clone; all clones
/// share one state.
///
/// Disposal is terminal and idempotent: every subsequent operation fails
/// fast with [`ClientError::Disposed`].
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    registry: FunctionRegistry,
    channel: Channel,
    disposed: AtomicBool,
    heartbeat: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
    listener: Mutex<Option<Arc<Listener>>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service_id", &self.inner.config.service_id)
            .field("agent", &self.inner.config.agent_address)
            .field("functions", &self.inner.registry.len())
            .finish()
    }
}

impl Client {
    /// Creates a client from configuration. No I/O happens until
    /// [`connect`](Self::connect) or [`serve`](Self::serve).
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let channel = Channel::with_socket(
            config.agent_address.clone(),
            Box::new(TcpRequestSocket::new(config.max_message_size)),
        );
        Self {
            inner: Arc::new(ClientInner {
                config,
                registry: FunctionRegistry::new(),
                channel,
                disposed: AtomicBool::new(false),
                heartbeat: Mutex::new(None),
                listener: Mutex::new(None),
            }),
        }
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    fn ensure_live(&self) -> Result<(), ClientError> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(ClientError::Disposed);
        }
        Ok(())
    }

    /// Registers a handler under the descriptor's full name.
    ///
    /// Overwrites any previous registration for that name; the overwrite is
    /// logged, not an error.
    pub fn register(
        &self,
        descriptor: FunctionDescriptor,
        handler: Arc<dyn FunctionHandler>,
    ) -> Result<(), ClientError> {
        self.ensure_live()?;
        self.inner.registry.register(descriptor, handler)
    }

    /// Registers an async closure as a handler.
    pub fn register_async_fn<F, Fut>(
        &self,
        descriptor: FunctionDescriptor,
        handler: F,
    ) -> Result<(), ClientError>
    where
        F: Fn(FunctionContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, HandlerError>> + Send + 'static,
    {
        self.register(descriptor, Arc::new(AsyncFnHandler(handler)))
    }

    /// Registers a sync closure as a handler. Panics from the closure are
    /// captured and surface as failed calls.
    pub fn register_sync_fn<F>(
        &self,
        descriptor: FunctionDescriptor,
        handler: F,
    ) -> Result<(), ClientError>
    where
        F: Fn(&FunctionContext, &str) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.register(descriptor, Arc::new(SyncFnHandler(handler)))
    }

    /// Removes a registration; returns whether anything was removed.
    pub fn unregister(&self, full_name: &str) -> Result<bool, ClientError> {
        self.ensure_live()?;
        Ok(self.inner.registry.unregister(full_name))
    }

    /// The registered descriptor for a full name.
    #[must_use]
    pub fn descriptor(&self, full_name: &str) -> Option<FunctionDescriptor> {
        self.inner.registry.descriptor(full_name)
    }

    /// Connects to the agent, announces this client and its functions, and
    /// starts heartbeating.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.ensure_live()?;
        self.inner.channel.connect().await?;

        let registration =
            RegisterPayload::new(
                self.inner.config.service_id.clone(),
                self.inner.config.game_id.clone(),
                self.inner.config.environment.clone(),
            )
            .with_functions(self.inner.registry.function_names());
        let body = encode_payload(&registration)?;

        let reply = self
            .inner
            .channel
            .call_with(
                MessageType::ClientRegisterRequest as u32,
                body,
                CallOptions::default().with_timeout(self.inner.config.call_timeout()),
            )
            .await?;
        let ack: RegisterAck = decode_payload(&reply)?;
        if !ack.accepted {
            return Err(ClientError::RegistrationRejected(
                ack.message.unwrap_or_else(|| "no reason given".to_owned()),
            ));
        }

        info!(
            service_id = %self.inner.config.service_id,
            agent = %self.inner.config.agent_address,
            "registered with agent"
        );
        self.start_heartbeat().await;
        Ok(())
    }

    /// Stops heartbeating and closes the channel to the agent.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.ensure_live()?;
        self.stop_heartbeat().await;
        self.inner.channel.close().await?;
        Ok(())
    }

    /// Serves registered functions on the configured bind address until the
    /// token fires.
    pub async fn serve(&self, cancel: CancellationToken) -> Result<(), ClientError> {
        self.ensure_live()?;

        let socket = TcpReplySocket::new(self.inner.config.max_message_size)
            .with_queue_depth(self.inner.config.max_in_flight);
        let dispatcher = Arc::new(Dispatcher {
            inner: self.inner.clone(),
        });
        let listener = Arc::new(Listener::new(
            self.inner.config.bind_address.clone(),
            Box::new(socket),
            dispatcher,
        ));

        listener.listen().await?;
        *self.inner.listener.lock().await = Some(listener.clone());

        cancel.cancelled().await;

        listener.stop().await?;
        *self.inner.listener.lock().await = None;
        Ok(())
    }

    /// The bound serve address, once [`serve`](Self::serve) is listening.
    pub async fn serving_addr(&self) -> Option<std::net::SocketAddr> {
        let listener = self.inner.listener.lock().await.clone();
        listener.and_then(|listener| listener.local_addr())
    }

    /// Invokes a remote function through the agent and returns its response
    /// payload.
    pub async fn invoke(
        &self,
        function_id: &str,
        payload: &str,
        options: InvokeOptions,
    ) -> Result<String, ClientError> {
        self.ensure_live()?;

        let mut envelope = InvokeEnvelope::new(function_id, payload).with_options(
            &options,
            &self.inner.config.game_id,
            &self.inner.config.environment,
        );
        envelope.caller_service_id = Some(self.inner.config.service_id.clone());
        let body = encode_payload(&envelope)?;

        let call_options = CallOptions {
            timeout: Some(options.timeout),
            cancellation: None,
            request_id: options.request_id,
        };
        let reply = self
            .inner
            .channel
            .call_with(MessageType::InvokeRequest as u32, body, call_options)
            .await?;

        match CallReply::from_bytes(&reply)? {
            CallReply::Ok { data } => Ok(data),
            CallReply::Error { code, message } => Err(ClientError::Remote { code, message }),
        }
    }

    /// Tears the client down: stops heartbeating and serving, closes the
    /// channel. Idempotent; afterwards every operation fails fast.
    pub async fn dispose(&self) -> Result<(), ClientError> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.stop_heartbeat().await;
        if let Some(listener) = self.inner.listener.lock().await.take() {
            if let Err(e) = listener.stop().await {
                warn!("listener stop during dispose failed: {e}");
            }
        }
        if let Err(e) = self.inner.channel.close().await {
            warn!("channel close during dispose failed: {e}");
        }
        debug!(service_id = %self.inner.config.service_id, "client disposed");
        Ok(())
    }

    async fn start_heartbeat(&self) {
        let mut slot = self.inner.heartbeat.lock().await;
        if slot.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(heartbeat_loop(self.inner.clone(), cancel.clone()));
        *slot = Some((cancel, handle));
    }

    async fn stop_heartbeat(&self) {
        if let Some((cancel, handle)) = self.inner.heartbeat.lock().await.take() {
            cancel.cancel();
            let _ = handle.await;
        }
    }
}

/// Sends heartbeats at the configured interval until canceled. Failures
/// are logged, never fatal; transport recovery is a layer above.
async fn heartbeat_loop(inner: Arc<ClientInner>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.config.heartbeat_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick is immediate

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let payload = HeartbeatPayload::now(inner.config.service_id.clone());
        let body = match encode_payload(&payload) {
            Ok(body) => body,
            Err(e) => {
                warn!("heartbeat encoding failed: {e}");
                continue;
            }
        };

        let result = inner
            .channel
            .call_with(
                MessageType::ClientHeartbeatRequest as u32,
                body,
                CallOptions::default().with_timeout(inner.config.call_timeout()),
            )
            .await;
        match result {
            Ok(reply) => match decode_payload::<HeartbeatAck>(&reply) {
                Ok(_) => debug!("heartbeat acknowledged"),
                Err(e) => warn!("heartbeat ack malformed: {e}"),
            },
            Err(e) => warn!("heartbeat failed: {e}"),
        }
    }
}

/// Inbound dispatch: answers invokes from the registry and acknowledges
/// register/heartbeat requests from peers.
struct Dispatcher {
    inner: Arc<ClientInner>,
}

#[async_trait]
impl RequestCallback for Dispatcher {
    async fn on_request(&self, request: InboundRequest) -> Result<Bytes, BoxError> {
        let msg_type = request.msg_type;
        if msg_type == MessageType::InvokeRequest as u32 {
            let reply = self.dispatch_invoke(&request.body).await;
            return Ok(reply.to_bytes()?);
        }
        if msg_type == MessageType::ClientRegisterRequest as u32 {
            return Ok(self.acknowledge_registration(&request.body)?);
        }
        if msg_type == MessageType::ClientHeartbeatRequest as u32 {
            return Ok(encode_payload(&HeartbeatAck::default())?);
        }

        let reply = CallReply::error(
            ErrorCode::InvalidPayload,
            format!("unsupported request type {}", describe_type(msg_type)),
        );
        Ok(reply.to_bytes()?)
    }
}

impl Dispatcher {
    /// Invoke flow: decode the envelope, build the per-call context, run
    /// the handler. Every failure folds into a structured error reply.
    async fn dispatch_invoke(&self, body: &[u8]) -> CallReply {
        let envelope: InvokeEnvelope = match decode_payload(body) {
            Ok(envelope) => envelope,
            Err(e) => return CallReply::error(ErrorCode::InvalidPayload, e.to_string()),
        };

        let Some((descriptor, handler)) = self.inner.registry.get(&envelope.function) else {
            return CallReply::error(
                ErrorCode::FunctionNotFound,
                format!("function '{}' is not registered", envelope.function),
            );
        };
        if !descriptor.enabled {
            return CallReply::error(
                ErrorCode::FunctionNotFound,
                format!("function '{}' is disabled", envelope.function),
            );
        }

        let ctx = FunctionContext::new(
            envelope.function.clone(),
            self.inner.config.game_id.clone(),
            self.inner.config.environment.clone(),
            envelope.user_id.clone(),
            envelope.idempotency_key.clone(),
            envelope.caller_service_id.clone(),
        );

        debug!(
            function = %envelope.function,
            call_id = %ctx.call_id(),
            "dispatching call"
        );

        match handler.handle(&ctx, &envelope.payload).await {
            Ok(data) => CallReply::ok(data),
            Err(e) => {
                warn!(
                    function = %envelope.function,
                    call_id = %ctx.call_id(),
                    "handler failed: {e}"
                );
                CallReply::error(ErrorCode::FunctionFailed, e.to_string())
            }
        }
    }

    fn acknowledge_registration(&self, body: &[u8]) -> Result<Bytes, BoxError> {
        let ack = match decode_payload::<RegisterPayload>(body) {
            Ok(registration) => {
                info!(
                    peer = %registration.service_id,
                    functions = registration.functions.len(),
                    "peer registered"
                );
                RegisterAck {
                    accepted: true,
                    message: None,
                }
            }
            Err(e) => RegisterAck {
                accepted: false,
                message: Some(e.to_string()),
            },
        };
        Ok(encode_payload(&ack)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_validates_before_inserting() {
        let client = Client::new(ClientConfig::default());
        let err = client.register_sync_fn(FunctionDescriptor::new("", "cat"), |_, _| {
            Ok(String::new())
        });
        assert!(matches!(err, Err(ClientError::InvalidDescriptor(_))));
        assert!(client.descriptor("cat.").is_none());
    }

    #[tokio::test]
    async fn unregister_reports_presence() {
        let client = Client::new(ClientConfig::default());
        client
            .register_sync_fn(FunctionDescriptor::new("f", "cat"), |_, _| Ok(String::new()))
            .unwrap();
        assert!(client.unregister("cat.f").unwrap());
        assert!(!client.unregister("cat.f").unwrap());
    }

    #[tokio::test]
    async fn disposal_is_idempotent_and_fails_operations_fast() {
        let client = Client::new(ClientConfig::default());
        client.dispose().await.unwrap();
        client.dispose().await.unwrap();

        assert!(matches!(
            client.register_sync_fn(FunctionDescriptor::new("f", "cat"), |_, _| Ok(String::new())),
            Err(ClientError::Disposed)
        ));
        assert!(matches!(client.unregister("cat.f"), Err(ClientError::Disposed)));
        assert!(matches!(
            client.invoke("cat.f", "{}", InvokeOptions::default()).await,
            Err(ClientError::Disposed)
        ));
        assert!(matches!(client.connect().await, Err(ClientError::Disposed)));
        assert!(matches!(
            client.serve(CancellationToken::new()).await,
            Err(ClientError::Disposed)
        ));
    }

    #[tokio::test]
    async fn invoke_requires_a_connection() {
        let client = Client::new(ClientConfig::default());
        let err = client
            .invoke("cat.f", "{}", InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(meridian_transport::TransportError::NotConnected)
        ));
    }
}
