//! Inbound request listener and dispatch loop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use meridian_proto::{
    describe_type, is_request, paired_response_type, CallReply, ErrorCode, Frame,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::TransportError;
use crate::socket::ReplySocket;
use crate::BoxError;

/// Default bound on how long `stop` waits for the receive loop to exit.
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of a [`Listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    /// Not yet bound.
    Idle = 0,
    /// Receive loop running.
    Listening = 1,
    /// Stopped; terminal.
    Stopped = 2,
}

impl ListenerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Listening,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// One decoded inbound request, as handed to the [`RequestCallback`].
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Message type of the request frame.
    pub msg_type: u32,
    /// Correlation id to echo in the response frame.
    pub request_id: u32,
    /// Opaque request body.
    pub body: Bytes,
}

/// Produces the reply body for each inbound request.
///
/// A returned error still answers the peer: the loop converts it into a
/// structured error reply. Panics are contained the same way.
#[async_trait]
pub trait RequestCallback: Send + Sync {
    /// Handles one request, returning the reply body.
    async fn on_request(&self, request: InboundRequest) -> Result<Bytes, BoxError>;
}

/// Binds a passive endpoint and serves inbound request frames.
///
/// The receive loop runs on a background task for the lifetime of
/// `Listening`: decode, dispatch to the callback, answer on the same
/// socket, in order, one frame at a time. Malformed frames are logged and
/// skipped; callback failures are answered with a best-effort error reply
/// so the peer is never left waiting.
pub struct Listener {
    bind_addr: String,
    state: AtomicU8,
    socket: Arc<Mutex<Box<dyn ReplySocket>>>,
    callback: Arc<dyn RequestCallback>,
    cancel: CancellationToken,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    bound_addr: std::sync::Mutex<Option<std::net::SocketAddr>>,
    stop_timeout: Duration,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("bind_addr", &self.bind_addr)
            .field("state", &self.state())
            .finish()
    }
}

impl Listener {
    /// Creates a listener over the given reply socket.
    #[must_use]
    pub fn new(
        bind_addr: impl Into<String>,
        socket: Box<dyn ReplySocket>,
        callback: Arc<dyn RequestCallback>,
    ) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            state: AtomicU8::new(ListenerState::Idle as u8),
            socket: Arc::new(Mutex::new(socket)),
            callback,
            cancel: CancellationToken::new(),
            loop_handle: Mutex::new(None),
            bound_addr: std::sync::Mutex::new(None),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Sets the bound on how long [`stop`](Self::stop) waits for the loop.
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ListenerState {
        ListenerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The bound local address, once listening.
    ///
    /// Captured at bind time; the receive loop owns the socket afterwards.
    #[must_use]
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        *self.bound_addr.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Binds the endpoint and starts the receive loop.
    ///
    /// A no-op while already `Listening`; fails after `stop`.
    pub async fn listen(&self) -> Result<(), TransportError> {
        match self.state() {
            ListenerState::Listening => return Ok(()),
            ListenerState::Stopped => return Err(TransportError::Closed),
            ListenerState::Idle => {}
        }

        {
            let mut socket = self.socket.lock().await;
            socket.bind(&self.bind_addr).await?;
            let bound = socket.local_addr();
            *self
                .bound_addr
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = bound;
        }
        self.state
            .store(ListenerState::Listening as u8, Ordering::Release);

        let socket = self.socket.clone();
        let callback = self.callback.clone();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            receive_loop(socket, callback, cancel).await;
        });
        *self.loop_handle.lock().await = Some(handle);

        debug!(addr = %self.bind_addr, "listener started");
        Ok(())
    }

    /// Signals the loop to exit, waits (bounded) for it, and releases the
    /// socket. Idempotent; `Stopped` is terminal.
    pub async fn stop(&self) -> Result<(), TransportError> {
        if self.state() == ListenerState::Stopped {
            return Ok(());
        }
        self.state
            .store(ListenerState::Stopped as u8, Ordering::Release);
        self.cancel.cancel();

        if let Some(handle) = self.loop_handle.lock().await.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(self.stop_timeout, handle).await.is_err() {
                warn!(addr = %self.bind_addr, "receive loop did not stop in time; aborting");
                abort.abort();
            }
        }

        self.socket.lock().await.close().await?;
        debug!(addr = %self.bind_addr, "listener stopped");
        Ok(())
    }
}

/// The receive loop: one frame at a time, always answered.
async fn receive_loop(
    socket: Arc<Mutex<Box<dyn ReplySocket>>>,
    callback: Arc<dyn RequestCallback>,
    cancel: CancellationToken,
) {
    loop {
        let bytes = {
            let mut socket = socket.lock().await;
            tokio::select! {
                () = cancel.cancelled() => break,
                received = socket.recv() => match received {
                    Ok(bytes) => bytes,
                    Err(TransportError::Closed) => break,
                    Err(e) => {
                        warn!("receive failed: {e}");
                        break;
                    }
                },
            }
        };

        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                // Malformed frames are fatal to this decode only.
                warn!("skipping malformed frame: {e}");
                continue;
            }
        };

        if !is_request(frame.msg_type) {
            warn!(
                msg_type = %describe_type(frame.msg_type),
                request_id = frame.request_id,
                "skipping non-request frame"
            );
            continue;
        }

        let Some(response_type) = paired_response_type(frame.msg_type) else {
            warn!(
                msg_type = %describe_type(frame.msg_type),
                request_id = frame.request_id,
                "skipping request with no catalog pairing"
            );
            continue;
        };

        let request_id = frame.request_id;
        let reply_body = dispatch(&callback, frame).await;

        let response = Frame::new(response_type, request_id, reply_body).encode();
        let mut socket = socket.lock().await;
        if let Err(e) = socket.send(&response).await {
            warn!(request_id, "failed to send response: {e}");
        }
    }
}

/// Runs the callback on its own task so a panic is contained, and folds
/// every failure into a parseable error reply.
async fn dispatch(callback: &Arc<dyn RequestCallback>, frame: Frame) -> Bytes {
    let request = InboundRequest {
        msg_type: frame.msg_type,
        request_id: frame.request_id,
        body: frame.body,
    };

    let callback = callback.clone();
    let outcome = tokio::spawn(async move { callback.on_request(request).await }).await;

    let reply = match outcome {
        Ok(Ok(body)) => return body,
        Ok(Err(e)) => {
            warn!("request callback failed: {e}");
            CallReply::error(ErrorCode::Internal, e.to_string())
        }
        Err(join_error) => {
            error!("request callback panicked: {join_error}");
            CallReply::error(ErrorCode::Internal, "request handler panicked")
        }
    };

    reply
        .to_bytes()
        .unwrap_or_else(|_| Bytes::from_static(br#"{"status":"error","code":"internal","message":"reply encoding failed"}"#))
}
