//! Outbound call channel.

use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashSet;
use meridian_proto::{describe_type, paired_response_type, Frame, DEFAULT_MAX_MESSAGE_SIZE};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::socket::RequestSocket;
use crate::tcp::TcpRequestSocket;

/// Connection state of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// No connection; `connect` may be called.
    Disconnected = 0,
    /// `connect` in progress.
    Connecting = 1,
    /// Ready for calls.
    Connected = 2,
    /// Torn down; terminal.
    Closed = 3,
}

impl ChannelState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closed,
            _ => Self::Disconnected,
        }
    }
}

/// Per-call knobs for [`Channel::call_with`].
#[derive(Debug, Default)]
pub struct CallOptions {
    /// Fail the call if no response arrives in time.
    pub timeout: Option<Duration>,

    /// Cooperative cancellation; releases the wait, not the remote work.
    pub cancellation: Option<CancellationToken>,

    /// Explicit request id; allocated from the channel counter when absent.
    pub request_id: Option<u32>,
}

impl CallOptions {
    /// Sets the call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// A connection to one agent, correlating outbound request frames with
/// their paired responses.
///
/// Calls are serialised behind a single lock: one request is in flight at a
/// time and responses therefore arrive in request order. Concurrent callers
/// queue. The frame format would support request-id multiplexing; the
/// serialisation is a deliberate throughput tradeoff kept from the
/// reference design.
///
/// A canceled or timed-out call abandons its request id; the late response
/// is recognised and discarded by the next call instead of shifting
/// correlation.
pub struct Channel {
    addr: String,
    state: AtomicU8,
    io: Mutex<Box<dyn RequestSocket>>,
    next_request_id: AtomicU32,
    abandoned: DashSet<u32>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("addr", &self.addr)
            .field("state", &self.state())
            .finish()
    }
}

impl Channel {
    /// Creates a channel to the given agent address over TCP, with the
    /// default message size limit.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_socket(addr, Box::new(TcpRequestSocket::new(DEFAULT_MAX_MESSAGE_SIZE)))
    }

    /// Creates a channel over a custom socket implementation.
    #[must_use]
    pub fn with_socket(addr: impl Into<String>, socket: Box<dyn RequestSocket>) -> Self {
        Self {
            addr: addr.into(),
            state: AtomicU8::new(ChannelState::Disconnected as u8),
            io: Mutex::new(socket),
            next_request_id: AtomicU32::new(1),
            abandoned: DashSet::new(),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The configured peer address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn set_state(&self, state: ChannelState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Opens the connection to the configured address.
    ///
    /// On failure the channel stays `Disconnected` and the error names the
    /// peer. Connecting a closed channel fails.
    pub async fn connect(&self) -> Result<(), TransportError> {
        match self.state() {
            ChannelState::Closed => return Err(TransportError::Closed),
            ChannelState::Connected => return Ok(()),
            ChannelState::Disconnected | ChannelState::Connecting => {}
        }

        let mut io = self.io.lock().await;
        self.set_state(ChannelState::Connecting);
        match io.connect(&self.addr).await {
            Ok(()) => {
                debug!(addr = %self.addr, "channel connected");
                self.set_state(ChannelState::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_state(ChannelState::Disconnected);
                Err(e)
            }
        }
    }

    /// Releases the connection. Idempotent; subsequent calls fail fast.
    pub async fn close(&self) -> Result<(), TransportError> {
        if self.state() == ChannelState::Closed {
            return Ok(());
        }
        self.set_state(ChannelState::Closed);

        let mut io = self.io.lock().await;
        if let Err(e) = io.close().await {
            warn!(addr = %self.addr, "socket close failed: {e}");
        }
        Ok(())
    }

    /// Sends a request frame and awaits the paired response body.
    pub async fn call(&self, msg_type: u32, body: Bytes) -> Result<Bytes, TransportError> {
        self.call_with(msg_type, body, CallOptions::default()).await
    }

    /// [`call`](Self::call) with timeout, cancellation, or an explicit
    /// request id.
    pub async fn call_with(
        &self,
        msg_type: u32,
        body: Bytes,
        options: CallOptions,
    ) -> Result<Bytes, TransportError> {
        if self.state() != ChannelState::Connected {
            return Err(match self.state() {
                ChannelState::Closed => TransportError::Closed,
                _ => TransportError::NotConnected,
            });
        }

        let expected = paired_response_type(msg_type)
            .ok_or_else(|| TransportError::NotARequest(describe_type(msg_type)))?;

        let request_id = options
            .request_id
            .unwrap_or_else(|| self.next_request_id.fetch_add(1, Ordering::Relaxed));

        let encoded = Frame::new(msg_type, request_id, body).encode();

        let mut io = self.io.lock().await;
        // State may have changed while queued behind another call.
        match self.state() {
            ChannelState::Connected => {}
            ChannelState::Closed => return Err(TransportError::Closed),
            _ => return Err(TransportError::NotConnected),
        }

        io.send(&encoded).await?;

        let frame = match self
            .await_response(&mut io, &options)
            .await
        {
            Ok(frame) => frame,
            Err(err @ (TransportError::Canceled | TransportError::Timeout(_))) => {
                // The response may still arrive; make sure the next call
                // recognises and discards it.
                self.abandoned.insert(request_id);
                return Err(err);
            }
            Err(e) => return Err(e),
        };

        if frame.request_id != request_id {
            // Reference behaviour: correlation mismatches are surfaced in
            // the log but the body is still returned.
            warn!(
                addr = %self.addr,
                expected = request_id,
                actual = frame.request_id,
                "response correlation mismatch"
            );
        }

        if frame.msg_type != expected {
            return Err(TransportError::UnexpectedResponseType {
                expected: describe_type(expected),
                actual: describe_type(frame.msg_type),
            });
        }

        Ok(frame.body)
    }

    /// Awaits the next non-abandoned frame, honouring timeout and
    /// cancellation.
    async fn await_response(
        &self,
        io: &mut Box<dyn RequestSocket>,
        options: &CallOptions,
    ) -> Result<Frame, TransportError> {
        let recv = async {
            loop {
                let bytes = io.recv().await?;
                let frame = Frame::decode(bytes)?;
                if self.abandoned.remove(&frame.request_id).is_some() {
                    debug!(
                        request_id = frame.request_id,
                        "discarding response to an abandoned call"
                    );
                    continue;
                }
                return Ok(frame);
            }
        };

        let timed = async {
            match options.timeout {
                Some(limit) => tokio::time::timeout(limit, recv)
                    .await
                    .map_err(|_| TransportError::Timeout(limit))?,
                None => recv.await,
            }
        };

        match &options.cancellation {
            Some(token) => tokio::select! {
                () = token.cancelled() => Err(TransportError::Canceled),
                result = timed => result,
            },
            None => timed.await,
        }
    }
}
