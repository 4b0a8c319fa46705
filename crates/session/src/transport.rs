//! WebSocket transport for one remote session.
//!
//! A transport walks `NotStarted → Connecting → Connected → Closed`. The
//! handshake payload (the session's full state) is the result of
//! [`SessionTransport::start`]; afterwards the read pump answers heartbeats
//! on its own and hands state pushes to the registered listener.

use std::sync::Arc;

use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use sessvault_protocol::constants::{CLOSE_FLUSH_TIMEOUT, WS_MAX_MESSAGE_SIZE};
use sessvault_protocol::{ChangeRequest, Message, MessageName, PatchOp, RemoteLocation};

use crate::error::SessionError;
use crate::types::{
    CloseReason, ClosedListener, ConnectionState, RemoteConfig, StateChangedListener,
};

/// Outcome delivered by the read pump once the handshake settles.
pub(crate) type HandshakeResult = Result<serde_json::Value, SessionError>;

/// Depth of the outbound queue feeding the write pump.
const WRITE_QUEUE_DEPTH: usize = 64;

/// State shared between a transport and its read pump.
pub(crate) struct Shared {
    state: watch::Sender<ConnectionState>,
    on_state_changed: Mutex<Option<StateChangedListener>>,
    on_closed: Mutex<Option<ClosedListener>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::NotStarted);
        Self {
            state,
            on_state_changed: Mutex::new(None),
            on_closed: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Moves to `next` if it lies ahead of the current state.
    ///
    /// Returns the state that was left, or `None` if nothing changed.
    pub(crate) fn advance(&self, next: ConnectionState) -> Option<ConnectionState> {
        let mut previous = None;
        self.state.send_if_modified(|current| {
            if next > *current {
                previous = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });
        previous
    }

    /// Moves to `Closed` and tears down listeners.
    ///
    /// Only the caller that performs the transition runs the close
    /// listener, and only when leaving `Connected`.
    pub(crate) async fn shut_down(&self, reason: CloseReason) {
        let Some(previous) = self.advance(ConnectionState::Closed) else {
            return;
        };
        self.on_state_changed.lock().await.take();
        let listener = self.on_closed.lock().await.take();

        debug!(from = ?previous, %reason, "transport closed");
        if previous == ConnectionState::Connected {
            if let Some(cb) = listener {
                cb(reason);
            }
        }
    }

    /// Hands a `Session Changed` payload to the listener.
    ///
    /// Returns `false` if no listener is registered.
    pub(crate) async fn notify_state_changed(&self, payload: serde_json::Value) -> bool {
        let guard = self.on_state_changed.lock().await;
        match guard.as_ref() {
            Some(cb) => {
                cb(payload);
                true
            }
            None => false,
        }
    }
}

/// One WebSocket connection to one remote session.
///
/// Created per logical operation and closed when it completes. Never
/// reused across locations.
pub struct SessionTransport {
    conn_id: String,
    location: RemoteLocation,
    config: RemoteConfig,
    shared: Arc<Shared>,
    write_tx: Option<mpsc::Sender<tungstenite::Message>>,
    read_handle: Option<JoinHandle<()>>,
    write_handle: Option<JoinHandle<()>>,
    /// Stops the read pump.
    cancel: CancellationToken,
    /// Stops the write pump without draining. Only fired on drop.
    shutdown: CancellationToken,
}

impl SessionTransport {
    /// Creates a transport addressing `location`. Nothing is opened yet.
    pub fn new(location: RemoteLocation, config: RemoteConfig) -> Self {
        Self {
            conn_id: uuid::Uuid::new_v4().to_string(),
            location,
            config,
            shared: Arc::new(Shared::new()),
            write_tx: None,
            read_handle: None,
            write_handle: None,
            cancel: CancellationToken::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Opens the WebSocket and waits for the handshake.
    ///
    /// Resolves with the session's full state. Connect and handshake share
    /// one deadline, [`RemoteConfig::handshake_timeout`].
    pub async fn start(&mut self) -> Result<serde_json::Value, SessionError> {
        let deadline = self.begin()?;
        let url = self.config.session_url_for(&self.location);
        debug!(conn = %self.conn_id, session = %self.location.id, "connecting");

        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let connect = tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false);

        let ws_stream = match tokio::time::timeout_at(deadline, connect).await {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                self.shared
                    .shut_down(CloseReason::Error(e.to_string()))
                    .await;
                return Err(e.into());
            }
            Err(_) => {
                self.shared
                    .shut_down(CloseReason::Error("connect timed out".into()))
                    .await;
                return Err(SessionError::Timeout);
            }
        };

        let (write, read) = ws_stream.split();
        self.handshake(read, write, deadline).await
    }

    /// Runs the handshake over an already-open stream/sink pair.
    pub async fn start_with<R, W>(
        &mut self,
        read: R,
        write: W,
    ) -> Result<serde_json::Value, SessionError>
    where
        R: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
            + Unpin
            + Send
            + 'static,
        W: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin + Send + 'static,
    {
        let deadline = self.begin()?;
        self.handshake(read, write, deadline).await
    }

    fn begin(&self) -> Result<Instant, SessionError> {
        if self.shared.advance(ConnectionState::Connecting).is_none() {
            return Err(SessionError::AlreadyStarted);
        }
        Ok(Instant::now() + self.config.handshake_timeout())
    }

    async fn handshake<R, W>(
        &mut self,
        read: R,
        write: W,
        deadline: Instant,
    ) -> Result<serde_json::Value, SessionError>
    where
        R: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
            + Unpin
            + Send
            + 'static,
        W: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin + Send + 'static,
    {
        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(WRITE_QUEUE_DEPTH);
        let (ack_tx, ack_rx) = oneshot::channel::<HandshakeResult>();

        self.write_handle = Some(tokio::spawn(crate::pumps::write::write_pump(
            write,
            write_rx,
            self.shutdown.clone(),
        )));
        self.read_handle = Some(tokio::spawn(crate::pumps::read::read_pump(
            read,
            self.shared.clone(),
            ack_tx,
            write_tx.clone(),
            self.cancel.clone(),
        )));
        self.write_tx = Some(write_tx);

        let result = match tokio::time::timeout_at(deadline, ack_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SessionError::Closed(
                "read pump stopped before handshake".into(),
            )),
            Err(_) => {
                warn!(conn = %self.conn_id, session = %self.location.id, "handshake timed out");
                Err(SessionError::Timeout)
            }
        };

        match &result {
            Ok(_) => debug!(conn = %self.conn_id, session = %self.location.id, "connected"),
            Err(_) => self.close().await,
        }
        result
    }

    /// Sends a `Session Change` carrying one patch operation.
    ///
    /// Fire-and-forget: the message is queued for the write pump and no
    /// acknowledgment is awaited.
    pub async fn send_change(&self, patch: PatchOp) -> Result<(), SessionError> {
        if self.state() != ConnectionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let write_tx = self.write_tx.as_ref().ok_or(SessionError::NotConnected)?;

        let request = ChangeRequest {
            session_id: self.location.id.to_uppercase(),
            change: vec![patch],
        };
        let msg = Message::new(MessageName::SessionChange, Some(&request))?;
        let json = serde_json::to_string(&msg)?;

        write_tx
            .send(tungstenite::Message::Text(json.into()))
            .await
            .map_err(|_| SessionError::Closed("write pump stopped".into()))?;

        trace!(conn = %self.conn_id, session = %self.location.id, "change queued");
        Ok(())
    }

    /// Sets the listener for `Session Changed` pushes.
    ///
    /// Replaces any previous listener and applies to the next message.
    /// Ignored once the transport is closed.
    pub async fn set_state_changed_listener(&self, listener: StateChangedListener) {
        let mut slot = self.shared.on_state_changed.lock().await;
        if self.state() == ConnectionState::Closed {
            trace!(conn = %self.conn_id, "transport closed, dropping state listener");
            return;
        }
        *slot = Some(listener);
    }

    /// Sets the listener for the `Connected → Closed` transition.
    ///
    /// Ignored once the transport is closed.
    pub async fn set_closed_listener(&self, listener: ClosedListener) {
        let mut slot = self.shared.on_closed.lock().await;
        if self.state() == ConnectionState::Closed {
            trace!(conn = %self.conn_id, "transport closed, dropping close listener");
            return;
        }
        *slot = Some(listener);
    }

    /// Closes the transport. Calling it again is a no-op.
    ///
    /// Changes queued before the call are flushed ahead of the close frame.
    pub async fn close(&mut self) {
        self.shared.shut_down(CloseReason::Requested).await;
        self.cancel.cancel();

        let write_tx = self.write_tx.take();
        let write_handle = self.write_handle.take();
        if write_tx.is_none() && write_handle.is_none() {
            return;
        }

        let flush = async move {
            if let Some(tx) = write_tx {
                let _ = tx.send(tungstenite::Message::Close(None)).await;
            }
            if let Some(handle) = write_handle {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, flush).await.is_err() {
            warn!(conn = %self.conn_id, "write queue did not drain before close");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watches lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// The session this transport addresses.
    pub fn location(&self) -> &RemoteLocation {
        &self.location
    }
}

impl Drop for SessionTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.shutdown.cancel();
        if let Some(handle) = self.read_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.write_handle.take() {
            handle.abort();
        }
    }
}
