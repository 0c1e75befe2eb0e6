//! The WebSocket transport adapter.
//!
//! One [`SocketTransport`] owns one physical connection for its whole
//! life: constructing an adapter is the unit of a connection attempt, and
//! a disconnected adapter is never reused. The adapter translates
//! connection events and raw frames into [`MessageBus`] notifications;
//! it keeps no handler state and interprets no payloads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, trace, warn};

use relay_core::{Envelope, RelayError};

use crate::bus::MessageBus;
use crate::config::TransportConfig;
use crate::state::ConnectionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Adapter owning one WebSocket connection, bound to one bus.
pub struct SocketTransport {
    url: String,
    token: String,
    config: TransportConfig,
    bus: Arc<MessageBus>,
    state: Mutex<ConnectionState>,
    /// Set by `disconnect`. A connect still pending when it flips loses
    /// the race: its settlement fires no lifecycle hook.
    closed: AtomicBool,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    _io_task: Mutex<Option<JoinHandle<()>>>,
}

impl SocketTransport {
    /// Bind a fresh adapter to `bus`.
    ///
    /// The adapter starts `Disconnected`; nothing touches the network
    /// until [`connect`](Self::connect).
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        bus: Arc<MessageBus>,
        config: TransportConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            token: token.into(),
            config,
            bus,
            state: Mutex::new(ConnectionState::Disconnected),
            closed: AtomicBool::new(false),
            outbound: Mutex::new(None),
            _io_task: Mutex::new(None),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Open the connection.
    ///
    /// The bearer token rides the handshake as a `token` query parameter;
    /// frames after that carry no credential. The whole handshake is
    /// bounded by [`TransportConfig::handshake_timeout_ms`]. On success
    /// the bus sees `notify_connected`; on failure or timeout the state
    /// rolls back to `Disconnected`, the bus sees `notify_error`, and the
    /// call returns [`RelayError::Connection`]. A `disconnect` that lands
    /// while the handshake is pending wins the race: this call settles
    /// with an error and fires no hook at all.
    pub async fn connect(self: &Arc<Self>) -> Result<(), RelayError> {
        {
            let mut state = self.state.lock();
            if self.closed.load(Ordering::SeqCst) {
                return Err(RelayError::Connection {
                    reason: "adapter closed".into(),
                });
            }
            if *state != ConnectionState::Disconnected {
                return Err(RelayError::Connection {
                    reason: format!("adapter already used (state {:?})", *state),
                });
            }
            *state = ConnectionState::Connecting;
        }

        debug!(url = %self.url, "opening workspace socket");

        let ws_config = WebSocketConfig::default()
            .max_message_size(Some(self.config.max_frame_bytes))
            .max_frame_size(Some(self.config.max_frame_bytes));
        let handshake = tokio::time::timeout(
            Duration::from_millis(self.config.handshake_timeout_ms),
            connect_async_with_config(self.handshake_url().as_str(), Some(ws_config), false),
        )
        .await;

        let ws = match handshake {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => return Err(self.settle_failed(format!("handshake failed: {e}"))),
            Err(_elapsed) => {
                return Err(self.settle_failed(format!(
                    "handshake timed out after {}ms",
                    self.config.handshake_timeout_ms
                )));
            }
        };

        let (tx, rx) = mpsc::channel(self.config.outbound_buffer);
        {
            let mut state = self.state.lock();
            if self.closed.load(Ordering::SeqCst) {
                debug!(url = %self.url, "connect superseded by disconnect");
                return Err(RelayError::Connection {
                    reason: "connect superseded by disconnect".into(),
                });
            }
            *state = ConnectionState::Connected;
            *self.outbound.lock() = Some(tx);
        }
        let task = tokio::spawn(io_loop(ws, rx, Arc::clone(self)));
        *self._io_task.lock() = Some(task);

        debug!(url = %self.url, "workspace socket connected");
        self.bus.notify_connected();
        Ok(())
    }

    /// Close the connection.
    ///
    /// Idempotent: the first call that observes a non-disconnected state
    /// tears down the socket and fires `notify_disconnected` exactly once;
    /// every later call is a no-op. Safe to call while a `connect` is
    /// still pending.
    pub fn disconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, ConnectionState::Disconnected)
        };
        if previous == ConnectionState::Disconnected {
            return;
        }
        // Dropping the sender makes the I/O loop send a Close frame and exit.
        let _ = self.outbound.lock().take();
        debug!(url = %self.url, "workspace socket closed by caller");
        self.bus.notify_disconnected();
    }

    /// Queue an envelope for transmission.
    ///
    /// Fails with [`RelayError::NotConnected`] unless the transport is
    /// `Connected`; nothing is buffered for later delivery. `Ok` means the
    /// frame was handed to the I/O task, not that it reached the wire.
    /// Never suspends.
    pub fn send(&self, envelope: &Envelope) -> Result<(), RelayError> {
        if self.state() != ConnectionState::Connected {
            return Err(RelayError::NotConnected);
        }
        let frame = serde_json::to_string(envelope).map_err(|e| RelayError::Protocol {
            reason: format!("envelope serialization failed: {e}"),
        })?;

        let guard = self.outbound.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(RelayError::NotConnected);
        };
        match tx.try_send(frame) {
            Ok(()) => {
                trace!(kind = %envelope.kind, "outbound frame queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(RelayError::Transport {
                reason: "outbound buffer full".into(),
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(RelayError::NotConnected),
        }
    }

    // ─── Internal ────────────────────────────────────────────────────────

    fn handshake_url(&self) -> String {
        if self.token.is_empty() {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.url, separator, self.token)
    }

    /// Settle a failed connect: roll back state, report, build the error.
    fn settle_failed(&self, reason: String) -> RelayError {
        if self.closed.load(Ordering::SeqCst) {
            // a concurrent disconnect already transitioned and notified
            return RelayError::Connection { reason };
        }
        warn!(url = %self.url, reason, "workspace socket connect failed");
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Disconnected;
            }
        }
        self.bus.notify_error(&reason);
        RelayError::Connection { reason }
    }

    /// Unsolicited close or network fault reported by the I/O loop.
    fn fault(&self, reason: &str) {
        if self.closed.load(Ordering::SeqCst) {
            // caller-initiated teardown; `disconnect` already notified
            return;
        }
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, ConnectionState::Disconnected)
        };
        if previous == ConnectionState::Disconnected {
            return;
        }
        let _ = self.outbound.lock().take();
        warn!(url = %self.url, reason, "workspace socket fault");
        self.bus.notify_error(&format!("transport fault: {reason}"));
        self.bus.notify_disconnected();
    }

    /// Parse one inbound text frame and hand it to the bus.
    ///
    /// A malformed frame is reported and discarded; the connection stays
    /// open. Frames that were still in the socket when `disconnect` ran
    /// are dropped silently — nothing reaches the hooks after teardown.
    fn handle_frame(&self, raw: &str) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        match serde_json::from_str::<Envelope>(raw) {
            Ok(envelope) => {
                trace!(kind = %envelope.kind, "inbound frame");
                self.bus.notify_message(envelope);
            }
            Err(e) => self.protocol_error(&format!("malformed frame: {e}")),
        }
    }

    /// Report a frame-level protocol violation without touching the
    /// connection.
    fn protocol_error(&self, reason: &str) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        warn!(url = %self.url, reason, "discarding inbound frame");
        self.bus.notify_error(reason);
    }
}

/// Single I/O loop owning both halves of the socket.
///
/// Inbound frames are read one at a time and dispatched to completion
/// before the next read, so handler-visible order matches arrival order.
/// The loop ends when the outbound sender is dropped (caller disconnect,
/// after a best-effort close handshake) or the socket faults.
async fn io_loop(
    ws: WsStream,
    mut outbound_rx: mpsc::Receiver<String>,
    transport: Arc<SocketTransport>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    loop {
        tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(text) => {
                    if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                        transport.fault(&format!("write failed: {e}"));
                        break;
                    }
                }
                None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => transport.handle_frame(text.as_str()),
                Some(Ok(Message::Binary(_))) => {
                    transport.protocol_error("malformed frame: binary frames are not part of the protocol");
                }
                Some(Ok(Message::Close(_))) => {
                    transport.fault("closed by remote");
                    break;
                }
                // Ping/Pong keepalives are answered by the websocket layer
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    transport.fault(&format!("read failed: {e}"));
                    break;
                }
                None => {
                    transport.fault("stream ended");
                    break;
                }
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
