//! Kind-to-handler dispatch bound to one bus and one adapter at a time.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use relay_bus::{BusHooks, MessageBus, SocketTransport, TransportConfig};
use relay_core::{Envelope, MessageKind, RelayError};
use relay_settings::RelaySettings;

use crate::handlers::HandlerTable;
use crate::status::{ClientStatus, StatusPhase};

/// Optional lifecycle callbacks for the embedding layer.
///
/// All three are independent of the status channel; a caller can use
/// either or both.
#[derive(Default)]
pub struct RouterCallbacks {
    on_connected: Option<Arc<dyn Fn() + Send + Sync>>,
    on_disconnected: Option<Arc<dyn Fn() + Send + Sync>>,
    on_error: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl RouterCallbacks {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked after each successful connect.
    #[must_use]
    pub fn on_connected(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connected = Some(Arc::new(callback));
        self
    }

    /// Invoked after each disconnect, caller-initiated or not.
    #[must_use]
    pub fn on_disconnected(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnected = Some(Arc::new(callback));
        self
    }

    /// Invoked with every error-channel signal.
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

/// The session-level entry point.
///
/// Maps inbound message kinds to application handlers with failure
/// isolation, and exposes connect / disconnect / send plus a reactive
/// status channel. One router owns one bus for its whole life and at most
/// one transport adapter at a time; the handler table can be swapped at
/// any point without touching either.
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    url: String,
    token: String,
    transport_config: TransportConfig,
    bus: Arc<MessageBus>,
    handlers: RwLock<Arc<HandlerTable>>,
    adapter: Mutex<Option<Arc<SocketTransport>>>,
    status_tx: watch::Sender<ClientStatus>,
    callbacks: RouterCallbacks,
}

impl MessageRouter {
    /// Build a router for one workspace endpoint.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        callbacks: RouterCallbacks,
    ) -> Self {
        Self::with_config(url, token, TransportConfig::default(), callbacks)
    }

    /// Build a router from loaded settings.
    pub fn from_settings(settings: &RelaySettings, callbacks: RouterCallbacks) -> Self {
        Self::with_config(
            settings.connection.url.clone(),
            settings.connection.token.clone().unwrap_or_default(),
            TransportConfig {
                handshake_timeout_ms: settings.connection.handshake_timeout_ms,
                outbound_buffer: settings.transport.outbound_buffer,
                max_frame_bytes: settings.transport.max_frame_bytes,
            },
            callbacks,
        )
    }

    /// Build a router with explicit transport tuning.
    pub fn with_config(
        url: impl Into<String>,
        token: impl Into<String>,
        transport_config: TransportConfig,
        callbacks: RouterCallbacks,
    ) -> Self {
        let (status_tx, _status_rx) = watch::channel(ClientStatus::default());
        let inner = Arc::new_cyclic(|weak: &Weak<RouterInner>| {
            let hooks = BusHooks::new()
                .on_message({
                    let weak = weak.clone();
                    move |envelope| {
                        if let Some(inner) = weak.upgrade() {
                            inner.dispatch(&envelope);
                        }
                    }
                })
                .on_error({
                    let weak = weak.clone();
                    move |reason| {
                        if let Some(inner) = weak.upgrade() {
                            inner.report_error(reason);
                        }
                    }
                })
                .on_connected({
                    let weak = weak.clone();
                    move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.connected();
                        }
                    }
                })
                .on_disconnected({
                    let weak = weak.clone();
                    move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.disconnected();
                        }
                    }
                });
            RouterInner {
                url: url.into(),
                token: token.into(),
                transport_config,
                bus: Arc::new(MessageBus::new(hooks)),
                handlers: RwLock::new(Arc::new(HandlerTable::new())),
                adapter: Mutex::new(None),
                status_tx,
                callbacks,
            }
        });
        Self { inner }
    }

    /// Replace the active handler table.
    ///
    /// Takes effect for the next inbound message; a dispatch already in
    /// flight keeps the snapshot it started with.
    pub fn register_handlers(&self, table: HandlerTable) {
        *self.inner.handlers.write() = Arc::new(table);
    }

    /// Connect to the workspace endpoint.
    ///
    /// Constructs a fresh transport adapter bound to the router's bus;
    /// any previous adapter is disconnected and discarded first. On
    /// failure the adapter is dropped, the status moves to `error`, and
    /// the underlying error is returned.
    pub async fn connect(&self) -> Result<(), RelayError> {
        let previous = self.inner.adapter.lock().take();
        if let Some(previous) = previous {
            previous.disconnect();
        }

        self.inner.publish(StatusPhase::Connecting, None);
        debug!(url = %self.inner.url, "router connecting");

        let transport = SocketTransport::new(
            self.inner.url.clone(),
            self.inner.token.clone(),
            Arc::clone(&self.inner.bus),
            self.inner.transport_config.clone(),
        );
        *self.inner.adapter.lock() = Some(Arc::clone(&transport));

        match transport.connect().await {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = self.inner.adapter.lock().take();
                self.inner
                    .publish(StatusPhase::Error, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Disconnect and discard the current adapter. No-op without one.
    pub fn disconnect(&self) {
        let transport = self.inner.adapter.lock().take();
        if let Some(transport) = transport {
            transport.disconnect();
        }
    }

    /// Send `payload` as an envelope of `kind`.
    ///
    /// Requires a connected transport; otherwise fails with
    /// [`RelayError::NotConnected`] and nothing is transmitted or queued.
    pub fn send(&self, kind: MessageKind, payload: Map<String, Value>) -> Result<(), RelayError> {
        let transport = self.inner.adapter.lock().as_ref().map(Arc::clone);
        let result = match transport {
            Some(transport) => transport.send(&Envelope::new(kind, payload)),
            None => Err(RelayError::NotConnected),
        };
        if let Err(err) = &result {
            self.inner.report_error(&err.to_string());
        }
        result
    }

    /// Full teardown: disconnect, then clear the bus hooks.
    ///
    /// After `shutdown` the bus is inert; a new router is needed for a new
    /// session. Without it, hooks registered on the bus would outlive the
    /// session they were wired for.
    pub fn shutdown(&self) {
        self.disconnect();
        self.inner.bus.clear();
    }

    /// Current status snapshot.
    pub fn status(&self) -> ClientStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<ClientStatus> {
        self.inner.status_tx.subscribe()
    }
}

impl RouterInner {
    fn publish(&self, phase: StatusPhase, last_error: Option<String>) {
        self.status_tx.send_modify(|status| {
            status.phase = phase;
            status.last_error = last_error;
        });
    }

    /// The error channel: records `last_error` and fires the callback.
    /// The phase is left alone — errors only move it through `connect`
    /// failure or the disconnected hook.
    fn report_error(&self, reason: &str) {
        self.status_tx
            .send_modify(|status| status.last_error = Some(reason.to_owned()));
        if let Some(callback) = &self.callbacks.on_error {
            callback(reason);
        }
    }

    fn connected(&self) {
        debug!("workspace session connected");
        self.publish(StatusPhase::Connected, None);
        if let Some(callback) = &self.callbacks.on_connected {
            callback();
        }
    }

    fn disconnected(&self) {
        debug!("workspace session disconnected");
        self.status_tx.send_modify(|status| {
            // an error recorded on this connection stays visible until the
            // next connect
            status.phase = if status.last_error.is_some() {
                StatusPhase::Error
            } else {
                StatusPhase::Idle
            };
        });
        if let Some(callback) = &self.callbacks.on_disconnected {
            callback();
        }
    }

    /// The bus message hook: per-kind dispatch with failure isolation.
    fn dispatch(&self, envelope: &Envelope) {
        let table = self.inner_table();
        let Some(handler) = table.get(&envelope.kind) else {
            debug!(kind = %envelope.kind, "no handler registered for message kind");
            return;
        };
        if let Err(failure) = handler.handle(envelope) {
            warn!(kind = %envelope.kind, "message handler failed: {failure}");
            let err = RelayError::Handler {
                kind: envelope.kind.clone(),
                reason: failure.to_string(),
            };
            self.report_error(&err.to_string());
        }
    }

    /// Snapshot of the handler table at dispatch time.
    fn inner_table(&self) -> Arc<HandlerTable> {
        Arc::clone(&self.handlers.read())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
