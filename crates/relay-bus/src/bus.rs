//! The transport-agnostic lifecycle hook registry.

use std::sync::Arc;

use parking_lot::Mutex;

use relay_core::Envelope;

/// Hook invoked with each inbound envelope.
pub type MessageHook = Arc<dyn Fn(Envelope) + Send + Sync>;
/// Hook invoked with a human-readable error reason.
pub type ErrorHook = Arc<dyn Fn(&str) + Send + Sync>;
/// Hook invoked on a connect or disconnect edge.
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;

/// The four optional hooks, injected at bus construction.
#[derive(Default)]
pub struct BusHooks {
    on_message: Option<MessageHook>,
    on_error: Option<ErrorHook>,
    on_connected: Option<LifecycleHook>,
    on_disconnected: Option<LifecycleHook>,
}

impl BusHooks {
    /// No hooks registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message hook.
    #[must_use]
    pub fn on_message(mut self, hook: impl Fn(Envelope) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(hook));
        self
    }

    /// Set the error hook.
    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Set the connected hook.
    #[must_use]
    pub fn on_connected(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connected = Some(Arc::new(hook));
        self
    }

    /// Set the disconnected hook.
    #[must_use]
    pub fn on_disconnected(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnected = Some(Arc::new(hook));
        self
    }
}

/// Transport-agnostic holder of the four lifecycle hooks.
///
/// The bus owns no connection and buffers nothing; a transport adapter
/// reports into it, and whoever constructed the bus decides what the hooks
/// do. Notifying a slot with no hook registered is a silent no-op, and no
/// method panics or returns an error.
///
/// Each notify clones the hook out of the lock and invokes it outside, so
/// a hook may safely call back into the bus (including `clear`).
pub struct MessageBus {
    hooks: Mutex<BusHooks>,
}

impl MessageBus {
    /// Create a bus with the given hooks.
    pub fn new(hooks: BusHooks) -> Self {
        Self {
            hooks: Mutex::new(hooks),
        }
    }

    /// Deliver an inbound envelope to the message hook.
    pub fn notify_message(&self, envelope: Envelope) {
        let hook = self.hooks.lock().on_message.clone();
        if let Some(hook) = hook {
            hook(envelope);
        }
    }

    /// Report an error to the error hook.
    pub fn notify_error(&self, reason: &str) {
        let hook = self.hooks.lock().on_error.clone();
        if let Some(hook) = hook {
            hook(reason);
        }
    }

    /// Report a completed connect.
    pub fn notify_connected(&self) {
        let hook = self.hooks.lock().on_connected.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Report a completed disconnect.
    pub fn notify_disconnected(&self) {
        let hook = self.hooks.lock().on_disconnected.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Remove all four hooks, leaving the bus inert.
    ///
    /// Idempotent. The bus itself stays usable — notifies just become
    /// no-ops until it is dropped.
    pub fn clear(&self) {
        *self.hooks.lock() = BusHooks::default();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
