//! Per-kind handler table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use relay_core::{Envelope, MessageKind};

/// Error returned by an application message handler.
///
/// Carries only the failure text; the router attaches the message kind
/// when it reports the failure on its error channel.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    /// What went wrong, in the handler's own words.
    pub message: String,
}

impl HandlerError {
    /// Create a handler error from any displayable value.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Application-supplied handler for one message kind.
///
/// Handlers are synchronous: the router runs each message to completion
/// before the next frame is read, and dispatch never suspends.
pub trait MessageHandler: Send + Sync {
    /// Process one dispatched envelope.
    fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        self(envelope)
    }
}

/// Immutable mapping from message kind to handler.
///
/// The router swaps whole tables atomically; an installed table is never
/// mutated in place. Registering a kind twice keeps the later handler, so
/// at most one handler is active per kind.
#[derive(Default)]
pub struct HandlerTable {
    entries: HashMap<MessageKind, Arc<dyn MessageHandler>>,
}

impl HandlerTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the handler for `kind`.
    #[must_use]
    pub fn on(mut self, kind: MessageKind, handler: impl MessageHandler + 'static) -> Self {
        let _ = self.entries.insert(kind, Arc::new(handler));
        self
    }

    /// Handler registered for `kind`, if any.
    pub fn get(&self, kind: &MessageKind) -> Option<&Arc<dyn MessageHandler>> {
        self.entries.get(kind)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered kinds, sorted by wire string.
    pub fn kinds(&self) -> Vec<MessageKind> {
        let mut kinds: Vec<MessageKind> = self.entries.keys().cloned().collect();
        kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        kinds
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
