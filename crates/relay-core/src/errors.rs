//! Error taxonomy shared by the bus, transport, and router.

use thiserror::Error;

use crate::kind::MessageKind;

/// Errors surfaced by the relay client.
///
/// [`Protocol`](RelayError::Protocol) and [`Handler`](RelayError::Handler)
/// are recovered locally — processing continues on the same connection.
/// [`Connection`](RelayError::Connection) and
/// [`Transport`](RelayError::Transport) leave the transport disconnected
/// until the caller connects again; there is no implicit retry.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Handshake failed or timed out.
    #[error("connection failed: {reason}")]
    Connection {
        /// Human-readable failure reason.
        reason: String,
    },

    /// Network fault after a successful connect.
    #[error("transport fault: {reason}")]
    Transport {
        /// What the socket reported.
        reason: String,
    },

    /// Malformed inbound frame; the frame is discarded and the connection
    /// stays open.
    #[error("malformed frame: {reason}")]
    Protocol {
        /// Parse failure description.
        reason: String,
    },

    /// `send` attempted while the transport was not connected. Nothing is
    /// queued for later delivery.
    #[error("not connected to workspace")]
    NotConnected,

    /// An application handler failed while processing a dispatched message.
    #[error("handler for {kind} failed: {reason}")]
    Handler {
        /// Kind whose handler failed.
        kind: MessageKind,
        /// The handler's error text.
        reason: String,
    },
}

impl RelayError {
    /// Machine-readable code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::Protocol { .. } => "PROTOCOL_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Handler { .. } => "HANDLER_ERROR",
        }
    }

    /// Whether processing continues on the current connection after this
    /// error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Handler { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
