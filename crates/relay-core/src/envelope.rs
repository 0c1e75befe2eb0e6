//! The wire envelope exchanged over the workspace socket.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kind::MessageKind;

/// Unit of data exchanged over the transport.
///
/// Wire form is one JSON object per text frame:
///
/// ```json
/// { "kind": "PONG", "data": {"ok": true}, "timestamp": 1754400000000 }
/// ```
///
/// Envelopes are immutable once constructed; neither the transport nor the
/// router interprets or rewrites `data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind discriminator.
    pub kind: MessageKind,
    /// Opaque payload, owned by the application layers on both ends.
    pub data: Map<String, Value>,
    /// Epoch milliseconds at construction time.
    pub timestamp: i64,
}

impl Envelope {
    /// Create an envelope stamped with the current UTC time.
    pub fn new(kind: MessageKind, data: Map<String, Value>) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Create an envelope with an explicit timestamp (inbound frames keep
    /// the sender's stamp).
    pub fn with_timestamp(kind: MessageKind, data: Map<String, Value>, timestamp: i64) -> Self {
        Self {
            kind,
            data,
            timestamp,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
