//! Reactive connection status for UI-level callers.

use serde::{Deserialize, Serialize};

/// Coarse connection phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPhase {
    /// No connection and no attempt in flight.
    #[default]
    Idle,
    /// `connect` awaiting its handshake.
    Connecting,
    /// Connected; sends and dispatch are live.
    Connected,
    /// The last attempt or connection ended in an error.
    Error,
}

/// Snapshot published on the router's status channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    /// Current phase.
    pub phase: StatusPhase,
    /// Most recent error text, kept until the next successful connect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ClientStatus {
    /// Whether sends would currently be accepted.
    pub fn is_connected(&self) -> bool {
        self.phase == StatusPhase::Connected
    }
}
