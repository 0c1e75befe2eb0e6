//! Connection lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`SocketTransport`](crate::transport::SocketTransport).
///
/// Legal transitions: `Disconnected → Connecting` (connect), `Connecting →
/// Connected` (handshake ok), `Connecting → Disconnected` (handshake
/// failure or caller disconnect), `Connected → Disconnected` (caller
/// disconnect or transport fault). There is no automatic `Disconnected →
/// Connecting` edge — reconnecting is the caller's decision, made by
/// constructing a new adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection; both the starting and the terminal state.
    #[default]
    Disconnected,
    /// Handshake in flight.
    Connecting,
    /// Handshake complete; frames may flow.
    Connected,
}
