//! Message kind discriminators.
//!
//! [`MessageKind`] enumerates the message kinds the workspace backend
//! exchanges with clients. Wire form is an UPPER_SNAKE string. Kinds this
//! client does not recognize deserialize to [`MessageKind::Other`] — an
//! unrecognized kind is still a valid envelope; it just dispatches as
//! unhandled.

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// Discriminator identifying what an envelope carries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Liveness probe sent by the client.
    Ping,
    /// Liveness reply from the backend.
    Pong,
    /// Workspace/session status snapshot.
    Status,
    /// User-facing notification.
    Notification,
    /// Workspace content changed.
    WorkspaceUpdate,
    /// Terminal input from the client.
    TerminalInput,
    /// Terminal output from the backend.
    TerminalOutput,
    /// A kind this client does not recognize, preserved verbatim.
    Other(String),
}

/// All known kind variants, for exhaustive testing.
pub const ALL_KNOWN_KINDS: &[MessageKind] = &[
    MessageKind::Ping,
    MessageKind::Pong,
    MessageKind::Status,
    MessageKind::Notification,
    MessageKind::WorkspaceUpdate,
    MessageKind::TerminalInput,
    MessageKind::TerminalOutput,
];

impl MessageKind {
    /// Wire string for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Status => "STATUS",
            Self::Notification => "NOTIFICATION",
            Self::WorkspaceUpdate => "WORKSPACE_UPDATE",
            Self::TerminalInput => "TERMINAL_INPUT",
            Self::TerminalOutput => "TERMINAL_OUTPUT",
            Self::Other(kind) => kind,
        }
    }

    /// Parse a wire string; unknown strings become [`MessageKind::Other`].
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "PING" => Self::Ping,
            "PONG" => Self::Pong,
            "STATUS" => Self::Status,
            "NOTIFICATION" => Self::Notification,
            "WORKSPACE_UPDATE" => Self::WorkspaceUpdate,
            "TERMINAL_INPUT" => Self::TerminalInput,
            "TERMINAL_OUTPUT" => Self::TerminalOutput,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Whether this client knows the kind.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MessageKind {
    fn from(kind: &str) -> Self {
        Self::from_wire(kind)
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kind = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&kind))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
