//! Typed settings tree.

use serde::{Deserialize, Serialize};

/// Root settings for the relay client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Connection target and credential.
    pub connection: ConnectionSettings,
    /// Transport tuning knobs.
    pub transport: TransportSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Where and how to connect.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// WebSocket endpoint (`ws://` or `wss://`).
    pub url: String,
    /// Bearer token sent with the handshake; `None` means unauthenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Handshake timeout in milliseconds.
    pub handshake_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".into(),
            token: None,
            handshake_timeout_ms: 10_000,
        }
    }
}

/// Transport tuning knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportSettings {
    /// Outbound frame buffer capacity (frames, not bytes).
    pub outbound_buffer: usize,
    /// Max inbound WebSocket message size in bytes.
    pub max_frame_bytes: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 64,
            max_frame_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum log level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
