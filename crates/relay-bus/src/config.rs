//! Transport configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`SocketTransport`](crate::transport::SocketTransport).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Handshake timeout in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Outbound frame buffer capacity (frames, not bytes).
    pub outbound_buffer: usize,
    /// Max inbound WebSocket message size in bytes.
    pub max_frame_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 10_000,
            outbound_buffer: 64,
            max_frame_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = TransportConfig::default();
        assert_eq!(config.handshake_timeout_ms, 10_000);
        assert_eq!(config.outbound_buffer, 64);
        assert_eq!(config.max_frame_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn serde_roundtrip() {
        let config = TransportConfig {
            handshake_timeout_ms: 500,
            outbound_buffer: 4,
            max_frame_bytes: 1024,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: TransportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.handshake_timeout_ms, 500);
        assert_eq!(back.outbound_buffer, 4);
        assert_eq!(back.max_frame_bytes, 1024);
    }
}
