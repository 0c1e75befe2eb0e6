//! # relay-bus
//!
//! The message bus and its WebSocket transport adapter.
//!
//! [`MessageBus`] holds the four optional lifecycle hooks any transport
//! reports into. [`SocketTransport`] owns one physical connection bound
//! to one bus for its whole life. Neither knows about message kinds or
//! handlers — per-kind dispatch lives in `relay-client`.

#![deny(unsafe_code)]

pub mod bus;
pub mod config;
pub mod state;
pub mod transport;

pub use bus::{BusHooks, MessageBus};
pub use config::TransportConfig;
pub use state::ConnectionState;
pub use transport::SocketTransport;
