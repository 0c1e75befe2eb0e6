//! # relay-core
//!
//! Shared vocabulary for the relay workspace client.
//!
//! This crate provides the types the bus, transport, and router crates
//! all depend on:
//!
//! - [`MessageKind`]: the extensible enumeration of message kinds
//! - [`Envelope`]: the wire unit exchanged over the socket
//! - [`RelayError`]: the error taxonomy shared by every layer
//! - [`logging`]: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod envelope;
pub mod errors;
pub mod kind;
pub mod logging;

pub use envelope::Envelope;
pub use errors::RelayError;
pub use kind::MessageKind;
