//! # relay-client
//!
//! The dispatch router: binds the bus's single message hook to a
//! per-kind handler table with failure isolation, and exposes the
//! session surface (connect / disconnect / send / status) that UI
//! layers consume.

#![deny(unsafe_code)]

pub mod handlers;
pub mod router;
pub mod status;

pub use handlers::{HandlerError, HandlerTable, MessageHandler};
pub use router::{MessageRouter, RouterCallbacks};
pub use status::{ClientStatus, StatusPhase};
