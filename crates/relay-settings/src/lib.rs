//! # relay-settings
//!
//! Configuration loading for the relay client.
//!
//! Settings resolve in three layers: compiled defaults, a deep-merged
//! `~/.relay/settings.json`, and `RELAY_*` environment overrides
//! (highest priority).

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{ConnectionSettings, LoggingSettings, RelaySettings, TransportSettings};
