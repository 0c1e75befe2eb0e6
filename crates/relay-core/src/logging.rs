//! Tracing subscriber bootstrap.
//!
//! The relay crates emit structured `tracing` events at well-defined
//! points — connect attempt, connect success/failure, frame dispatch,
//! handler failure, unhandled kind — instead of ad hoc console output.
//! Applications that already install their own subscriber can skip this
//! module; the crates only ever emit events.

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
///
/// # Arguments
///
/// * `level` - Minimum log level when `RUST_LOG` is unset (e.g. `"info"`).
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}
