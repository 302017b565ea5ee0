//! Structured logging initialization, shared by the daemon and the CLI.
//!
//! Deliberately thin: no metrics/exporter layer, but ambient logging still
//! goes through `tracing` the way the rest of this codebase does rather
//! than falling back to `println!`.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global `tracing` subscriber from `RUST_LOG` (default
/// `info`). Safe to call more than once; subsequent calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

/// Same as [`init_logging`] but emits newline-delimited JSON, for hosts
/// that ship logs to a collector rather than a terminal.
pub fn init_json_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().json().with_env_filter(filter).with_target(true).try_init();
}
