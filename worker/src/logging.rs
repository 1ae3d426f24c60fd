//! Development-time tracing for debugging the worker.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to
//!   stderr. Not persisted, not part of worker product output.
//!
//! - **Task logs (`io/task_log`)**: Product artifacts in the log directory,
//!   one file per task. Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset: this crate's warnings only, so
/// git and shell subprocess noise never leaks into operator output.
const DEFAULT_FILTER: &str = "worker=warn";

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var, falling back to [`DEFAULT_FILTER`].
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=worker=debug cargo run -- run-once
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
