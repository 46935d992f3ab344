//! Logging setup for the provider binary.
//!
//! Logs go to **stderr**: stdout carries the plugin handshake line and must
//! stay clean. Filtering follows `RUST_LOG`, e.g.
//!
//! ```bash
//! RUST_LOG=tacticalrmm_provider=debug ./terraform-provider-tacticalrmm
//! ```
//!
//! Secrets (the API key, keystore values) are never passed to log macros;
//! adapter spans skip state payloads for that reason.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

fn subscriber(
    default_level: &str,
) -> impl tracing::Subscriber + Send + Sync + for<'a> tracing_subscriber::registry::LookupSpan<'a>
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize logging at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LEVEL);
}

/// Initialize logging with a custom fallback level for when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if a subscriber already exists.
///
/// Tests call this freely since only the first caller in a process wins.
pub fn try_init_logging() -> bool {
    subscriber(DEFAULT_LEVEL).try_init().is_ok()
}
