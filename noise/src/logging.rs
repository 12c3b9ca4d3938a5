//! Console tracing for a run.
//!
//! Every stage reports what it did (or why it degraded) through `tracing`
//! events on stderr. The one-line run summary is product output and goes to
//! stdout from [`crate::report`], unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset, since scheduled runs are
/// usually inspected only through their job log.
///
/// # Example
/// ```bash
/// RUST_LOG=noise=debug noise
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
