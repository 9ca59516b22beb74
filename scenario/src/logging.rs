//! Development-time tracing for debugging scenario replays.
//!
//! Replays emit `debug!` events per resumption and `warn!` events for failed
//! checks. Nothing is printed unless a subscriber is installed.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::io::config::HarnessConfig;

/// Initialize a tracing subscriber for development logging.
///
/// Reads `RUST_LOG`; falls back to `config.log_filter` if unset or invalid.
/// Output: stderr, compact format. Calling it again (for example from
/// several tests in one binary) leaves the first subscriber in place.
///
/// # Example
/// ```bash
/// RUST_LOG=saga_scenario=debug cargo test
/// ```
pub fn init(config: &HarnessConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
