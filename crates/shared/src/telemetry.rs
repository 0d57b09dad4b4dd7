//! Process-wide tracing setup.

use tracing_subscriber::EnvFilter;

/// Initialize the fmt subscriber with `RUST_LOG` filtering (default
/// `info`). Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
