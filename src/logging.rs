//! Logging initialization.
//!
//! Diagnostics go to stderr so stdout stays clean for program output
//! (generated manifests in particular). The filter comes from `RELGEN_LOG`,
//! falling back to `info`.

use tracing_subscriber::EnvFilter;

const ENV_FILTER_VAR: &str = "RELGEN_LOG";

/// Installs the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env(ENV_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
