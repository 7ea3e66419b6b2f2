//! Optional tracing setup for embedders and test binaries.
//!
//! The library only emits through `tracing` macros and never installs a
//! subscriber on its own; hosts with their own telemetry stack should skip
//! this entirely.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Install a compact stderr subscriber filtered by the `DECSYNC_LOG`
/// environment variable (default `warn`).
///
/// Returns whether this call installed the global subscriber; `false` means
/// one was already set, which is fine.
pub fn init() -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var("DECSYNC_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .is_ok()
}
