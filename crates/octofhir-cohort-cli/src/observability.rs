//! Tracing setup for the CLI.
//!
//! Events go to stderr so stdout carries only command output. A `RUST_LOG`
//! filter, when present, wins over any configured level.

use std::io;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

fn rust_log_filter() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}

/// Installs the global subscriber. `startup_level` covers the time before the
/// config file is read.
pub fn init_tracing(startup_level: &str) {
    let filter = rust_log_filter().unwrap_or_else(|| EnvFilter::new(startup_level));
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER.set(handle);
    }
}

/// Switches to the configured `logging.level`. No-op under `RUST_LOG` or
/// before [`init_tracing`].
pub fn apply_logging_level(level: &str) -> Result<(), String> {
    if rust_log_filter().is_some() {
        return Ok(());
    }
    let Some(handle) = FILTER.get() else {
        return Ok(());
    };
    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("invalid log level {level:?}: {e}"))?;
    handle
        .reload(filter)
        .map_err(|e| format!("failed to apply log level: {e}"))
}
