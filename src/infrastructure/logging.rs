use crate::infrastructure::error::InfraError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "timeblock.log";
const DEFAULT_FILTER: &str = "info";

/// Sends JSON lines to `<logs_dir>/timeblock.log`. `RUST_LOG` overrides the
/// default `info` filter. Returns `false` when a subscriber was already set.
pub fn init_logging(logs_dir: &Path) -> Result<bool, InfraError> {
    std::fs::create_dir_all(logs_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(LOG_FILE_NAME))?;

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_current_span(false)
        .try_init()
        .is_ok();
    Ok(installed)
}
