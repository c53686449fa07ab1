//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{Result, TriqError};

/// Default filter when no level is configured anywhere.
pub const DEFAULT_LEVEL: &str = "warn";

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV: &str = "TRIQ_LOG";

/// Installs a fmt subscriber writing to stderr.
///
/// `level` accepts any `EnvFilter` directive (`debug`, `triq::query=trace`).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| TriqError::Logging(format!("invalid log level: {e}")))?,
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| TriqError::Logging("logging already initialized".into()))
}
