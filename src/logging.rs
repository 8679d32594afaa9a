use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::error::{CheckError, Result};

const DEFAULT_LOG_FILTER: &str = "warn,hdfs_age_check=info";

/// Appends to `logfile` (INFO by default, `RUST_LOG` overrides) and echoes
/// warnings and errors to stderr.
pub fn dispatch(logfile: &Path) -> Result<Dispatch> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logfile)
        .map_err(|e| {
            CheckError::Logging(format!("Failed to open log file {}: {}", logfile.display(), e))
        })?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        );
    Ok(Dispatch::new(subscriber))
}

pub fn init_logging(logfile: &Path) -> Result<()> {
    tracing::dispatcher::set_global_default(dispatch(logfile)?)
        .map_err(|e| CheckError::Logging(e.to_string()))
}
