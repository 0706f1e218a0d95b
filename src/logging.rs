//! Log routing for pipeline runs.
//!
//! Every stage writes compact lines to stdout and appends the same events to a log file shared
//! by all stages, so consecutive runs read in order from one file. `FINRAG_LOG_FILE` picks the
//! file; `logs/finrag.log` is used otherwise. Warnings mark a skipped record and errors mark a
//! failed document or run.
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable naming the shared log file.
pub const LOG_FILE_ENV: &str = "FINRAG_LOG_FILE";

const DEFAULT_LOG_FILE: &str = "logs/finrag.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the subscriber and announce which pipeline stage is running.
///
/// `RUST_LOG` filters both outputs and defaults to `info`. A log file that cannot be opened is
/// reported on stderr and the stage continues with stdout only.
pub fn init_tracing(stage: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let path = log_file_path(std::env::var(LOG_FILE_ENV).ok().as_deref());
    match open_log_writer(&path) {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
            tracing::info!(stage, log_file = %path.display(), "Pipeline stage starting");
        }
        None => {
            registry.init();
            tracing::info!(stage, "Pipeline stage starting without a log file");
        }
    }
}

/// Log file for this run: the configured path when it is non-blank, `logs/finrag.log` otherwise.
pub(crate) fn log_file_path(configured: Option<&str>) -> PathBuf {
    configured
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from)
}

fn open_log_writer(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
