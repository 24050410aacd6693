//! Tracing setup and home-directory layout for the `cdr` binary.
//!
//! Everything `cdr` keeps on disk lives under one home directory:
//! `config.toml`, the default `cdr.csv` dictionary and a `logs/` directory
//! with one file per day.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "cdr=info,cdr_governance=info,cdr_dictionary=info,cdr_lint=warn";

/// Daily log files kept before the oldest is deleted.
const KEPT_LOG_FILES: usize = 7;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "CDR_HOME";

pub struct LogConfig<'a> {
    /// Log file prefix.
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Flushes the background file writer when dropped. Hold it for the life of
/// the process.
#[must_use = "file logging stops when the guard is dropped"]
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Install a daily file layer under `logs/` plus a stderr layer.
///
/// Without `verbose`, stderr only carries warnings so `--json` output on
/// stdout stays machine-readable.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let appender = daily_appender(&ensure_logs_dir()?, config.app_name)?;
    let (file_writer, worker) = tracing_appender::non_blocking(appender);

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _worker: worker })
}

/// `<dir>/<app_name>.<date>.log`, rotated daily.
fn daily_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Resolve the home directory: `CDR_HOME`, else `~/.cdr_governance`, else
/// `./.cdr_governance`.
pub fn cdr_home() -> PathBuf {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cdr_governance")
}

pub fn logs_dir() -> PathBuf {
    cdr_home().join("logs")
}

pub fn config_path() -> PathBuf {
    cdr_home().join("config.toml")
}

pub fn default_dictionary_path() -> PathBuf {
    cdr_home().join("cdr.csv")
}

pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}
