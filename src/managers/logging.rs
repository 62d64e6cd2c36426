//! Log output for the CLI
//!
//! With a `log_directory` configured, events go to stderr at INFO and to a
//! daily `lutra.log.YYYY-MM-DD` file at the configured level. Without one,
//! only stderr is used. `RUST_LOG` overrides both levels.

use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_NAME: &str = "lutra.log";

/// File logging settings taken from [`Config`]
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    /// Level of the file layer; stderr stays at INFO
    pub log_level: Level,
    /// Daily files kept, newest first
    pub max_files: u32,
}

impl LoggingConfig {
    /// `None` when the config has no log directory
    pub fn from_config(config: &Config) -> Option<Self> {
        let log_directory = config.log_directory.clone()?;

        Some(Self {
            log_directory,
            log_level: parse_level(&config.log_level),
            max_files: config.log_max_files,
        })
    }
}

/// Unknown names fall back to INFO
fn parse_level(name: &str) -> Level {
    match name.to_ascii_lowercase().as_str() {
        "warning" => Level::WARN,
        other => other.parse().unwrap_or(Level::INFO),
    }
}

/// Install the subscriber for `config`.
///
/// Keep the returned guard alive until exit; dropping it flushes the file.
pub fn setup(config: &Config) -> Result<Option<LogGuard>> {
    match LoggingConfig::from_config(config) {
        Some(logging) => init_logging(&logging).map(Some),
        None => init_console_logging().map(|()| None),
    }
}

/// Stderr plus a daily rolling file
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let log_dir = &config.log_directory;
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(config.log_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level_filter(Level::INFO));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    prune_log_files(log_dir, config.max_files)?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Stderr only, at INFO
pub fn init_console_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(level_filter(Level::INFO))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to install tracing subscriber")
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Delete all but the `keep` newest daily files.
///
/// The date suffix sorts lexically, so names order the files by age.
fn prune_log_files(log_dir: &Path, keep: u32) -> Result<()> {
    let prefix = format!("{}.", LOG_FILE_NAME);

    let mut dated: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();
    dated.sort_unstable_by(|a, b| b.cmp(a));

    for path in dated.into_iter().skip(keep as usize) {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed old log file: {:?}", path),
            Err(e) => tracing::warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    Ok(())
}

/// Flushes buffered file output when dropped
pub struct LogGuard {
    _file_guard: WorkerGuard,
}
