//! Tracing setup
//!
//! `RUST_LOG` wins over the configured level. Output goes to stderr as text
//! or JSON, plus an optional daily rolling file.

use crate::config::{Config, LogFormat};
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name inside `log_dir`; the appender adds a date suffix
pub const LOG_FILE_NAME: &str = "autosnap.log";

/// Keeps the file writer flushing until dropped
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

pub fn filter_for(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()))
}

pub fn init(config: &Config) -> Result<LogGuard> {
    let text = (config.log_format == LogFormat::Text)
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));
    let json = (config.log_format == LogFormat::Json)
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_for(config))
        .with(text)
        .with(json)
        .with(file)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LogGuard { _file: guard })
}
