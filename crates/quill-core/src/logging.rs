//! Tracing subscriber setup.
//!
//! Logs go to a daily rolling file under ${QUILL_HOME}/logs by default so they
//! never interleave with command output. `QUILL_LOG` overrides the configured filter.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogSettings, paths};

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "QUILL_LOG";

const LOG_FILE_PREFIX: &str = "quill.log";

/// Resolved logging options.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `QUILL_LOG` is unset
    pub level: String,
    /// Directory for the rolling log file; `None` logs to stderr
    pub dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn from_settings(settings: &LogSettings) -> Self {
        Self {
            level: settings.level.clone(),
            dir: settings.file.then(paths::logs_dir),
        }
    }

    /// Stderr-only logging at the given level.
    pub fn stderr(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            dir: None,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Installs the global subscriber.
///
/// Returns the appender guard when logging to a file; keep it alive for the
/// lifetime of the process or buffered lines are lost.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.env_filter();

    match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(None)
        }
    }
}

/// Returns a masked version of a secret for logs (first 8 chars + ...).
pub fn mask_secret(secret: &str) -> String {
    if secret.len() <= 12 {
        return "***".to_string();
    }
    match secret.get(..8) {
        Some(prefix) => format!("{prefix}..."),
        None => "***".to_string(),
    }
}
