//! Structured logging via `tracing`, written to a file because the terminal
//! UI owns stdout and stderr.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// Environment variable holding a filter directive; wins over config.
pub const LOG_ENV: &str = "DTREE_LOG";

/// Resolve the log file path: CLI, then config, then the platform state dir.
pub fn resolve_log_file(cli_file: Option<&Path>, config: &AppConfig) -> Option<PathBuf> {
    if let Some(p) = cli_file {
        if !p.as_os_str().is_empty() {
            return Some(p.to_path_buf());
        }
    }
    if let Some(p) = &config.logging.file {
        if !p.as_os_str().is_empty() {
            return Some(p.clone());
        }
    }
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("dtree").join("dtree.log"))
}

fn build_filter(config: &AppConfig) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.is_empty() => EnvFilter::new(directive),
        _ => EnvFilter::new(config.log_level()),
    }
}

/// Install the global subscriber. A no-op when logging is disabled or no
/// log location can be determined.
pub fn init_logging(config: &AppConfig, cli_file: Option<&Path>) -> Result<()> {
    if !config.logging_enabled() {
        return Ok(());
    }
    let Some(log_file) = resolve_log_file(cli_file, config) else {
        return Ok(());
    };

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| AppError::Terminal(format!("failed to install logger: {e}")))?;

    tracing::info!(file = %log_file.display(), "logging initialised");
    Ok(())
}
