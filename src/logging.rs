//! Device Registry Logging System
//!
//! Structured logging through `tracing`, with console or daily-rotated file
//! output in either human-readable or JSON form.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub const LOG_FILE_ENV: &str = "DEVICE_REGISTRY_LOG_FILE";
pub const LOG_RETENTION_ENV: &str = "DEVICE_REGISTRY_LOG_RETENTION_DAYS";
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to output
    pub level: Level,
    /// Enable colored output
    pub color: bool,
    /// Show timestamps
    pub show_timestamps: bool,
    /// Show target/module name
    pub show_target: bool,
    /// Enable JSON format for machine parsing
    pub json_format: bool,
    /// Enable span events for tracing
    pub enable_spans: bool,
    /// Write to a daily-rotated file instead of stdout
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            color: true,
            show_timestamps: false,
            show_target: false,
            json_format: false,
            enable_spans: false,
            file_output: None,
        }
    }
}

impl LoggingConfig {
    /// Create config for different application modes
    pub fn for_mode(mode: ApplicationMode) -> Self {
        match mode {
            ApplicationMode::Server => Self {
                level: Level::INFO,
                color: false,
                show_timestamps: true,
                show_target: true,
                json_format: false,
                enable_spans: true,
                file_output: None,
            },
            ApplicationMode::Cli => Self {
                level: Level::WARN,
                ..Self::default()
            },
        }
    }

    /// Create config from CLI arguments
    pub fn from_args(quiet: bool, verbose: bool, json: bool) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            Level::INFO
        };

        Self {
            level,
            color: !quiet && !json && io::stdout().is_terminal(),
            show_timestamps: verbose || json,
            show_target: verbose,
            json_format: json,
            enable_spans: verbose,
            file_output: None,
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        format!(
            "device_registry={level},tower_http={level}",
            level = self.level
        )
    }
}

/// Application modes with different logging requirements
#[derive(Debug, Clone, Copy)]
pub enum ApplicationMode {
    /// Long-running HTTP server
    Server,
    /// One-shot command whose stdout is its result
    Cli,
}

/// Initialize the logging system
pub fn init_logging(config: LoggingConfig) -> io::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let registry = Registry::default().with(env_filter);

    if let Some(log_file) = config.file_output {
        let file_appender = tracing_appender::rolling::daily(
            log_file.parent().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "Invalid log file path")
            })?,
            log_file.file_name().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "Invalid log file name")
            })?,
        );

        if config.json_format {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(config.enable_spans)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender);
            json_layer.with_subscriber(registry).init();
        } else {
            let fmt_layer = fmt::layer()
                .with_target(config.show_target)
                .with_level(true)
                .with_ansi(false)
                .with_writer(file_appender);

            if config.show_timestamps {
                fmt_layer
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_subscriber(registry)
                    .init();
            } else {
                fmt_layer.with_subscriber(registry).init();
            }
        }
    } else if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(config.enable_spans)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(io::stdout);
        json_layer.with_subscriber(registry).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(config.show_target)
            .with_level(true)
            .with_ansi(config.color)
            .with_writer(io::stdout);

        if config.show_timestamps {
            fmt_layer
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_subscriber(registry)
                .init();
        } else {
            fmt_layer.with_subscriber(registry).init();
        }
    }

    Ok(())
}

/// Log file requested through the environment, if any.
pub fn log_file_from_env() -> Option<PathBuf> {
    std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn retention_days_from_env() -> u32 {
    std::env::var(LOG_RETENTION_ENV)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

/// Remove rotated log files older than `retention_days`.
///
/// Only files whose name contains `.log.` (the suffix written by daily
/// rotation, e.g. `registry.log.2026-10-01`) are considered.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u32) -> io::Result<usize> {
    use std::fs;
    use std::time::{Duration, SystemTime};

    if !log_dir.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let retention = Duration::from_secs(retention_days as u64 * 24 * 60 * 60);
    let mut cleaned = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_rotated = path
            .file_name()
            .map(|n| n.to_string_lossy().contains(".log."))
            .unwrap_or(false);
        if !is_rotated || !path.is_file() {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };

        if age > retention {
            match fs::remove_file(&path) {
                Ok(_) => {
                    cleaned += 1;
                    tracing::info!(
                        path = %path.display(),
                        age_days = age.as_secs() / 86400,
                        "Removed old log file"
                    );
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove old log file");
                },
            }
        }
    }

    Ok(cleaned)
}

/// Record the outcome of a device operation with its request context.
#[macro_export]
macro_rules! log_device_operation {
    ($operation:expr, $origin:expr) => {
        tracing::info!(
            operation = $operation,
            client = %$origin,
            "Device operation"
        );
    };
    ($operation:expr, $origin:expr, $($field:tt)+) => {
        tracing::info!(
            operation = $operation,
            client = %$origin,
            $($field)+,
            "Device operation"
        );
    };
}

/// Utility macro for structured error logging
#[macro_export]
macro_rules! log_error {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Operation failed"
        );
    };
    ($error:expr, $context:expr, $($field:tt)+) => {
        tracing::error!(
            error = %$error,
            context = $context,
            $($field)+,
            "Operation failed"
        );
    };
}
