//! # Observability
//!
//! Centralized logging layer for the sessionkit workspace.
//!
//! Library crates are **log producers** only. They use the standard
//! `tracing` macros and never install a subscriber. Binaries call
//! [`init_with_config`] once at startup and decide where logs go.
//!
//! ## JSONL file mode
//!
//! With [`LogConfig::json_file`] enabled, every event is written as one
//! JSON object per line to `~/.sessionkit/logs/sessionkit.jsonl` (or
//! [`LogConfig::log_path`]):
//!
//! - `tail -f ~/.sessionkit/logs/sessionkit.jsonl | jq` for pretty JSON
//! - `lnav ~/.sessionkit/logs/sessionkit.jsonl` for interactive exploration
//!
//! Writes are append-only and flushed per line so several processes can
//! share the file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "sessionkit-cli".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;

pub use file_sink::{default_log_path, CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "sessionkit-cli").
    /// Included in every JSONL line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.sessionkit/logs/sessionkit.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr when writing the JSONL file.
    pub also_stderr: bool,

    /// Write structured JSONL to the central log file.
    /// When false, a compact stderr subscriber is installed instead.
    pub json_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            json_file: true,
        }
    }
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Safe to call more than once: only the first call installs a global
/// subscriber. If the JSONL file cannot be opened, falls back to the
/// compact stderr subscriber and reports the failure there.
pub fn init_with_config(config: LogConfig) {
    if config.json_file {
        match file_sink::init_file_subscriber(&config) {
            Ok(()) => return,
            Err(err) => {
                init_stderr_subscriber(&config);
                tracing::warn!(error = %err, "failed to open log file, logging to stderr");
                return;
            }
        }
    }

    init_stderr_subscriber(&config);
}

fn init_stderr_subscriber(config: &LogConfig) {
    use tracing_subscriber::util::SubscriberInitExt;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.default_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .try_init();
}

pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
