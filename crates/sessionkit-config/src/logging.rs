//! Logging initialization for sessionkit binaries.
//!
//! Thin wrapper over the observability crate: structured JSONL goes to
//! `~/.sessionkit/logs/sessionkit.jsonl`, filtered by `RUST_LOG` or the
//! configured level.

use crate::Paths;
use observability::LogConfig;

/// Initialize logging for `service_name`.
///
/// Set `SESSIONKIT_LOG_STDERR=1` to mirror log lines on stderr.
///
/// ```ignore
/// init_logging("sessionkit-cli", "info", &paths);
/// tracing::info!("started");
/// ```
pub fn init_logging(service_name: &str, level: &str, paths: &Paths) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: stderr_requested(std::env::var("SESSIONKIT_LOG_STDERR").ok().as_deref()),
        json_file: true,
    });
}

fn stderr_requested(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
