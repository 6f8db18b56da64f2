//! Configuration management for sessionkit.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Marker left in unconfigured client ids.
pub const CLIENT_ID_PLACEHOLDER: &str = "PASTE_YOUR_CLIENT_ID";

/// Default OAuth client id (can be overridden at compile time via SESSIONKIT_CLIENT_ID env var).
pub const DEFAULT_CLIENT_ID: &str = match option_env!("SESSIONKIT_CLIENT_ID") {
    Some(id) => id,
    None => "PASTE_YOUR_CLIENT_ID.apps.googleusercontent.com",
};

/// Default backend URL baked in at compile time, if any.
pub const DEFAULT_BACKEND_URL: Option<&str> = option_env!("SESSIONKIT_BACKEND_URL");

/// Backend used during local development.
pub const LOCAL_BACKEND_URL: &str = "http://localhost:10000";

/// Ports served by local static dev servers. Pages on these talk to [`LOCAL_BACKEND_URL`].
pub const DEV_SERVER_PORTS: [u16; 2] = [5500, 5501];

/// Identity provider client library.
pub const DEFAULT_PROVIDER_SCRIPT_URL: &str = "https://accounts.google.com/gsi/client";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Delay between widget attach attempts.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Widget attach attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Sign-in widget polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl WidgetSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Main sessionkit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OAuth client id registered with the identity provider.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Explicit backend base URL. Takes precedence over page-derived resolution.
    #[serde(default = "default_backend_url")]
    pub backend_url: Option<String>,
    /// URL of the page hosting the sign-in widget, when there is one.
    #[serde(default)]
    pub page_url: Option<String>,
    /// Identity provider script injected into the host page.
    #[serde(default = "default_provider_script_url")]
    pub provider_script_url: String,
    #[serde(default)]
    pub widget: WidgetSettings,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_backend_url() -> Option<String> {
    DEFAULT_BACKEND_URL.map(|s| s.to_string())
}

fn default_provider_script_url() -> String {
    DEFAULT_PROVIDER_SCRIPT_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            client_id: default_client_id(),
            backend_url: default_backend_url(),
            page_url: None,
            provider_script_url: default_provider_script_url(),
            widget: WidgetSettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from `SESSIONKIT_*` environment variables.
    pub fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);

        if let Some(level) = get("SESSIONKIT_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(client_id) = get("SESSIONKIT_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Some(backend_url) = get("SESSIONKIT_BACKEND_URL") {
            self.backend_url = Some(backend_url);
        }
        if let Some(page_url) = get("SESSIONKIT_PAGE_URL") {
            self.page_url = Some(page_url);
        }
    }

    /// Whether the client id is usable for rendering the sign-in widget.
    pub fn is_client_id_configured(&self) -> bool {
        is_client_id_configured(&self.client_id)
    }

    /// Base URL of the backend auth service.
    pub fn backend_base_url(&self) -> CoreResult<Url> {
        resolve_backend_base_url(self.backend_url.as_deref(), self.page_url.as_deref())
    }

    /// Get the provider script URL as a parsed URL.
    pub fn provider_script_url(&self) -> CoreResult<Url> {
        Url::parse(&self.provider_script_url).map_err(CoreError::from)
    }
}

/// False for empty client ids and ones still carrying [`CLIENT_ID_PLACEHOLDER`].
pub fn is_client_id_configured(client_id: &str) -> bool {
    let client_id = client_id.trim();
    !client_id.is_empty() && !client_id.contains(CLIENT_ID_PLACEHOLDER)
}

/// Pick the backend base URL.
///
/// An explicit URL wins. Otherwise pages opened from disk or served by a
/// local dev server use [`LOCAL_BACKEND_URL`], and any other page talks to
/// its own origin. Without a page the local backend is used.
pub fn resolve_backend_base_url(explicit: Option<&str>, page_url: Option<&str>) -> CoreResult<Url> {
    if let Some(explicit) = explicit.and_then(|s| non_empty(s.to_string())) {
        return Ok(Url::parse(&explicit)?);
    }

    let Some(page_url) = page_url else {
        return Ok(Url::parse(LOCAL_BACKEND_URL)?);
    };

    let page = Url::parse(page_url)?;
    let on_dev_server = page
        .port()
        .map(|port| DEV_SERVER_PORTS.contains(&port))
        .unwrap_or(false);

    if page.scheme() == "file" || on_dev_server {
        return Ok(Url::parse(LOCAL_BACKEND_URL)?);
    }

    let origin = page.origin();
    if !origin.is_tuple() {
        return Err(CoreError::Config(format!(
            "page URL has no usable origin: {page_url}"
        )));
    }
    Ok(Url::parse(&origin.ascii_serialization())?)
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
