//! Configuration, paths and logging setup shared by the sessionkit crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    is_client_id_configured, resolve_backend_base_url, Config, WidgetSettings,
    CLIENT_ID_PLACEHOLDER, DEFAULT_BACKEND_URL, DEFAULT_CLIENT_ID, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROVIDER_SCRIPT_URL,
    DEV_SERVER_PORTS, LOCAL_BACKEND_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
