//! CLI command implementations.

mod auth;
mod config;
mod sync;

pub use auth::{check, login, logout, status};
pub use config::{config_init, config_show};
pub use sync::{sync, SyncSource};

use crate::host::{HeadlessPage, NoWidgetProvider, TerminalObserver};
use crate::output::OutputFormat;
use anyhow::{Context as _, Result};
use sessionkit_auth::{HttpAuthBackend, SessionManager, SessionManagerBuilder};
use sessionkit_config::{Config, Paths};
use sessionkit_storage::create_credential_store;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, resolved once in `main`.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    /// Build a session manager backed by the credentials file under `paths`.
    pub fn session_manager(&self) -> Result<Arc<SessionManager>> {
        let backend = HttpAuthBackend::from_config(&self.config)
            .context("Could not resolve the backend URL")?;
        debug!(backend_url = %backend.base_url(), "Using auth backend");

        let manager = SessionManagerBuilder::from_config(&self.config)
            .backend(Arc::new(backend))
            .credential_store(create_credential_store(&self.paths))
            .page(Arc::new(HeadlessPage::new()))
            .provider(Arc::new(NoWidgetProvider))
            .observer(Arc::new(TerminalObserver::new(self.format)))
            .build()?;

        Ok(manager)
    }
}
