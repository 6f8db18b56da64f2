//! Data sync command.

use super::Context;
use crate::output::{self, Reported};
use anyhow::{Context as _, Result};
use sessionkit_auth::SyncStatus;
use std::path::Path;

/// Where the payload to sync comes from.
pub enum SyncSource<'a> {
    File(&'a Path),
    Inline(&'a str),
}

impl SyncSource<'_> {
    fn read(&self) -> Result<serde_json::Value> {
        match self {
            SyncSource::File(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Could not read {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("{} is not valid JSON", path.display()))
            }
            SyncSource::Inline(text) => {
                serde_json::from_str(text).context("--json is not valid JSON")
            }
        }
    }
}

/// Restore the session, then push the payload to the backend.
pub async fn sync(ctx: &Context, source: SyncSource<'_>) -> Result<()> {
    let data = source.read()?;

    let manager = ctx.session_manager()?;
    manager.initialize().await;

    match manager.sync_data(&data).await {
        SyncStatus::Synced => {
            output::print_success("Data synced to cloud", &ctx.format);
            Ok(())
        }
        SyncStatus::Skipped => {
            output::print_error("Not logged in, nothing synced", &ctx.format);
            Err(Reported.into())
        }
        SyncStatus::Failed => {
            output::print_error("Sync failed, see logs for details", &ctx.format);
            Err(Reported.into())
        }
    }
}
