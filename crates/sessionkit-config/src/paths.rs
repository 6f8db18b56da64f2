//! On-disk layout under `~/.sessionkit`.
//!
//! ```text
//! ~/.sessionkit/
//!   config.json
//!   credentials.json
//!   logs/sessionkit.jsonl
//! ```

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

const STATE_DIR_NAME: &str = ".sessionkit";
const CONFIG_FILE_NAME: &str = "config.json";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";
const LOGS_DIR_NAME: &str = "logs";
const LOG_FILE_NAME: &str = "sessionkit.jsonl";

/// Resolves every file sessionkit reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Rooted at `~/.sessionkit`. Fails when no home directory is known.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self::with_base_dir(home.join(STATE_DIR_NAME)))
    }

    /// Rooted at an arbitrary directory (tests, `--base-dir`).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// JSON file holding the persisted sign-in credential.
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join(CREDENTIALS_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join(LOGS_DIR_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Create the base and log directories if missing.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        create_dir(&self.base_dir)?;
        create_dir(&self.logs_dir())
    }
}

fn create_dir(dir: &Path) -> CoreResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        CoreError::Path(format!("Could not create {}: {}", dir.display(), e))
    })
}
