//! Durable storage for sessionkit.
//!
//! Backends implement [`SecureStorage`]:
//! - [`FileStorage`]: one JSON file, atomically replaced on write
//! - [`MemoryStorage`]: in-process map
//!
//! [`CredentialStore`] layers the persisted sign-in credential on top.

mod credentials;
mod file;
mod keys;
mod memory;
mod traits;

pub use credentials::CredentialStore;
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::SecureStorage;

use sessionkit_config::Paths;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Rejected value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default file-backed storage under `paths`.
pub fn create_storage(paths: &Paths) -> Box<dyn SecureStorage> {
    Box::new(FileStorage::new(paths.credentials_file()))
}

/// Create a CredentialStore with the default file storage.
pub fn create_credential_store(paths: &Paths) -> CredentialStore {
    CredentialStore::new(create_storage(paths))
}
