//! High-level API for the persisted sign-in credential.

use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};
use parking_lot::Mutex;

/// Owns the single durable credential slot.
///
/// Writes and compare-and-clear are serialized so a stale rejection can
/// never erase a credential written after it.
pub struct CredentialStore {
    storage: Box<dyn SecureStorage>,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a new credential store with the given storage backend
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Retrieve the persisted credential. Blank values read as absent.
    pub fn get_credential(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::GOOGLE_CREDENTIAL)?
            .filter(|value| !value.trim().is_empty()))
    }

    /// Persist a credential, replacing any previous one.
    pub fn set_credential(&self, credential: &str) -> StorageResult<()> {
        if credential.trim().is_empty() {
            return Err(StorageError::InvalidValue(
                "credential must not be empty".to_string(),
            ));
        }
        let _guard = self.write_lock.lock();
        self.storage.set(StorageKeys::GOOGLE_CREDENTIAL, credential)
    }

    /// Check whether a credential is persisted
    pub fn has_credential(&self) -> StorageResult<bool> {
        Ok(self.get_credential()?.is_some())
    }

    /// Erase the persisted credential unconditionally.
    pub fn clear_credential(&self) -> StorageResult<bool> {
        let _guard = self.write_lock.lock();
        self.storage.delete(StorageKeys::GOOGLE_CREDENTIAL)
    }

    /// Erase the persisted credential only if it still equals `expected`.
    pub fn clear_credential_if(&self, expected: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock();
        match self.storage.get(StorageKeys::GOOGLE_CREDENTIAL)? {
            Some(current) if current == expected => {
                self.storage.delete(StorageKeys::GOOGLE_CREDENTIAL)
            }
            Some(_) => {
                tracing::debug!("persisted credential changed, keeping the newer value");
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
