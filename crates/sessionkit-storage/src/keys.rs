//! Storage key constants.

/// Storage keys used by sessionkit
pub struct StorageKeys;

impl StorageKeys {
    /// Identity provider credential last accepted by (or pending with) the backend
    pub const GOOGLE_CREDENTIAL: &'static str = "google_credential";
}
