//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credential was empty before any exchange was attempted
    #[error("Credential is empty")]
    EmptyCredential,

    /// Backend answered with a non-success status
    #[error("Login failed: {reason}")]
    ExchangeRejected { reason: String },

    /// Backend refused a sync request
    #[error("Sync rejected with HTTP {status}")]
    SyncRejected { status: u16 },

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] sessionkit_storage::StorageError),

    /// Configuration error from the config crate
    #[error("Configuration error: {0}")]
    Core(#[from] sessionkit_config::CoreError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true if the backend could not be reached or its answer could
    /// not be read. These never say anything about the credential itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, AuthError::Http(_) | AuthError::Json(_))
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
