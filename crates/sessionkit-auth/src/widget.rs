//! Identity provider widget contract.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the provider hands back when the user completes sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialResponse {
    /// Opaque provider token.
    pub credential: String,
    /// How the credential was selected (e.g. "btn", "auto"), if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_by: Option<String>,
}

impl CredentialResponse {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            select_by: None,
        }
    }
}

/// Completion callback registered with the provider.
pub type CredentialCallback = Arc<dyn Fn(CredentialResponse) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonTheme {
    Outline,
    FilledBlue,
    FilledBlack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonSize {
    Large,
    Medium,
    Small,
}

/// Rendering options passed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonOptions {
    pub theme: ButtonTheme,
    pub size: ButtonSize,
}

impl Default for ButtonOptions {
    fn default() -> Self {
        Self {
            theme: ButtonTheme::Outline,
            size: ButtonSize::Large,
        }
    }
}

/// Third-party sign-in widget.
pub trait IdentityProvider: Send + Sync {
    /// Whether the provider's client library has finished loading.
    fn is_loaded(&self) -> bool;

    /// Register the client id and the completion callback.
    fn initialize(&self, client_id: &str, callback: CredentialCallback);

    /// Render the sign-in button into the container.
    fn render_button(&self, container_id: &str, options: &ButtonOptions);
}
