//! Host page abstraction.
//!
//! The session manager never touches a document directly. Whatever embeds it
//! (a browser binding, a webview bridge, the CLI's headless page) implements
//! [`HostPage`].

use sessionkit_config::DEFAULT_PROVIDER_SCRIPT_URL;

/// Element id of the injected provider script.
pub const PROVIDER_SCRIPT_ID: &str = "google-client-script";

/// Visibility of a widget container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerVisibility {
    /// No element with that id.
    Missing,
    /// Present but not laid out (zero-size or inside a hidden parent).
    Hidden,
    Visible,
}

/// Script element to inject into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub id: String,
    pub src: String,
    pub is_async: bool,
    pub defer: bool,
}

impl ScriptTag {
    /// The identity provider's client library at `src`.
    pub fn provider(src: impl Into<String>) -> Self {
        Self {
            id: PROVIDER_SCRIPT_ID.to_string(),
            src: src.into(),
            is_async: true,
            defer: true,
        }
    }
}

impl Default for ScriptTag {
    fn default() -> Self {
        Self::provider(DEFAULT_PROVIDER_SCRIPT_URL)
    }
}

/// The document hosting the sign-in widget.
pub trait HostPage: Send + Sync {
    /// Whether an element with `id` exists.
    fn has_element(&self, id: &str) -> bool;

    /// Append a script element to the document.
    fn append_script(&self, script: &ScriptTag);

    fn container_visibility(&self, id: &str) -> ContainerVisibility;

    /// Reload the page so no stale UI or in-memory state survives.
    fn reload(&self);
}
