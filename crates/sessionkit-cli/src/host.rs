//! Terminal stand-ins for the browser collaborators.
//!
//! The CLI has no document and no widget: credentials come from the command
//! line, so the page only records what would have been injected and the
//! provider never reports itself loaded.

use crate::output::{self, OutputFormat};
use parking_lot::Mutex;
use sessionkit_auth::{
    AppData, ButtonOptions, ContainerVisibility, CredentialCallback, HostPage, IdentityProvider,
    ScriptTag, SessionNotice, SessionObserver, UserProfile,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// A [`HostPage`] without a DOM.
#[derive(Debug, Default)]
pub struct HeadlessPage {
    elements: Mutex<HashSet<String>>,
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostPage for HeadlessPage {
    fn has_element(&self, id: &str) -> bool {
        self.elements.lock().contains(id)
    }

    fn append_script(&self, script: &ScriptTag) {
        debug!(id = %script.id, src = %script.src, "Headless page recorded script");
        self.elements.lock().insert(script.id.clone());
    }

    fn container_visibility(&self, _id: &str) -> ContainerVisibility {
        ContainerVisibility::Missing
    }

    fn reload(&self) {
        info!("Reload requested, nothing to reload in a terminal");
    }
}

/// Provider whose client library never loads.
#[derive(Debug, Default)]
pub struct NoWidgetProvider;

impl IdentityProvider for NoWidgetProvider {
    fn is_loaded(&self) -> bool {
        false
    }

    fn initialize(&self, _client_id: &str, _callback: CredentialCallback) {}

    fn render_button(&self, _container_id: &str, _options: &ButtonOptions) {}
}

/// Prints session events as they happen.
#[derive(Debug)]
pub struct TerminalObserver {
    format: OutputFormat,
}

impl TerminalObserver {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl SessionObserver for TerminalObserver {
    fn on_user_info(&self, profile: &UserProfile) {
        match self.format {
            OutputFormat::Text => {
                let name = profile.name.as_deref().unwrap_or("unknown");
                match profile.email.as_deref() {
                    Some(email) => println!("Signed in as {} <{}>", name, email),
                    None => println!("Signed in as {}", name),
                }
            }
            OutputFormat::Json => output::print_json(&serde_json::json!({
                "event": "user_info",
                "profile": profile,
            })),
        }
    }

    fn on_data_loaded(&self, data: &AppData) {
        match self.format {
            OutputFormat::Text => {
                output::print_heading("Saved data");
                output::print_json(data);
            }
            OutputFormat::Json => output::print_json(&serde_json::json!({
                "event": "data_loaded",
                "data": data,
            })),
        }
    }

    fn on_notice(&self, notice: &SessionNotice) {
        match self.format {
            OutputFormat::Text if notice.is_error() => eprintln!("{}", notice),
            OutputFormat::Text => println!("{}", notice),
            OutputFormat::Json => output::print_json(&serde_json::json!({
                "event": "notice",
                "notice": notice,
                "message": notice.to_string(),
            })),
        }
    }
}
