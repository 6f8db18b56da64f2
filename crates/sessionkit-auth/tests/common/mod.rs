#![allow(dead_code)]

use parking_lot::Mutex;
use sessionkit_auth::{
    AppData, ButtonOptions, ContainerVisibility, CredentialCallback, HostPage, IdentityProvider,
    ScriptTag, SessionNotice, SessionObserver, UserProfile,
};
use std::collections::HashSet;

pub const CLIENT_ID: &str = "1234.apps.googleusercontent.com";

/// Page with a single always-visible container.
#[derive(Default)]
pub struct StaticPage {
    elements: Mutex<HashSet<String>>,
    reloads: Mutex<usize>,
}

impl StaticPage {
    pub const CONTAINER: &'static str = "login-btn";

    pub fn reloads(&self) -> usize {
        *self.reloads.lock()
    }
}

impl HostPage for StaticPage {
    fn has_element(&self, id: &str) -> bool {
        self.elements.lock().contains(id)
    }

    fn append_script(&self, script: &ScriptTag) {
        self.elements.lock().insert(script.id.clone());
    }

    fn container_visibility(&self, id: &str) -> ContainerVisibility {
        if id == Self::CONTAINER {
            ContainerVisibility::Visible
        } else {
            ContainerVisibility::Missing
        }
    }

    fn reload(&self) {
        *self.reloads.lock() += 1;
    }
}

/// Provider that is always loaded and keeps the registered callback.
#[derive(Default)]
pub struct ReadyProvider {
    callback: Mutex<Option<CredentialCallback>>,
}

impl ReadyProvider {
    pub fn sign_in(&self, credential: &str) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(sessionkit_auth::CredentialResponse::new(credential));
        }
    }
}

impl IdentityProvider for ReadyProvider {
    fn is_loaded(&self) -> bool {
        true
    }

    fn initialize(&self, _client_id: &str, callback: CredentialCallback) {
        *self.callback.lock() = Some(callback);
    }

    fn render_button(&self, _container_id: &str, _options: &ButtonOptions) {}
}

#[derive(Default)]
pub struct Recorder {
    pub profiles: Mutex<Vec<UserProfile>>,
    pub data: Mutex<Vec<AppData>>,
    pub notices: Mutex<Vec<SessionNotice>>,
}

impl SessionObserver for Recorder {
    fn on_user_info(&self, profile: &UserProfile) {
        self.profiles.lock().push(profile.clone());
    }

    fn on_data_loaded(&self, data: &AppData) {
        self.data.lock().push(data.clone());
    }

    fn on_notice(&self, notice: &SessionNotice) {
        self.notices.lock().push(notice.clone());
    }
}
