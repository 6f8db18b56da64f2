//! In-process fakes shared by the unit tests.

use crate::auth_fsm::AuthStateChangedPayload;
use crate::backend::{AppData, AuthBackend, LoginRequest, LoginResponse, SyncRequest, UserProfile};
use crate::events::{SessionNotice, SessionObserver};
use crate::page::{ContainerVisibility, HostPage, ScriptTag};
use crate::widget::{ButtonOptions, CredentialCallback, CredentialResponse, IdentityProvider};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

pub const CLIENT_ID: &str = "1234.apps.googleusercontent.com";

pub enum LoginBehavior {
    Accept(LoginResponse),
    Reject(Option<String>),
    /// Fails the way an unreadable or unreachable backend does.
    Unreachable,
}

type Hook = Box<dyn Fn() + Send + Sync>;

pub struct MockBackend {
    behavior: Mutex<LoginBehavior>,
    logins: Mutex<Vec<LoginRequest>>,
    syncs: Mutex<Vec<SyncRequest>>,
    sync_ok: Mutex<bool>,
    before_reply: Mutex<Option<Hook>>,
    stall_next: Mutex<bool>,
}

impl MockBackend {
    pub fn new(behavior: LoginBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            logins: Mutex::new(Vec::new()),
            syncs: Mutex::new(Vec::new()),
            sync_ok: Mutex::new(true),
            before_reply: Mutex::new(None),
            stall_next: Mutex::new(false),
        }
    }

    pub fn accepting(user_info: serde_json::Value, data: serde_json::Value) -> Self {
        let response = serde_json::from_value(serde_json::json!({
            "status": "success",
            "user_info": user_info,
            "data": data,
        }))
        .unwrap();
        Self::new(LoginBehavior::Accept(response))
    }

    pub fn rejecting(reason: Option<&str>) -> Self {
        Self::new(LoginBehavior::Reject(reason.map(str::to_string)))
    }

    pub fn set_behavior(&self, behavior: LoginBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Run `hook` after a login is received and before it is answered.
    pub fn before_reply(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.before_reply.lock() = Some(Box::new(hook));
    }

    /// The next login never answers.
    pub fn stall_next_login(&self) {
        *self.stall_next.lock() = true;
    }

    pub fn fail_sync(&self) {
        *self.sync_ok.lock() = false;
    }

    pub fn login_calls(&self) -> usize {
        self.logins.lock().len()
    }

    pub fn last_login(&self) -> Option<LoginRequest> {
        self.logins.lock().last().cloned()
    }

    pub fn sync_calls(&self) -> Vec<SyncRequest> {
        self.syncs.lock().clone()
    }
}

#[async_trait]
impl AuthBackend for MockBackend {
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginResponse> {
        self.logins.lock().push(request.clone());

        let stall = std::mem::take(&mut *self.stall_next.lock());
        if stall {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }

        if let Some(hook) = self.before_reply.lock().as_ref() {
            hook();
        }

        match &*self.behavior.lock() {
            LoginBehavior::Accept(response) => Ok(response.clone()),
            LoginBehavior::Reject(reason) => Ok(LoginResponse {
                status: "error".to_string(),
                error: reason.clone(),
                ..LoginResponse::default()
            }),
            LoginBehavior::Unreachable => Err(AuthError::Json(
                serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
            )),
        }
    }

    async fn sync(&self, request: &SyncRequest) -> AuthResult<()> {
        self.syncs.lock().push(request.clone());
        if *self.sync_ok.lock() {
            Ok(())
        } else {
            Err(AuthError::SyncRejected { status: 500 })
        }
    }
}

#[derive(Default)]
pub struct FakePage {
    elements: Mutex<HashSet<String>>,
    containers: Mutex<HashMap<String, ContainerVisibility>>,
    scripts: Mutex<Vec<ScriptTag>>,
    visibility_checks: Mutex<usize>,
    reloads: Mutex<usize>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&self, id: &str) {
        self.elements.lock().insert(id.to_string());
    }

    pub fn set_container(&self, id: &str, visibility: ContainerVisibility) {
        self.containers.lock().insert(id.to_string(), visibility);
    }

    pub fn scripts(&self) -> Vec<ScriptTag> {
        self.scripts.lock().clone()
    }

    pub fn visibility_checks(&self) -> usize {
        *self.visibility_checks.lock()
    }

    pub fn reloads(&self) -> usize {
        *self.reloads.lock()
    }
}

impl HostPage for FakePage {
    fn has_element(&self, id: &str) -> bool {
        self.elements.lock().contains(id)
    }

    fn append_script(&self, script: &ScriptTag) {
        self.add_element(&script.id);
        self.scripts.lock().push(script.clone());
    }

    fn container_visibility(&self, id: &str) -> ContainerVisibility {
        *self.visibility_checks.lock() += 1;
        self.containers
            .lock()
            .get(id)
            .copied()
            .unwrap_or(ContainerVisibility::Missing)
    }

    fn reload(&self) {
        *self.reloads.lock() += 1;
    }
}

/// Provider whose library reports loaded after a number of checks.
#[derive(Default)]
pub struct FakeProvider {
    checks_until_loaded: Mutex<u32>,
    client_id: Mutex<Option<String>>,
    callback: Mutex<Option<CredentialCallback>>,
    renders: Mutex<Vec<(String, ButtonOptions)>>,
}

impl FakeProvider {
    pub fn loaded() -> Self {
        Self::default()
    }

    pub fn load_after(&self, checks: u32) {
        *self.checks_until_loaded.lock() = checks;
    }

    pub fn initialized_with(&self) -> Option<String> {
        self.client_id.lock().clone()
    }

    pub fn renders(&self) -> Vec<(String, ButtonOptions)> {
        self.renders.lock().clone()
    }

    /// Simulate the user finishing sign-in in the widget.
    pub fn complete(&self, credential: &str) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(CredentialResponse::new(credential));
        }
    }
}

impl IdentityProvider for FakeProvider {
    fn is_loaded(&self) -> bool {
        let mut remaining = self.checks_until_loaded.lock();
        if *remaining == 0 {
            return true;
        }
        *remaining -= 1;
        false
    }

    fn initialize(&self, client_id: &str, callback: CredentialCallback) {
        *self.client_id.lock() = Some(client_id.to_string());
        *self.callback.lock() = Some(callback);
    }

    fn render_button(&self, container_id: &str, options: &ButtonOptions) {
        self.renders
            .lock()
            .push((container_id.to_string(), *options));
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    profiles: Mutex<Vec<UserProfile>>,
    data: Mutex<Vec<AppData>>,
    notices: Mutex<Vec<SessionNotice>>,
    states: Mutex<Vec<AuthStateChangedPayload>>,
}

impl RecordingObserver {
    pub fn profiles(&self) -> Vec<UserProfile> {
        self.profiles.lock().clone()
    }

    pub fn data(&self) -> Vec<AppData> {
        self.data.lock().clone()
    }

    pub fn notices(&self) -> Vec<SessionNotice> {
        self.notices.lock().clone()
    }

    pub fn states(&self) -> Vec<AuthStateChangedPayload> {
        self.states.lock().clone()
    }

    /// No profile, data or notice was reported. State changes are ignored.
    pub fn is_empty(&self) -> bool {
        self.profiles.lock().is_empty()
            && self.data.lock().is_empty()
            && self.notices.lock().is_empty()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_user_info(&self, profile: &UserProfile) {
        self.profiles.lock().push(profile.clone());
    }

    fn on_data_loaded(&self, data: &AppData) {
        self.data.lock().push(data.clone());
    }

    fn on_notice(&self, notice: &SessionNotice) {
        self.notices.lock().push(notice.clone());
    }

    fn on_state_changed(&self, payload: &AuthStateChangedPayload) {
        self.states.lock().push(payload.clone());
    }
}
