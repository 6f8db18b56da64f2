//! Session management with FSM-based state tracking.
//!
//! `SessionManager` owns the in-memory session, the persisted credential and
//! the exchange protocol with the backend. Collaborators (backend, host page,
//! identity provider, observer) are injected through [`SessionManagerBuilder`].

use crate::attach::{
    run_attach_loop, AttachOutcome, AttachStep, WidgetAttachConfig, WidgetAttachHandle,
};
use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthState, AuthStateChangedPayload};
use crate::backend::{AuthBackend, LoginRequest, LoginResponse, SyncRequest, UserProfile};
use crate::events::{NoopObserver, SessionNotice, SessionObserver};
use crate::page::{ContainerVisibility, HostPage, ScriptTag};
use crate::widget::{ButtonOptions, CredentialCallback, CredentialResponse, IdentityProvider};
use crate::{AuthError, AuthResult};
use parking_lot::Mutex;
use serde::Serialize;
use sessionkit_config::{is_client_id_configured, Config};
use sessionkit_storage::{CredentialStore, MemoryStorage, SecureStorage};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};

/// How a credential reached the manager. Decides how failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    /// Persisted credential replayed at startup. Failures stay in the logs.
    Silent,
    /// Fresh credential from the sign-in widget. Failures produce notices.
    Interactive,
}

impl LoginMode {
    fn attempt_input(self) -> AuthMachineInput {
        match self {
            LoginMode::Silent => AuthMachineInput::SilentAttempt,
            LoginMode::Interactive => AuthMachineInput::InteractiveAttempt,
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginMode::Silent => write!(f, "silent"),
            LoginMode::Interactive => write!(f, "interactive"),
        }
    }
}

/// An authenticated session. Built in one step from a successful exchange.
#[derive(Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    credential: String,
    profile: Option<UserProfile>,
}

impl Session {
    fn new(credential: String, profile: Option<UserProfile>) -> Self {
        Self {
            credential,
            profile,
        }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.profile.as_ref().and_then(UserProfile::user_id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credential", &"<redacted>")
            .field("profile", &self.profile)
            .finish()
    }
}

/// Result of [`SessionManager::sync_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No session, nothing sent.
    Skipped,
    Synced,
    /// Sent but failed. Already logged.
    Failed,
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

/// Builder for [`SessionManager`].
pub struct SessionManagerBuilder {
    client_id: String,
    backend: Option<Arc<dyn AuthBackend>>,
    credentials: Option<CredentialStore>,
    page: Option<Arc<dyn HostPage>>,
    provider: Option<Arc<dyn IdentityProvider>>,
    observer: Arc<dyn SessionObserver>,
    attach_config: WidgetAttachConfig,
    script: ScriptTag,
    button_options: ButtonOptions,
}

impl SessionManagerBuilder {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            backend: None,
            credentials: None,
            page: None,
            provider: None,
            observer: Arc::new(NoopObserver),
            attach_config: WidgetAttachConfig::default(),
            script: ScriptTag::default(),
            button_options: ButtonOptions::default(),
        }
    }

    /// Client id, polling settings and provider script from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.client_id.clone())
            .attach_config(WidgetAttachConfig::from(&config.widget))
            .script(ScriptTag::provider(config.provider_script_url.clone()))
    }

    pub fn backend(mut self, backend: Arc<dyn AuthBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn credential_store(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Persist the credential in `storage`.
    pub fn storage(self, storage: Box<dyn SecureStorage>) -> Self {
        self.credential_store(CredentialStore::new(storage))
    }

    pub fn page(mut self, page: Arc<dyn HostPage>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn attach_config(mut self, attach_config: WidgetAttachConfig) -> Self {
        self.attach_config = attach_config;
        self
    }

    pub fn script(mut self, script: ScriptTag) -> Self {
        self.script = script;
        self
    }

    pub fn button_options(mut self, button_options: ButtonOptions) -> Self {
        self.button_options = button_options;
        self
    }

    /// Build the manager. Backend, page and provider are required; without a
    /// credential store the credential only lives in memory.
    pub fn build(self) -> AuthResult<Arc<SessionManager>> {
        let backend = self
            .backend
            .ok_or_else(|| AuthError::Config("an auth backend is required".to_string()))?;
        let page = self
            .page
            .ok_or_else(|| AuthError::Config("a host page is required".to_string()))?;
        let provider = self
            .provider
            .ok_or_else(|| AuthError::Config("an identity provider is required".to_string()))?;
        let credentials = self.credentials.unwrap_or_else(|| {
            debug!("No credential store configured, credential will not outlive the process");
            CredentialStore::new(Box::new(MemoryStorage::new()))
        });

        if !is_client_id_configured(&self.client_id) {
            warn!("Client id is not configured, the sign-in widget will not render");
        }

        Ok(Arc::new_cyclic(|self_ref| SessionManager {
            client_id: self.client_id,
            backend,
            credentials,
            page,
            provider,
            observer: self.observer,
            attach_config: self.attach_config,
            script: self.script,
            button_options: self.button_options,
            session: Mutex::new(None),
            fsm: Mutex::new(AuthMachine::new()),
            exchange_lock: tokio::sync::Mutex::new(()),
            self_ref: self_ref.clone(),
        }))
    }
}

/// Session manager for the sign-in lifecycle.
///
/// Exchanges and logout run one at a time. Session and FSM state sit behind
/// short synchronous locks that are never held across an await point.
pub struct SessionManager {
    client_id: String,
    backend: Arc<dyn AuthBackend>,
    credentials: CredentialStore,
    page: Arc<dyn HostPage>,
    provider: Arc<dyn IdentityProvider>,
    observer: Arc<dyn SessionObserver>,
    attach_config: WidgetAttachConfig,
    script: ScriptTag,
    button_options: ButtonOptions,
    session: Mutex<Option<Session>>,
    /// Internal FSM for tracking auth state transitions.
    fsm: Mutex<AuthMachine>,
    exchange_lock: tokio::sync::Mutex<()>,
    self_ref: Weak<SessionManager>,
}

impl SessionManager {
    pub fn builder(client_id: impl Into<String>) -> SessionManagerBuilder {
        SessionManagerBuilder::new(client_id)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.session.lock().as_ref().and_then(|s| s.profile.clone())
    }

    /// Get the current FSM state.
    pub fn auth_state(&self) -> AuthState {
        AuthState::from(self.fsm.lock().state())
    }

    /// Whether a credential is persisted, without contacting the backend.
    pub fn has_persisted_credential(&self) -> AuthResult<bool> {
        Ok(self.credentials.has_credential()?)
    }

    /// Inject the provider script and try a silent login.
    ///
    /// The observer is registered at construction, so it sees everything the
    /// silent login produces. Failures are logged, never returned.
    pub async fn initialize(&self) {
        self.ensure_provider_script();

        match self.check_session().await {
            Ok(true) => debug!("Session restored from persisted credential"),
            Ok(false) => debug!("No session to restore"),
            Err(e) => debug!(error = %e, "Silent login did not restore a session"),
        }
    }

    /// Append the provider script unless the page already has it.
    /// Returns true if a script was appended.
    pub fn ensure_provider_script(&self) -> bool {
        if self.page.has_element(&self.script.id) {
            debug!(script_id = %self.script.id, "Provider script already present");
            return false;
        }

        self.page.append_script(&self.script);
        info!(src = %self.script.src, "Injected identity provider script");
        true
    }

    /// Silently re-authenticate with the persisted credential, if any.
    ///
    /// Returns:
    /// - `Ok(false)` if nothing is persisted (no network call)
    /// - `Ok(true)` if a session exists or was restored
    /// - `Err(...)` if the exchange failed; its side effects already happened
    pub async fn check_session(&self) -> AuthResult<bool> {
        let Some(credential) = self.credentials.get_credential()? else {
            debug!("No persisted credential");
            return Ok(false);
        };

        if self.is_logged_in() {
            debug!("Session already active, skipping silent login");
            return Ok(true);
        }

        info!("Attempting silent login with persisted credential");
        self.exchange_credential(&credential, LoginMode::Silent)
            .await
            .map(|_| true)
    }

    /// Handle a completed sign-in from the identity provider.
    pub async fn handle_credential_response(
        &self,
        response: CredentialResponse,
    ) -> AuthResult<Session> {
        debug!(select_by = ?response.select_by, "Credential received from identity provider");
        self.exchange_credential(&response.credential, LoginMode::Interactive)
            .await
    }

    /// Exchange a credential with the backend.
    ///
    /// On success the session is stored, the credential persisted and the
    /// observer told about the profile and any returned data. On rejection a
    /// silent attempt erases the persisted credential (if unchanged) while an
    /// interactive one emits [`SessionNotice::LoginFailed`]. Transport
    /// failures emit [`SessionNotice::ConnectionFailed`] only when interactive.
    pub async fn exchange_credential(
        &self,
        credential: &str,
        mode: LoginMode,
    ) -> AuthResult<Session> {
        if credential.trim().is_empty() {
            warn!(mode = %mode, "Refusing to exchange an empty credential");
            return Err(AuthError::EmptyCredential);
        }

        let _guard = self.exchange_lock.lock().await;

        if mode == LoginMode::Silent {
            if let Some(session) = self.session().filter(|s| s.credential == credential) {
                debug!("Credential already backs the active session");
                return Ok(session);
            }
        }

        self.transition(&mode.attempt_input())?;
        let pending = PendingExchange::new(self);
        info!(mode = %mode, "Exchanging credential with backend");

        let request = LoginRequest {
            credential: credential.to_string(),
            client_id: self.client_id.clone(),
        };

        let outcome = self.backend.login(&request).await;
        pending.disarm();

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.on_exchange_unreachable(mode, &e);
                return Err(e);
            }
        };

        if !response.is_success() {
            return Err(self.on_exchange_rejected(credential, mode, &response));
        }

        Ok(self.on_exchange_succeeded(credential, mode, response))
    }

    fn on_exchange_succeeded(
        &self,
        credential: &str,
        mode: LoginMode,
        response: LoginResponse,
    ) -> Session {
        let session = Session::new(credential.to_string(), response.user_info.clone());
        *self.session.lock() = Some(session.clone());

        if let Err(e) = self.credentials.set_credential(credential) {
            error!(error = %e, "Failed to persist credential, session will not survive restart");
        }

        self.settle(&AuthMachineInput::ExchangeSucceeded);
        info!(
            mode = %mode,
            user_id = session.user_id().unwrap_or("unknown"),
            "Session established"
        );

        if let Some(profile) = session.profile() {
            self.observer.on_user_info(profile);
        }

        // Returned data wins over the plain "logged in" notice.
        if let Some(data) = response.non_empty_data() {
            self.observer.on_data_loaded(data);
            self.notify(SessionNotice::DataSynced);
        } else if mode == LoginMode::Interactive {
            self.notify(SessionNotice::LoggedIn);
        }

        session
    }

    fn on_exchange_rejected(
        &self,
        credential: &str,
        mode: LoginMode,
        response: &LoginResponse,
    ) -> AuthError {
        let reason = response.rejection_reason();
        self.settle(&AuthMachineInput::ExchangeRejected);

        match mode {
            LoginMode::Silent => {
                match self.credentials.clear_credential_if(credential) {
                    Ok(true) => info!(reason = %reason, "Persisted credential rejected, cleared"),
                    Ok(false) => debug!(reason = %reason, "Rejected credential was already replaced"),
                    Err(e) => error!(error = %e, "Failed to clear rejected credential"),
                }
            }
            LoginMode::Interactive => {
                error!(reason = %reason, "Backend rejected login");
                self.notify(SessionNotice::LoginFailed {
                    reason: reason.clone(),
                });
            }
        }

        AuthError::ExchangeRejected { reason }
    }

    fn on_exchange_unreachable(&self, mode: LoginMode, err: &AuthError) {
        self.settle(&AuthMachineInput::ExchangeFailed);

        match mode {
            LoginMode::Silent => {
                warn!(error = %err, "Silent login could not reach backend, credential kept");
            }
            LoginMode::Interactive => {
                error!(error = %err, "Login could not reach backend");
                self.notify(SessionNotice::ConnectionFailed);
            }
        }
    }

    /// Attach the sign-in widget to `container_id`.
    ///
    /// Returns immediately; polling runs on a spawned task, so this must be
    /// called from within a Tokio runtime.
    pub fn attach_widget(&self, container_id: &str) -> WidgetAttachHandle {
        if !is_client_id_configured(&self.client_id) {
            warn!(container_id, "Client id not configured, not rendering sign-in widget");
            return WidgetAttachHandle::finished(AttachOutcome::NotConfigured);
        }

        if self.is_logged_in() {
            debug!(container_id, "Already logged in, not rendering sign-in widget");
            return WidgetAttachHandle::finished(AttachOutcome::AlreadyAuthenticated);
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_attach_loop(
            self.self_ref.clone(),
            container_id.to_string(),
            self.attach_config.clone(),
            shutdown_rx,
        ));

        WidgetAttachHandle::running(shutdown_tx, task)
    }

    /// One attach attempt.
    pub(crate) fn attach_step(&self, container_id: &str, attempt: u32) -> AttachStep {
        if self.is_logged_in() {
            debug!(container_id, attempt, "Session appeared, dropping widget attach");
            return AttachStep::Done(AttachOutcome::AlreadyAuthenticated);
        }

        if !self.provider.is_loaded() {
            trace!(attempt, "Identity provider not loaded yet");
            return AttachStep::NotReady;
        }

        match self.page.container_visibility(container_id) {
            ContainerVisibility::Missing => {
                error!(container_id, "Sign-in container not found");
                AttachStep::Done(AttachOutcome::ContainerMissing)
            }
            ContainerVisibility::Hidden => {
                trace!(container_id, attempt, "Sign-in container not visible yet");
                AttachStep::NotReady
            }
            ContainerVisibility::Visible => {
                self.provider
                    .initialize(&self.client_id, self.credential_callback());
                self.provider
                    .render_button(container_id, &self.button_options);
                info!(container_id, attempt, "Rendered sign-in widget");
                AttachStep::Done(AttachOutcome::Rendered { attempts: attempt })
            }
        }
    }

    /// Callback handed to the provider. Holds only a weak reference and runs
    /// the exchange on the runtime that attached the widget.
    fn credential_callback(&self) -> CredentialCallback {
        let manager = self.self_ref.clone();
        let runtime = tokio::runtime::Handle::current();

        Arc::new(move |response: CredentialResponse| {
            let Some(manager) = manager.upgrade() else {
                debug!("Credential arrived after the session manager was dropped");
                return;
            };
            runtime.spawn(async move {
                if let Err(e) = manager.handle_credential_response(response).await {
                    debug!(error = %e, "Interactive login did not complete");
                }
            });
        })
    }

    /// Send app data to the backend. Best effort: never fails, never notifies.
    pub async fn sync_data<T: Serialize + ?Sized>(&self, data: &T) -> SyncStatus {
        let Some(session) = self.session() else {
            debug!("Not logged in, skipping sync");
            return SyncStatus::Skipped;
        };

        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Sync payload is not serializable");
                return SyncStatus::Failed;
            }
        };

        let request = SyncRequest {
            credential: session.credential,
            client_id: self.client_id.clone(),
            data,
        };

        match self.backend.sync(&request).await {
            Ok(()) => {
                info!("Data synced to cloud");
                SyncStatus::Synced
            }
            Err(e) => {
                warn!(error = %e, "Sync failed");
                SyncStatus::Failed
            }
        }
    }

    /// Erase the persisted credential and session, then reload the page.
    pub async fn logout(&self) {
        let _guard = self.exchange_lock.lock().await;

        if let Err(e) = self.transition(&AuthMachineInput::LogoutRequested) {
            warn!(error = %e, "Logging out from an unexpected state");
        }

        if let Err(e) = self.credentials.clear_credential() {
            error!(error = %e, "Failed to clear persisted credential");
        }
        *self.session.lock() = None;

        self.reset_state();
        info!("Logged out");

        self.page.reload();
    }

    fn notify(&self, notice: SessionNotice) {
        debug!(notice = %notice, "Session notice");
        self.observer.on_notice(&notice);
    }

    /// Transition the FSM and notify the observer if state changed.
    fn transition(&self, input: &AuthMachineInput) -> Result<AuthState, AuthError> {
        let mut fsm = self.fsm.lock();
        let old_state = AuthState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = AuthState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Auth state transition"
            );
            self.notify_state_change(new_state);
        }

        Ok(new_state)
    }

    /// Put the FSM back to `NotLoggedIn` whatever state it is in.
    fn reset_state(&self) {
        let mut fsm = self.fsm.lock();
        let old_state = AuthState::from(fsm.state());
        *fsm = AuthMachine::new();
        drop(fsm);

        if old_state != AuthState::NotLoggedIn {
            debug!(old_state = ?old_state, "Auth state reset");
            self.notify_state_change(AuthState::NotLoggedIn);
        }
    }

    /// Transition that must not abort the caller.
    fn settle(&self, input: &AuthMachineInput) {
        if let Err(e) = self.transition(input) {
            warn!(error = %e, "Unexpected auth state");
        }
    }

    fn notify_state_change(&self, state: AuthState) {
        let (user_id, email) = self
            .session
            .lock()
            .as_ref()
            .and_then(|s| s.profile.as_ref())
            .map(|p| (p.user_id().map(str::to_string), p.email.clone()))
            .unwrap_or((None, None));

        self.observer.on_state_changed(&AuthStateChangedPayload {
            state,
            user_id,
            email,
        });
    }
}

/// An exchange waiting on the backend. If the future is dropped before the
/// backend answers, the FSM is settled as a failed exchange.
struct PendingExchange<'a> {
    manager: &'a SessionManager,
    armed: bool,
}

impl<'a> PendingExchange<'a> {
    fn new(manager: &'a SessionManager) -> Self {
        Self {
            manager,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingExchange<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Credential exchange cancelled before the backend answered");
            self.manager.settle(&AuthMachineInput::ExchangeFailed);
        }
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("client_id", &self.client_id)
            .field("state", &self.auth_state())
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AppData;
    use crate::testing::{
        FakePage, FakeProvider, LoginBehavior, MockBackend, RecordingObserver, CLIENT_ID,
    };
    use serde_json::json;
    use sessionkit_storage::StorageKeys;
    use std::time::Duration;

    struct Harness {
        manager: Arc<SessionManager>,
        backend: Arc<MockBackend>,
        page: Arc<FakePage>,
        provider: Arc<FakeProvider>,
        observer: Arc<RecordingObserver>,
        storage: Arc<MemoryStorage>,
    }

    fn harness_with(client_id: &str, backend: MockBackend) -> Harness {
        let backend = Arc::new(backend);
        let page = Arc::new(FakePage::new());
        let provider = Arc::new(FakeProvider::loaded());
        let observer = Arc::new(RecordingObserver::default());
        let storage = Arc::new(MemoryStorage::new());

        let manager = SessionManager::builder(client_id)
            .backend(backend.clone())
            .page(page.clone())
            .provider(provider.clone())
            .observer(observer.clone())
            .storage(Box::new(storage.clone()))
            .build()
            .unwrap();

        Harness {
            manager,
            backend,
            page,
            provider,
            observer,
            storage,
        }
    }

    fn harness(backend: MockBackend) -> Harness {
        harness_with(CLIENT_ID, backend)
    }

    fn persist(h: &Harness, credential: &str) {
        h.storage
            .set(StorageKeys::GOOGLE_CREDENTIAL, credential)
            .unwrap();
    }

    fn persisted(h: &Harness) -> Option<String> {
        h.storage.get(StorageKeys::GOOGLE_CREDENTIAL).unwrap()
    }

    fn profile() -> serde_json::Value {
        json!({"id": "user-1", "name": "Ada", "email": "ada@example.com"})
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let result = SessionManager::builder(CLIENT_ID).build();
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_initial_state() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
        assert!(!h.manager.is_logged_in());
        assert!(h.manager.profile().is_none());
    }

    #[test]
    fn test_session_debug_redacts_credential() {
        let session = Session::new("secret-token".to_string(), None);
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn test_check_session_without_credential_makes_no_call() {
        let h = harness(MockBackend::accepting(profile(), json!({})));

        assert!(!h.manager.check_session().await.unwrap());

        assert_eq!(h.backend.login_calls(), 0);
        assert!(h.observer.is_empty());
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_silent_rejection_clears_credential_without_notice() {
        let h = harness(MockBackend::rejecting(Some("Token expired")));
        persist(&h, "stale-token");

        let result = h.manager.check_session().await;

        assert!(matches!(result, Err(AuthError::ExchangeRejected { .. })));
        assert_eq!(persisted(&h), None);
        assert!(!h.manager.is_logged_in());
        assert!(h.observer.notices().is_empty());
        assert!(h.observer.profiles().is_empty());
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_silent_rejection_keeps_newer_credential() {
        let backend = MockBackend::rejecting(None);
        let h = harness(backend);
        persist(&h, "stale-token");

        let storage = h.storage.clone();
        h.backend.before_reply(move || {
            storage
                .set(StorageKeys::GOOGLE_CREDENTIAL, "fresh-token")
                .unwrap();
        });

        let _ = h.manager.check_session().await;

        assert_eq!(persisted(&h).as_deref(), Some("fresh-token"));
    }

    #[tokio::test]
    async fn test_silent_success_with_empty_data_reports_profile_only() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        persist(&h, "good-token");

        assert!(h.manager.check_session().await.unwrap());

        assert!(h.manager.is_logged_in());
        assert_eq!(h.observer.profiles().len(), 1);
        assert_eq!(h.observer.profiles()[0].name.as_deref(), Some("Ada"));
        assert!(h.observer.data().is_empty());
        assert!(h.observer.notices().is_empty());
        assert_eq!(persisted(&h).as_deref(), Some("good-token"));
        assert_eq!(h.backend.last_login().unwrap().client_id, CLIENT_ID);
    }

    #[tokio::test]
    async fn test_silent_success_with_data_emits_data_synced() {
        let h = harness(MockBackend::accepting(profile(), json!({"notes": ["a"]})));
        persist(&h, "good-token");

        h.manager.check_session().await.unwrap();

        assert_eq!(h.observer.data(), vec![AppData::new(json!({"notes": ["a"]}))]);
        assert_eq!(h.observer.notices(), vec![SessionNotice::DataSynced]);
    }

    #[tokio::test]
    async fn test_silent_transport_failure_keeps_credential_quietly() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));
        persist(&h, "good-token");

        let result = h.manager.check_session().await;

        assert!(result.unwrap_err().is_transport());
        assert_eq!(persisted(&h).as_deref(), Some("good-token"));
        assert!(h.observer.notices().is_empty());
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_check_session_is_noop_when_logged_in() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        persist(&h, "good-token");

        h.manager.check_session().await.unwrap();
        assert!(h.manager.check_session().await.unwrap());
        h.manager
            .exchange_credential("good-token", LoginMode::Silent)
            .await
            .unwrap();

        assert_eq!(h.backend.login_calls(), 1);
    }

    #[tokio::test]
    async fn test_interactive_success_with_data() {
        let h = harness(MockBackend::accepting(profile(), json!({"theme": "dark"})));

        let session = h
            .manager
            .exchange_credential("fresh-token", LoginMode::Interactive)
            .await
            .unwrap();

        assert_eq!(session.user_id(), Some("user-1"));
        assert_eq!(h.observer.profiles().len(), 1);
        assert_eq!(h.observer.data().len(), 1);
        assert_eq!(h.observer.notices(), vec![SessionNotice::DataSynced]);
        assert_eq!(persisted(&h).as_deref(), Some("fresh-token"));
    }

    #[tokio::test]
    async fn test_interactive_success_without_data_emits_logged_in() {
        let h = harness(MockBackend::accepting(json!(null), json!(null)));

        h.manager
            .exchange_credential("fresh-token", LoginMode::Interactive)
            .await
            .unwrap();

        assert!(h.observer.profiles().is_empty());
        assert!(h.observer.data().is_empty());
        assert_eq!(h.observer.notices(), vec![SessionNotice::LoggedIn]);
        assert!(h.manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_interactive_rejection_emits_login_failed() {
        let h = harness(MockBackend::rejecting(Some("Invalid audience")));
        persist(&h, "previous-token");

        let result = h
            .manager
            .exchange_credential("bad-token", LoginMode::Interactive)
            .await;

        assert!(matches!(result, Err(AuthError::ExchangeRejected { .. })));
        assert_eq!(
            h.observer.notices(),
            vec![SessionNotice::LoginFailed {
                reason: "Invalid audience".to_string()
            }]
        );
        assert_eq!(persisted(&h).as_deref(), Some("previous-token"));
        assert!(!h.manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_interactive_rejection_without_reason() {
        let h = harness(MockBackend::rejecting(None));

        let _ = h
            .manager
            .exchange_credential("bad-token", LoginMode::Interactive)
            .await;

        assert_eq!(
            h.observer.notices()[0].to_string(),
            "Login Failed: Unknown server error"
        );
    }

    #[tokio::test]
    async fn test_interactive_transport_failure_emits_connection_failed() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));

        let result = h
            .manager
            .exchange_credential("fresh-token", LoginMode::Interactive)
            .await;

        assert!(result.is_err());
        assert_eq!(h.observer.notices(), vec![SessionNotice::ConnectionFailed]);
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_empty_credential_makes_no_call() {
        let h = harness(MockBackend::accepting(profile(), json!({})));

        let result = h
            .manager
            .exchange_credential("   ", LoginMode::Interactive)
            .await;

        assert!(matches!(result, Err(AuthError::EmptyCredential)));
        assert_eq!(h.backend.login_calls(), 0);
        assert!(h.observer.is_empty());
    }

    #[tokio::test]
    async fn test_state_changes_reported_to_observer() {
        let h = harness(MockBackend::accepting(profile(), json!({})));

        h.manager
            .exchange_credential("fresh-token", LoginMode::Interactive)
            .await
            .unwrap();

        let states = h.observer.states();
        assert_eq!(
            states.iter().map(|p| p.state).collect::<Vec<_>>(),
            vec![AuthState::LoggingIn, AuthState::LoggedIn]
        );
        assert_eq!(states[1].user_id.as_deref(), Some("user-1"));
        assert_eq!(states[1].email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_failed_reauthentication_keeps_session() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.manager
            .exchange_credential("first-token", LoginMode::Interactive)
            .await
            .unwrap();

        h.backend.set_behavior(LoginBehavior::Reject(None));
        let _ = h
            .manager
            .exchange_credential("second-token", LoginMode::Interactive)
            .await;

        assert_eq!(h.manager.session().unwrap().credential(), "first-token");
        assert_eq!(h.manager.auth_state(), AuthState::LoggedIn);
    }

    #[tokio::test]
    async fn test_initialize_injects_script_once_and_restores_session() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        persist(&h, "good-token");

        h.manager.initialize().await;
        h.manager.initialize().await;

        let scripts = h.page.scripts();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0], ScriptTag::default());
        assert!(h.manager.is_logged_in());
        assert_eq!(h.backend.login_calls(), 1);
    }

    #[tokio::test]
    async fn test_initialize_respects_existing_script() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.page.add_element("google-client-script");

        h.manager.initialize().await;

        assert!(h.page.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_attach_with_session_never_renders() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.page.set_container("login-btn", ContainerVisibility::Visible);
        h.manager
            .exchange_credential("tok", LoginMode::Interactive)
            .await
            .unwrap();

        let outcome = h.manager.attach_widget("login-btn").outcome().await;

        assert_eq!(outcome, AttachOutcome::AlreadyAuthenticated);
        assert!(h.provider.renders().is_empty());
        assert_eq!(h.page.visibility_checks(), 0);
    }

    #[tokio::test]
    async fn test_attach_unconfigured_client_id() {
        let h = harness_with(
            "PASTE_YOUR_CLIENT_ID.apps.googleusercontent.com",
            MockBackend::new(LoginBehavior::Unreachable),
        );
        h.page.set_container("login-btn", ContainerVisibility::Visible);

        let outcome = h.manager.attach_widget("login-btn").outcome().await;

        assert_eq!(outcome, AttachOutcome::NotConfigured);
        assert_eq!(h.page.visibility_checks(), 0);

        let h = harness_with("", MockBackend::new(LoginBehavior::Unreachable));
        assert_eq!(
            h.manager.attach_widget("login-btn").outcome().await,
            AttachOutcome::NotConfigured
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_renders_when_ready() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));
        h.page.set_container("login-btn", ContainerVisibility::Visible);

        let outcome = h.manager.attach_widget("login-btn").outcome().await;

        assert_eq!(outcome, AttachOutcome::Rendered { attempts: 1 });
        assert_eq!(h.provider.initialized_with().as_deref(), Some(CLIENT_ID));
        assert_eq!(
            h.provider.renders(),
            vec![("login-btn".to_string(), ButtonOptions::default())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_waits_for_provider_library() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));
        h.provider.load_after(3);
        h.page.set_container("login-btn", ContainerVisibility::Visible);

        let start = tokio::time::Instant::now();
        let outcome = h.manager.attach_widget("login-btn").outcome().await;

        assert_eq!(outcome, AttachOutcome::Rendered { attempts: 4 });
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_hidden_container_exhausts_attempts() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));
        h.page.set_container("login-btn", ContainerVisibility::Hidden);

        let outcome = h.manager.attach_widget("login-btn").outcome().await;

        assert_eq!(outcome, AttachOutcome::Exhausted { attempts: 30 });
        assert_eq!(h.page.visibility_checks(), 30);
        assert!(h.provider.renders().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_missing_container_is_terminal() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));

        let outcome = h.manager.attach_widget("nowhere").outcome().await;

        assert_eq!(outcome, AttachOutcome::ContainerMissing);
        assert_eq!(h.page.visibility_checks(), 1);
        assert!(h.provider.renders().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_mid_poll_suppresses_render() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.page.set_container("login-btn", ContainerVisibility::Hidden);

        let handle = h.manager.attach_widget("login-btn");
        tokio::time::sleep(Duration::from_millis(150)).await;

        h.manager
            .exchange_credential("tok", LoginMode::Silent)
            .await
            .unwrap();
        h.page.set_container("login-btn", ContainerVisibility::Visible);

        assert_eq!(handle.outcome().await, AttachOutcome::AlreadyAuthenticated);
        assert!(h.provider.renders().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_cancel() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));
        h.page.set_container("login-btn", ContainerVisibility::Hidden);

        let mut handle = h.manager.attach_widget("login-btn");
        tokio::time::sleep(Duration::from_millis(250)).await;
        handle.cancel();

        assert_eq!(handle.outcome().await, AttachOutcome::Cancelled);
        assert!(h.page.visibility_checks() < 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let h = harness(MockBackend::new(LoginBehavior::Unreachable));
        h.page.set_container("login-btn", ContainerVisibility::Hidden);

        drop(h.manager.attach_widget("login-btn"));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(h.page.visibility_checks() <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_widget_callback_runs_interactive_login() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.page.set_container("login-btn", ContainerVisibility::Visible);

        let outcome = h.manager.attach_widget("login-btn").outcome().await;
        assert!(outcome.is_rendered());

        h.provider.complete("widget-token");
        for _ in 0..100 {
            if h.manager.is_logged_in() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(h.manager.is_logged_in());
        assert_eq!(h.backend.last_login().unwrap().credential, "widget-token");
        assert_eq!(h.observer.notices(), vec![SessionNotice::LoggedIn]);
        assert_eq!(persisted(&h).as_deref(), Some("widget-token"));
    }

    #[tokio::test]
    async fn test_sync_without_session_makes_no_call() {
        let h = harness(MockBackend::accepting(profile(), json!({})));

        let status = h.manager.sync_data(&json!({"theme": "dark"})).await;

        assert_eq!(status, SyncStatus::Skipped);
        assert_eq!(h.backend.sync_calls().len(), 0);
    }

    #[tokio::test]
    async fn test_sync_with_session_posts_payload() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.manager
            .exchange_credential("tok", LoginMode::Interactive)
            .await
            .unwrap();

        let status = h.manager.sync_data(&json!({"theme": "dark"})).await;

        assert!(status.is_synced());
        let calls = h.backend.sync_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].credential, "tok");
        assert_eq!(calls[0].client_id, CLIENT_ID);
        assert_eq!(calls[0].data, json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn test_sync_failure_is_quiet() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.manager
            .exchange_credential("tok", LoginMode::Silent)
            .await
            .unwrap();
        h.backend.fail_sync();

        let status = h.manager.sync_data(&json!([1, 2, 3])).await;

        assert_eq!(status, SyncStatus::Failed);
        assert!(h.observer.notices().is_empty());
        assert!(h.manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_reloads() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.manager
            .exchange_credential("tok", LoginMode::Interactive)
            .await
            .unwrap();

        h.manager.logout().await;

        assert!(!h.manager.is_logged_in());
        assert_eq!(persisted(&h), None);
        assert_eq!(h.page.reloads(), 1);
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_logout_without_session_still_clears() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        persist(&h, "orphan-token");

        h.manager.logout().await;

        assert_eq!(persisted(&h), None);
        assert_eq!(h.page.reloads(), 1);
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_exchange_leaves_manager_usable() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.backend.stall_next_login();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            h.manager.exchange_credential("tok", LoginMode::Interactive),
        )
        .await;

        assert!(cancelled.is_err());
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
        assert!(!h.manager.is_logged_in());

        let session = h
            .manager
            .exchange_credential("tok", LoginMode::Interactive)
            .await
            .unwrap();

        assert_eq!(session.credential(), "tok");
        assert_eq!(h.backend.login_calls(), 2);
        assert_eq!(h.manager.auth_state(), AuthState::LoggedIn);
        assert_eq!(h.observer.notices(), vec![SessionNotice::LoggedIn]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_silent_login_keeps_credential() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        persist(&h, "good-token");
        h.backend.stall_next_login();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), h.manager.check_session()).await;

        assert!(cancelled.is_err());
        assert_eq!(persisted(&h).as_deref(), Some("good-token"));
        assert!(h.observer.notices().is_empty());
        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);

        assert!(h.manager.check_session().await.unwrap());
        assert!(h.manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_logout_resets_an_in_progress_state() {
        let h = harness(MockBackend::accepting(profile(), json!({})));
        h.manager
            .fsm
            .lock()
            .consume(&AuthMachineInput::InteractiveAttempt)
            .unwrap();
        assert_eq!(h.manager.auth_state(), AuthState::LoggingIn);

        h.manager.logout().await;

        assert_eq!(h.manager.auth_state(), AuthState::NotLoggedIn);
        assert_eq!(
            h.observer.states().last().map(|p| p.state),
            Some(AuthState::NotLoggedIn)
        );
        assert_eq!(h.page.reloads(), 1);

        h.manager
            .exchange_credential("tok", LoginMode::Interactive)
            .await
            .unwrap();
        assert!(h.manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_rejected_credential_is_cleared_verbatim() {
        let h = harness(MockBackend::rejecting(Some("expired")));
        persist(&h, "stale-token\n");

        let first = h.manager.check_session().await;

        assert!(matches!(first, Err(AuthError::ExchangeRejected { .. })));
        assert_eq!(
            h.backend.last_login().unwrap().credential,
            "stale-token\n"
        );
        assert_eq!(persisted(&h), None);

        assert!(!h.manager.check_session().await.unwrap());
        assert_eq!(h.backend.login_calls(), 1);
    }
}
