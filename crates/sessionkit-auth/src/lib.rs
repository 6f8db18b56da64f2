//! Sign-in session management for sessionkit.
//!
//! This crate provides:
//! - Credential exchange with the backend auth service
//! - Silent re-authentication from a persisted credential
//! - Bounded attachment of the identity provider's sign-in widget
//! - Best-effort sync of application data
//! - Explicit FSM-based auth state management

mod attach;
mod auth_fsm;
mod backend;
mod error;
mod events;
mod page;
mod session;
mod widget;

#[cfg(test)]
mod testing;

pub use attach::{AttachOutcome, WidgetAttachConfig, WidgetAttachHandle};
pub use auth_fsm::auth_machine;
pub use auth_fsm::{
    AuthMachine, AuthMachineInput, AuthMachineState, AuthState, AuthStateChangedPayload,
};
pub use backend::{
    AppData, AuthBackend, HttpAuthBackend, LoginRequest, LoginResponse, SyncRequest, UserProfile,
    LOGIN_PATH, STATUS_SUCCESS, SYNC_PATH,
};
pub use error::{AuthError, AuthResult};
pub use events::{NoopObserver, SessionNotice, SessionObserver};
pub use page::{ContainerVisibility, HostPage, ScriptTag, PROVIDER_SCRIPT_ID};
pub use session::{LoginMode, Session, SessionManager, SessionManagerBuilder, SyncStatus};
pub use widget::{
    ButtonOptions, ButtonSize, ButtonTheme, CredentialCallback, CredentialResponse,
    IdentityProvider,
};
