//! Typed notifications from the session manager.

use crate::auth_fsm::AuthStateChangedPayload;
use crate::backend::{AppData, UserProfile};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User-facing outcome of a login, for the presentation layer to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionNotice {
    /// Login succeeded and the backend returned saved data.
    DataSynced,
    /// Interactive login succeeded without saved data.
    LoggedIn,
    /// The backend rejected an interactive login.
    LoginFailed { reason: String },
    /// The backend could not be reached during an interactive login.
    ConnectionFailed,
}

impl SessionNotice {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SessionNotice::LoginFailed { .. } | SessionNotice::ConnectionFailed
        )
    }
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotice::DataSynced => write!(f, "Data synced from cloud!"),
            SessionNotice::LoggedIn => write!(f, "Logged in successfully!"),
            SessionNotice::LoginFailed { reason } => write!(f, "Login Failed: {reason}"),
            SessionNotice::ConnectionFailed => {
                write!(f, "Login Failed: Could not connect to server.")
            }
        }
    }
}

/// Receives session events. Every method defaults to a no-op.
///
/// Called synchronously from the task that produced the event, so
/// implementations should hand off anything slow.
pub trait SessionObserver: Send + Sync {
    fn on_user_info(&self, _profile: &UserProfile) {}

    fn on_data_loaded(&self, _data: &AppData) {}

    fn on_notice(&self, _notice: &SessionNotice) {}

    fn on_state_changed(&self, _payload: &AuthStateChangedPayload) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
