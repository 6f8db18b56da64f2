//! Authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                    ┌─────────────────┐
//!        ┌───────────│   NotLoggedIn   │ (initial)
//!        │           └──┬───────────┬──┘
//!        │  SilentAttempt│           │InteractiveAttempt
//!        │              ▼           ▼
//!        │    ┌───────────┐   ┌───────────┐
//!        │    │ Verifying │   │ LoggingIn │
//!        │    └─────┬─────┘   └─────┬─────┘
//!        │          │ ExchangeSucceeded       (Rejected/Failed ──► NotLoggedIn)
//!        │          ▼               ▼
//!        │    ┌─────────────────────────┐  Silent/InteractiveAttempt  ┌──────────────────┐
//!        │    │        LoggedIn         │ ──────────────────────────► │ Reauthenticating │
//!        │    └────────────┬────────────┘ ◄────────────────────────── └──────────────────┘
//!        │ LogoutRequested │ LogoutRequested        any outcome
//!        ▼                 ▼
//!     ┌─────────────────────┐
//!     │     LoggingOut      │ ── LogoutComplete ──► NotLoggedIn
//!     └─────────────────────┘
//! ```
//!
//! A failed re-authentication keeps the existing session, so every outcome
//! of `Reauthenticating` lands back in `LoggedIn`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(NotLoggedIn)

    NotLoggedIn => {
        SilentAttempt => Verifying,
        InteractiveAttempt => LoggingIn,
        LogoutRequested => LoggingOut
    },
    Verifying => {
        ExchangeSucceeded => LoggedIn,
        ExchangeRejected => NotLoggedIn,
        ExchangeFailed => NotLoggedIn
    },
    LoggingIn => {
        ExchangeSucceeded => LoggedIn,
        ExchangeRejected => NotLoggedIn,
        ExchangeFailed => NotLoggedIn
    },
    LoggedIn => {
        SilentAttempt => Reauthenticating,
        InteractiveAttempt => Reauthenticating,
        LogoutRequested => LoggingOut
    },
    Reauthenticating => {
        ExchangeSucceeded => LoggedIn,
        ExchangeRejected => LoggedIn,
        ExchangeFailed => LoggedIn
    },
    LoggingOut => {
        LogoutComplete => NotLoggedIn
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Simplified view of the FSM state for observers and UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No session.
    NotLoggedIn,
    /// Silently exchanging a persisted credential.
    Verifying,
    /// Exchanging a credential from the sign-in widget.
    LoggingIn,
    /// Session established.
    LoggedIn,
    /// Exchanging a new credential while a session exists.
    Reauthenticating,
    /// Clearing the session.
    LoggingOut,
}

impl AuthState {
    /// Returns true if a session exists (LoggedIn or Reauthenticating).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::LoggedIn | AuthState::Reauthenticating)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::Verifying
                | AuthState::LoggingIn
                | AuthState::Reauthenticating
                | AuthState::LoggingOut
        )
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::NotLoggedIn => AuthState::NotLoggedIn,
            AuthMachineState::Verifying => AuthState::Verifying,
            AuthMachineState::LoggingIn => AuthState::LoggingIn,
            AuthMachineState::LoggedIn => AuthState::LoggedIn,
            AuthMachineState::Reauthenticating => AuthState::Reauthenticating,
            AuthMachineState::LoggingOut => AuthState::LoggingOut,
        }
    }
}

/// Payload for auth state change events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    /// Current auth state.
    pub state: AuthState,
    /// User ID if logged in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// User email if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
