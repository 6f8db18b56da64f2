//! Bounded polling loop that attaches the sign-in widget to a container.
//!
//! The provider library loads asynchronously and the container may be laid
//! out late, so the loop re-checks at a fixed interval up to a fixed number
//! of attempts. It runs as a spawned task owned by a [`WidgetAttachHandle`].

use crate::session::SessionManager;
use sessionkit_config::WidgetSettings;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Poll interval and attempt budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetAttachConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for WidgetAttachConfig {
    fn default() -> Self {
        Self::from(&WidgetSettings::default())
    }
}

impl From<&WidgetSettings> for WidgetAttachConfig {
    fn from(settings: &WidgetSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            max_attempts: settings.max_attempts.max(1),
        }
    }
}

/// How an attach request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Widget initialized and rendered on the given attempt.
    Rendered { attempts: u32 },
    /// A session exists, so no widget is needed.
    AlreadyAuthenticated,
    /// Client id is empty or still the placeholder.
    NotConfigured,
    /// The container element does not exist.
    ContainerMissing,
    /// Library never loaded or container never became visible.
    Exhausted { attempts: u32 },
    /// Handle cancelled or dropped, or manager dropped, before any other outcome.
    Cancelled,
}

impl AttachOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, AttachOutcome::Rendered { .. })
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachStep {
    Done(AttachOutcome),
    NotReady,
}

enum HandleState {
    Finished(AttachOutcome),
    Running {
        shutdown_tx: Option<oneshot::Sender<()>>,
        task: JoinHandle<AttachOutcome>,
    },
}

/// Owns a pending attach request.
///
/// Dropping the handle tears the poll down, so keep it alive for as long as
/// the hosting view exists. A rendered widget is unaffected by the drop.
#[must_use = "dropping the handle cancels the attach request"]
pub struct WidgetAttachHandle {
    state: HandleState,
}

impl WidgetAttachHandle {
    pub(crate) fn finished(outcome: AttachOutcome) -> Self {
        Self {
            state: HandleState::Finished(outcome),
        }
    }

    pub(crate) fn running(shutdown_tx: oneshot::Sender<()>, task: JoinHandle<AttachOutcome>) -> Self {
        Self {
            state: HandleState::Running {
                shutdown_tx: Some(shutdown_tx),
                task,
            },
        }
    }

    /// Stop polling. The outcome becomes [`AttachOutcome::Cancelled`] unless
    /// the loop already finished.
    pub fn cancel(&mut self) {
        if let HandleState::Running { shutdown_tx, .. } = &mut self.state {
            if let Some(tx) = shutdown_tx.take() {
                let _ = tx.send(());
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Finished(_) => true,
            HandleState::Running { task, .. } => task.is_finished(),
        }
    }

    /// Wait for the loop to end.
    pub async fn outcome(self) -> AttachOutcome {
        match self.state {
            HandleState::Finished(outcome) => outcome,
            HandleState::Running { shutdown_tx, task } => {
                let outcome = task.await.unwrap_or(AttachOutcome::Cancelled);
                drop(shutdown_tx);
                outcome
            }
        }
    }
}

/// Run attempts until one is terminal or the budget is spent.
pub(crate) async fn run_attach_loop(
    manager: Weak<SessionManager>,
    container_id: String,
    config: WidgetAttachConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> AttachOutcome {
    let mut attempts = 0;

    loop {
        attempts += 1;

        // Never hold the manager across the sleep.
        let step = match manager.upgrade() {
            Some(manager) => manager.attach_step(&container_id, attempts),
            None => {
                debug!(container_id = %container_id, "Session manager dropped, stopping widget attach");
                return AttachOutcome::Cancelled;
            }
        };

        if let AttachStep::Done(outcome) = step {
            return outcome;
        }

        if attempts >= config.max_attempts {
            error!(
                container_id = %container_id,
                attempts,
                "Sign-in widget could not be attached, giving up"
            );
            return AttachOutcome::Exhausted { attempts };
        }

        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!(container_id = %container_id, attempts, "Widget attach cancelled");
                return AttachOutcome::Cancelled;
            }
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}
