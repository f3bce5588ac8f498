//! Step 3: quest pings.
//!
//! Push delivery is not wired up yet, so registration stores a simulated
//! subscription. Whether notifications count as registered is read from the
//! resolver's step list only.

use chrono::Utc;
use sidequest_core::{PushSubscription, StepId};
use tokio::sync::watch;
use tracing::instrument;

use super::{ActionOutcome, CardScope, CompleteOptions, Feedback, StepCompleter};
use crate::error::ClientError;

const REGISTERED_MESSAGE: &str =
    "Simulated push subscription saved. Replace with the real service worker when ready.";
const CLEARED_MESSAGE: &str = "Notification preference cleared.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationsCardState {
    pub working: bool,
    pub feedback: Option<Feedback>,
}

pub struct NotificationsCard {
    completer: StepCompleter,
    scope: CardScope,
    state: watch::Sender<NotificationsCardState>,
}

impl std::fmt::Debug for NotificationsCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationsCard")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl NotificationsCard {
    #[must_use]
    pub fn new(completer: StepCompleter) -> Self {
        let (state, _) = watch::channel(NotificationsCardState::default());
        Self {
            completer,
            scope: CardScope::new(),
            state,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> NotificationsCardState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NotificationsCardState> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn scope(&self) -> &CardScope {
        &self.scope
    }

    #[must_use]
    pub fn registered(&self) -> bool {
        self.completer
            .resolver()
            .snapshot()
            .status
            .is_some_and(|status| status.is_step_completed(&StepId::Notifications))
    }

    #[must_use]
    pub fn status_text(&self) -> &'static str {
        if self.registered() {
            "Notifications registered"
        } else {
            "Not registered yet"
        }
    }

    #[must_use]
    pub fn can_clear(&self) -> bool {
        !self.state.borrow().working && self.registered()
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    /// Store a simulated subscription and mark the step complete.
    #[instrument(skip(self))]
    pub async fn register(&self) -> ActionOutcome {
        if self.state.borrow().working {
            return ActionOutcome::Disabled;
        }
        self.begin();

        let subscription = PushSubscription::simulated(Utc::now().timestamp_millis());
        let result = self.persist(&subscription).await;
        self.finish(result, REGISTERED_MESSAGE)
    }

    /// Remove the subscription. Refreshes without posting a step.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> ActionOutcome {
        if !self.can_clear() {
            return ActionOutcome::Disabled;
        }
        self.begin();

        let result = async {
            self.completer.api().clear_notifications().await?;
            self.completer.refresh().await;
            Ok::<_, ClientError>(())
        }
        .await;
        self.finish(result, CLEARED_MESSAGE)
    }

    async fn persist(&self, subscription: &PushSubscription) -> Result<(), ClientError> {
        self.completer
            .api()
            .register_notifications(subscription)
            .await?;
        self.completer
            .complete(&StepId::Notifications, CompleteOptions::default())
            .await?;
        Ok(())
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.working = true;
            state.feedback = None;
        });
    }

    fn finish(&self, result: Result<(), ClientError>, success: &str) -> ActionOutcome {
        if !self.scope.is_active() {
            return ActionOutcome::Detached;
        }
        let (outcome, feedback) = match result {
            Ok(()) => (ActionOutcome::Succeeded, Feedback::success(success)),
            Err(e) => (ActionOutcome::Failed, Feedback::from_error(&e)),
        };
        self.state.send_modify(|state| {
            state.working = false;
            state.feedback = Some(feedback);
        });
        outcome
    }
}
