//! Step 4: wrap up.

use sidequest_core::StepId;
use tokio::sync::watch;
use tracing::instrument;

use super::{ActionOutcome, CardScope, CompleteOptions, Feedback, StepCompleter};

const FINISHED_MESSAGE: &str = "Onboarding marked complete—nice work!";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionCardState {
    pub finishing: bool,
    pub feedback: Option<Feedback>,
}

pub struct CompletionCard {
    completer: StepCompleter,
    scope: CardScope,
    state: watch::Sender<CompletionCardState>,
}

impl std::fmt::Debug for CompletionCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionCard")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CompletionCard {
    #[must_use]
    pub fn new(completer: StepCompleter) -> Self {
        let (state, _) = watch::channel(CompletionCardState::default());
        Self {
            completer,
            scope: CardScope::new(),
            state,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CompletionCardState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CompletionCardState> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn scope(&self) -> &CardScope {
        &self.scope
    }

    /// Whether the server reports onboarding as complete.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.completer
            .resolver()
            .snapshot()
            .status
            .is_some_and(|status| status.completed)
    }

    #[must_use]
    pub fn can_finish(&self) -> bool {
        !self.state.borrow().finishing && !self.completed()
    }

    #[must_use]
    pub fn button_label(&self) -> &'static str {
        if self.completed() {
            "Onboarding complete"
        } else if self.state.borrow().finishing {
            "Marking complete…"
        } else {
            "Mark onboarding complete"
        }
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    #[instrument(skip(self))]
    pub async fn finish(&self) -> ActionOutcome {
        if !self.can_finish() {
            return ActionOutcome::Disabled;
        }
        self.state.send_modify(|state| {
            state.finishing = true;
            state.feedback = None;
        });

        let result = self
            .completer
            .complete(&StepId::Complete, CompleteOptions::default())
            .await;
        if !self.scope.is_active() {
            return ActionOutcome::Detached;
        }

        let (outcome, feedback) = match result {
            Ok(_) => (ActionOutcome::Succeeded, Feedback::success(FINISHED_MESSAGE)),
            Err(e) => (ActionOutcome::Failed, Feedback::from_error(&e)),
        };
        self.state.send_modify(|state| {
            state.finishing = false;
            state.feedback = Some(feedback);
        });
        outcome
    }
}
