//! Onboarding step cards.
//!
//! Each card owns a private draft and reports user-visible results through a
//! [`Feedback`] line. Cards never write step completion themselves: after a
//! successful save they go through the shared [`StepCompleter`], which posts
//! the step and refreshes the [`StatusResolver`] that all cards render from.
//!
//! Every card holds a [`CardScope`]. Once the card is unmounted, pending
//! actions stop touching card state after their next suspension point.

pub mod completion;
pub mod location;
pub mod notifications;
pub mod preferences;

use std::sync::Arc;

use sidequest_core::StepId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::api::OnboardingApi;
use crate::error::ClientError;
use crate::resolver::{RefreshOutcome, StatusResolver};

pub use completion::{CompletionCard, CompletionCardState};
pub use location::{LocationCard, LocationCardState};
pub use notifications::{NotificationsCard, NotificationsCardState};
pub use preferences::{PreferencesCard, PreferencesCardState, PreferencesDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
}

/// A message shown under a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub tone: Tone,
    pub message: String,
}

impl Feedback {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn from_error(error: &ClientError) -> Self {
        Self::error(error.user_message())
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// How a card action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    /// Failed; the card's feedback holds the reason.
    Failed,
    /// Not started because the action is currently disabled.
    Disabled,
    /// The card was unmounted while the action was pending.
    Detached,
}

/// Exit flag for a mounted card.
#[derive(Debug, Clone, Default)]
pub struct CardScope {
    token: CancellationToken,
}

impl CardScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn unmount(&self) {
        self.token.cancel();
    }

    /// Resolves once the card is unmounted.
    pub async fn unmounted(&self) {
        self.token.cancelled().await;
    }
}

/// Options for [`StepCompleter::complete`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompleteOptions {
    /// Only refresh; do not post the step.
    pub skip_call: bool,
}

/// Marks a step done on the server and reloads the shared snapshot.
#[derive(Clone)]
pub struct StepCompleter {
    api: Arc<dyn OnboardingApi>,
    resolver: Arc<StatusResolver>,
}

impl std::fmt::Debug for StepCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepCompleter")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl StepCompleter {
    #[must_use]
    pub fn new(api: Arc<dyn OnboardingApi>, resolver: Arc<StatusResolver>) -> Self {
        Self { api, resolver }
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn OnboardingApi> {
        &self.api
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<StatusResolver> {
        &self.resolver
    }

    /// Post `step` unless skipped, then refresh.
    ///
    /// # Errors
    ///
    /// Returns the error of the complete-step call. Refresh failures are
    /// published by the resolver instead.
    #[instrument(skip(self), fields(step = %step))]
    pub async fn complete(
        &self,
        step: &StepId,
        options: CompleteOptions,
    ) -> Result<RefreshOutcome, ClientError> {
        if !options.skip_call {
            self.api.complete_step(step).await?;
        }
        let outcome = self.resolver.refresh().await;
        debug!(?outcome, "Step completion refreshed");
        Ok(outcome)
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.resolver.refresh().await
    }
}
