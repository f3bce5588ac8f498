//! First-run welcome panel.

use std::sync::atomic::{AtomicBool, Ordering};

use sidequest_core::OnboardingStatus;

/// Whether to show the welcome panel.
///
/// Only for a user who has steps to do, has finished none of them, and has
/// not dismissed the panel.
#[must_use]
pub fn should_show_welcome(status: Option<&OnboardingStatus>, dismissed: bool) -> bool {
    status.is_some_and(|status| !status.steps.is_empty() && !status.any_completed()) && !dismissed
}

/// Tracks dismissal of the welcome panel for one identity session.
#[derive(Debug, Default)]
pub struct WelcomeGate {
    dismissed: AtomicBool,
}

impl WelcomeGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_dismissed(&self) -> bool {
        self.dismissed.load(Ordering::SeqCst)
    }

    /// Hide the panel. Both "start with location" and "jump to steps" land here.
    pub fn dismiss(&self) {
        self.dismissed.store(true, Ordering::SeqCst);
    }

    /// Once any step is completed the panel stays hidden for the session.
    pub fn observe(&self, status: Option<&OnboardingStatus>) {
        if status.is_some_and(OnboardingStatus::any_completed) {
            self.dismiss();
        }
    }

    /// Start over for a new identity.
    pub fn reset(&self) {
        self.dismissed.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn should_show(&self, status: Option<&OnboardingStatus>) -> bool {
        self.observe(status);
        should_show_welcome(status, self.is_dismissed())
    }
}
