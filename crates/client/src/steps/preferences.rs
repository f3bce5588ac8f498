//! Step 2: quest style and privacy.

use std::collections::BTreeSet;

use sidequest_core::{
    PreferencesUpdate, PreferredTime, Privacy, Profile, QuestPreferences, SpendLevel, StepId,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use super::{ActionOutcome, CardScope, CompleteOptions, Feedback, StepCompleter};
use crate::error::ClientError;
use crate::resolver::{ResolverPhase, ResolverSnapshot};

const SAVED_MESSAGE: &str = "Preferences updated.";

/// Unsaved preference edits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferencesDraft {
    pub categories: BTreeSet<String>,
    pub preferred_time: PreferredTime,
    pub spend_level: SpendLevel,
    pub privacy: Privacy,
}

impl From<&Profile> for PreferencesDraft {
    fn from(profile: &Profile) -> Self {
        let preferences = &profile.quest_preferences;
        Self {
            categories: preferences.categories.clone(),
            preferred_time: preferences.preferred_time,
            spend_level: preferences.spend_level,
            privacy: profile.privacy,
        }
    }
}

impl PreferencesDraft {
    #[must_use]
    pub fn to_update(&self) -> PreferencesUpdate {
        PreferencesUpdate {
            quest_preferences: QuestPreferences {
                categories: self.categories.clone(),
                preferred_time: self.preferred_time,
                spend_level: self.spend_level,
            },
            privacy: self.privacy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferencesCardState {
    pub draft: PreferencesDraft,
    pub saving: bool,
    pub feedback: Option<Feedback>,
}

pub struct PreferencesCard {
    completer: StepCompleter,
    scope: CardScope,
    state: watch::Sender<PreferencesCardState>,
}

impl std::fmt::Debug for PreferencesCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferencesCard")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl PreferencesCard {
    #[must_use]
    pub fn new(completer: StepCompleter, profile: Option<&Profile>) -> Self {
        let (state, _) = watch::channel(PreferencesCardState {
            draft: profile.map(PreferencesDraft::from).unwrap_or_default(),
            ..PreferencesCardState::default()
        });
        Self {
            completer,
            scope: CardScope::new(),
            state,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> PreferencesCardState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PreferencesCardState> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn scope(&self) -> &CardScope {
        &self.scope
    }

    /// Replace the draft with what the profile holds.
    pub fn sync_from_profile(&self, profile: Option<&Profile>) {
        let draft = profile.map(PreferencesDraft::from).unwrap_or_default();
        self.state.send_modify(|state| state.draft = draft);
    }

    /// Reset the draft to every profile the resolver publishes, until the
    /// card is unmounted. Unsaved edits are discarded even when the
    /// refreshed profile is unchanged.
    pub fn follow_profile(&self, mut snapshots: watch::Receiver<ResolverSnapshot>) -> JoinHandle<()> {
        let state = self.state.clone();
        let scope = self.scope.clone();
        let mut last = published_generation(&snapshots.borrow_and_update());
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = scope.unmounted() => break,
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let (generation, profile) = {
                    let snapshot = snapshots.borrow_and_update();
                    (published_generation(&snapshot), snapshot.profile.clone())
                };
                if generation.is_none() || generation == last {
                    continue;
                }
                debug!(?generation, "Profile published, resetting preferences draft");
                let draft = profile.as_ref().map(PreferencesDraft::from).unwrap_or_default();
                state.send_modify(|state| state.draft = draft);
                last = generation;
            }
        })
    }

    pub fn toggle_category(&self, id: &str) {
        self.state.send_modify(|state| {
            let categories = &mut state.draft.categories;
            if !categories.remove(id) {
                categories.insert(id.to_string());
            }
        });
    }

    pub fn set_preferred_time(&self, preferred_time: PreferredTime) {
        self.state
            .send_modify(|state| state.draft.preferred_time = preferred_time);
    }

    pub fn set_spend_level(&self, spend_level: SpendLevel) {
        self.state.send_modify(|state| state.draft.spend_level = spend_level);
    }

    pub fn set_privacy(&self, privacy: Privacy) {
        self.state.send_modify(|state| state.draft.privacy = privacy);
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    /// Write the draft in one request, then mark the step complete.
    #[instrument(skip(self))]
    pub async fn save(&self) -> ActionOutcome {
        let current = self.snapshot();
        if current.saving {
            return ActionOutcome::Disabled;
        }
        self.state.send_modify(|state| {
            state.saving = true;
            state.feedback = None;
        });

        let result = self.persist(&current.draft.to_update()).await;
        if !self.scope.is_active() {
            return ActionOutcome::Detached;
        }

        let (outcome, feedback) = match result {
            Ok(()) => (ActionOutcome::Succeeded, Feedback::success(SAVED_MESSAGE)),
            Err(e) => (ActionOutcome::Failed, Feedback::from_error(&e)),
        };
        self.state.send_modify(|state| {
            state.saving = false;
            state.feedback = Some(feedback);
        });
        outcome
    }

    async fn persist(&self, update: &PreferencesUpdate) -> Result<(), ClientError> {
        self.completer.api().update_preferences(update).await?;
        self.completer
            .complete(&StepId::Preferences, CompleteOptions::default())
            .await?;
        Ok(())
    }
}

/// Generation of a snapshot whose profile is settled, if any.
const fn published_generation(snapshot: &ResolverSnapshot) -> Option<u64> {
    match snapshot.phase {
        ResolverPhase::Ready | ResolverPhase::Idle => Some(snapshot.generation),
        ResolverPhase::Loading | ResolverPhase::Error => None,
    }
}
