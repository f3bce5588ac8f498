//! Dashboard: profile snapshot and today's quest.
//!
//! Both are loaded together through an [`AsyncBinder`] keyed by identity.
//! Changing identity or tearing the dashboard down cancels a load in flight,
//! so a late answer never lands for the wrong user.

use std::sync::{Arc, Mutex, PoisonError};

use sidequest_core::{Profile, Quest};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::api::OnboardingApi;
use crate::binder::{AsyncBinder, BinderOptions};
use crate::error::ClientError;
use crate::identity::IdentityContext;

pub const NO_IDENTITY_MESSAGE: &str = "Pick a debug user to preview the daily quest.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load dashboard data.";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub profile: Profile,
    pub quest: Option<Quest>,
}

/// Label/value rows describing a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub rows: Vec<(&'static str, String)>,
}

impl ProfileSummary {
    #[must_use]
    pub fn new(profile: &Profile) -> Self {
        let onboarding = if profile.onboarding.completed {
            "Complete"
        } else {
            "In progress"
        };
        let location = profile
            .location
            .as_ref()
            .map_or_else(|| "Unset".to_string(), |location| location.label());
        let notifications = if profile.webpush_registered {
            "Registered"
        } else {
            "Not configured"
        };

        Self {
            rows: vec![
                ("Username", profile.username.clone()),
                ("Display name", profile.display_label().to_string()),
                ("Onboarding", onboarding.to_string()),
                ("Default location", location),
                ("Notifications", notifications.to_string()),
                ("Privacy mode", profile.privacy.label().to_string()),
                ("Quest focus", profile.quest_preferences.categories_label()),
            ],
        }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(row, _)| *row == label)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub loading: bool,
    /// Banner message: a load failure, or a prompt when no identity is set.
    pub error: Option<String>,
    pub profile: Option<ProfileSummary>,
    pub quest: Option<Quest>,
}

pub struct Dashboard {
    identity: Arc<IdentityContext>,
    binder: AsyncBinder<DashboardData, ClientError>,
    cancel: Mutex<CancellationToken>,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("binder", &self.binder)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    #[must_use]
    pub fn new(api: Arc<dyn OnboardingApi>, identity: Arc<IdentityContext>) -> Self {
        let binder = AsyncBinder::new(
            move || {
                let api = api.clone();
                async move {
                    let (profile, quest) =
                        tokio::try_join!(api.profile(), api.quest_of_the_day())?;
                    Ok(DashboardData { profile, quest })
                }
            },
            BinderOptions { immediate: true },
        );
        Self {
            identity,
            binder,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Load for the current identity if it changed since the last load.
    ///
    /// Returns `None` when nothing ran or the run was cancelled.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Option<Result<DashboardData, Arc<ClientError>>> {
        let token = self.renew_token();
        let Some(identity) = self.identity.get() else {
            self.binder.reset();
            return None;
        };
        let result = self
            .binder
            .set_deps_until(vec![identity.into_inner()], &token)
            .await;
        log_failure(result.as_ref());
        result
    }

    /// Reload regardless of identity changes.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Option<Result<DashboardData, Arc<ClientError>>> {
        let token = self.renew_token();
        if self.identity.get().is_none() {
            self.binder.reset();
            return None;
        }
        let result = self.binder.execute_until(&token).await;
        log_failure(result.as_ref());
        result
    }

    /// Cancel any load in flight.
    pub fn teardown(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    #[must_use]
    pub fn view(&self) -> DashboardView {
        if self.identity.get().is_none() {
            return DashboardView {
                loading: false,
                error: Some(NO_IDENTITY_MESSAGE.to_string()),
                profile: None,
                quest: None,
            };
        }

        let snapshot = self.binder.snapshot();
        let error = snapshot.error.as_deref().map(|e| {
            let message = e.user_message();
            if message.trim().is_empty() {
                LOAD_FAILED_MESSAGE.to_string()
            } else {
                message
            }
        });
        let (profile, quest) = snapshot.data.map_or((None, None), |data| {
            (Some(ProfileSummary::new(&data.profile)), data.quest)
        });

        DashboardView {
            loading: snapshot.loading,
            error,
            profile,
            quest,
        }
    }

    fn renew_token(&self) -> CancellationToken {
        let mut current = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }
}

fn log_failure(result: Option<&Result<DashboardData, Arc<ClientError>>>) {
    if let Some(Err(e)) = result {
        warn!(error = %e, "Failed to load dashboard data");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use sidequest_core::{Privacy, SavedLocation};

    use super::*;
    use crate::gateway::{GatewayError, UNAUTHENTICATED_MESSAGE, UNREACHABLE_MESSAGE};
    use crate::identity::MemoryIdentityStore;
    use crate::testing::{FakeApi, Op, sample_quest};

    fn setup(identity: Option<&str>) -> (Arc<FakeApi>, Arc<IdentityContext>, Arc<Dashboard>) {
        let api = Arc::new(FakeApi::new());
        let identity = Arc::new(IdentityContext::load(MemoryIdentityStore::new(identity)));
        let dashboard = Arc::new(Dashboard::new(api.clone(), identity.clone()));
        (api, identity, dashboard)
    }

    #[test]
    fn test_profile_summary_rows() {
        let api = FakeApi::new();
        api.edit_profile(|profile| {
            profile.display_name = Some(String::new());
            profile.location = Some(SavedLocation {
                lat: 45.512_34,
                lon: -122.658_76,
                name: None,
                radius_km: None,
                source: None,
                precision_m: None,
            });
            profile.privacy = Privacy::FriendsOnly;
            profile.quest_preferences.categories = ["outdoor", "art"].map(String::from).into();
        });
        let summary = ProfileSummary::new(&api.stored_profile());

        assert_eq!(summary.get("Display name"), Some("explorer"));
        assert_eq!(summary.get("Onboarding"), Some("In progress"));
        assert_eq!(summary.get("Default location"), Some("45.512, -122.659"));
        assert_eq!(summary.get("Notifications"), Some("Not configured"));
        assert_eq!(summary.get("Privacy mode"), Some("Friends only"));
        assert_eq!(summary.get("Quest focus"), Some("Art, Outdoor"));
    }

    #[tokio::test]
    async fn test_no_identity_shows_prompt_without_calls() {
        let (api, _, dashboard) = setup(None);
        assert!(dashboard.sync().await.is_none());
        assert!(api.calls().is_empty());
        assert_eq!(
            dashboard.view().error.as_deref(),
            Some(NO_IDENTITY_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_loads_profile_and_quest() {
        let (api, _, dashboard) = setup(Some("walker"));
        api.set_quest(Some(sample_quest()));

        let data = dashboard.sync().await.unwrap().unwrap();
        assert_eq!(data.quest.unwrap().title, "Sketch a doorway");

        let view = dashboard.view();
        assert!(!view.loading);
        assert!(view.error.is_none());
        assert_eq!(view.profile.unwrap().get("Username"), Some("explorer"));

        // Same identity, no reload.
        api.clear_calls();
        assert!(dashboard.sync().await.is_none());
        assert!(api.calls().is_empty());

        dashboard.refresh().await.unwrap().unwrap();
        assert_eq!(api.calls_to("GET /quests/today"), 1);
    }

    #[tokio::test]
    async fn test_failure_messages() {
        let (api, _, dashboard) = setup(Some("walker"));
        api.fail_next_http(Op::Profile, 401, "Authentication required");
        assert!(dashboard.sync().await.unwrap().is_err());
        assert_eq!(dashboard.view().error.as_deref(), Some(UNAUTHENTICATED_MESSAGE));

        api.fail_next(Op::Quest, GatewayError::Timeout { timeout_ms: 15_000 });
        assert!(dashboard.refresh().await.unwrap().is_err());
        assert_eq!(dashboard.view().error.as_deref(), Some(UNREACHABLE_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_change_cancels_load_in_flight() {
        let (api, identity, dashboard) = setup(Some("walker"));
        api.delay_next(Op::Profile, Duration::from_secs(2));

        let pending = tokio::spawn({
            let dashboard = dashboard.clone();
            async move { dashboard.sync().await }
        });
        tokio::task::yield_now().await;
        assert!(dashboard.view().loading);

        identity.set("rover");
        let fresh = dashboard.sync().await.unwrap().unwrap();
        assert_eq!(fresh.profile.username, "explorer");
        assert!(pending.await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels() {
        let (api, _, dashboard) = setup(Some("walker"));
        api.delay_next(Op::Quest, Duration::from_secs(2));

        let pending = tokio::spawn({
            let dashboard = dashboard.clone();
            async move { dashboard.sync().await }
        });
        tokio::task::yield_now().await;
        dashboard.teardown();

        assert!(pending.await.unwrap().is_none());
        let view = dashboard.view();
        assert!(!view.loading);
        assert!(view.profile.is_none());
    }
}
