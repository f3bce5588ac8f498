//! Onboarding status resolver.
//!
//! Fetches onboarding status and profile together and publishes the pair as
//! the snapshot every step card renders from. Each refresh takes a new
//! generation number; a result that comes back after a newer refresh started
//! is dropped, so the latest request always wins regardless of arrival order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sidequest_core::{Identity, OnboardingStatus, Profile};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::OnboardingApi;
use crate::error::ClientError;
use crate::identity::IdentityContext;

/// Shown when a failure carries no usable message.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load onboarding status.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolverPhase {
    /// No identity; nothing loaded.
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// What every card sees.
#[derive(Debug, Clone, Default)]
pub struct ResolverSnapshot {
    pub phase: ResolverPhase,
    /// Identity the data below belongs to.
    pub identity: Option<Identity>,
    pub status: Option<OnboardingStatus>,
    pub profile: Option<Profile>,
    /// User-facing message of the last failed load.
    pub error: Option<String>,
    /// The last load was rejected with 401.
    pub unauthenticated: bool,
    /// Generation of the refresh that produced this snapshot.
    pub generation: u64,
}

impl ResolverSnapshot {
    /// Loading while previous data is still displayed.
    #[must_use]
    pub const fn is_refreshing(&self) -> bool {
        matches!(self.phase, ResolverPhase::Loading) && self.status.is_some()
    }
}

/// Result of a single [`StatusResolver::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fresh data was published.
    Applied,
    /// A newer refresh started before this one finished; its result was dropped.
    Superseded,
    /// The load failed and the error was published.
    Failed,
    /// No identity is set, so nothing was fetched.
    Skipped,
}

pub struct StatusResolver {
    api: Arc<dyn OnboardingApi>,
    identity: Arc<IdentityContext>,
    generation: AtomicU64,
    state: watch::Sender<ResolverSnapshot>,
}

impl std::fmt::Debug for StatusResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusResolver")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("phase", &self.state.borrow().phase)
            .finish_non_exhaustive()
    }
}

impl StatusResolver {
    #[must_use]
    pub fn new(api: Arc<dyn OnboardingApi>, identity: Arc<IdentityContext>) -> Self {
        let (state, _) = watch::channel(ResolverSnapshot::default());
        Self {
            api,
            identity,
            generation: AtomicU64::new(0),
            state,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ResolverSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResolverSnapshot> {
        self.state.subscribe()
    }

    /// Number of live snapshot subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Latest generation handed out.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop whatever is in flight without starting a new load.
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Load status and profile for the current identity.
    ///
    /// Never fails: errors are published in the snapshot. Data already shown
    /// for the same identity stays visible while loading and after a failure.
    /// Without an identity the resolver goes idle, clears its data and makes
    /// no call.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = self.invalidate();

        let Some(identity) = self.identity.get() else {
            debug!(generation, "No identity, resolver idle");
            self.state.send_replace(ResolverSnapshot {
                generation,
                ..ResolverSnapshot::default()
            });
            return RefreshOutcome::Skipped;
        };

        self.state.send_modify(|state| {
            if state.identity.as_ref() != Some(&identity) {
                state.status = None;
                state.profile = None;
                state.identity = Some(identity.clone());
            }
            state.phase = ResolverPhase::Loading;
            state.error = None;
            state.unauthenticated = false;
            state.generation = generation;
        });

        let result = tokio::try_join!(self.api.onboarding_status(), self.api.profile());

        let mut outcome = RefreshOutcome::Superseded;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            outcome = match &result {
                Ok((status, profile)) => {
                    state.status = Some(status.clone());
                    state.profile = Some(profile.clone());
                    state.phase = ResolverPhase::Ready;
                    RefreshOutcome::Applied
                }
                Err(e) => {
                    state.error = Some(failure_message(e));
                    state.unauthenticated = e.is_unauthorized();
                    state.phase = ResolverPhase::Error;
                    RefreshOutcome::Failed
                }
            };
            true
        });

        match (&outcome, &result) {
            (RefreshOutcome::Superseded, _) => {
                debug!(generation, "Discarding superseded onboarding status");
            }
            (_, Err(e)) => warn!(generation, error = %e, "Failed to load onboarding status"),
            _ => info!(generation, "Onboarding status loaded"),
        }
        outcome
    }
}

fn failure_message(error: &ClientError) -> String {
    let message = error.user_message();
    if message.trim().is_empty() {
        LOAD_FAILED_MESSAGE.to_string()
    } else {
        message
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use sidequest_core::{LocationSource, SavedLocation, StepId};

    use super::*;
    use crate::gateway::{GatewayError, UNAUTHENTICATED_MESSAGE, UNREACHABLE_MESSAGE};
    use crate::identity::MemoryIdentityStore;
    use crate::testing::{FakeApi, Op};

    fn setup(identity: Option<&str>) -> (Arc<FakeApi>, Arc<IdentityContext>, Arc<StatusResolver>) {
        let api = Arc::new(FakeApi::new());
        let identity = Arc::new(IdentityContext::load(MemoryIdentityStore::new(identity)));
        let resolver = Arc::new(StatusResolver::new(api.clone(), identity.clone()));
        (api, identity, resolver)
    }

    fn portland() -> SavedLocation {
        SavedLocation {
            lat: 45.5,
            lon: -122.6,
            name: Some("Portland".to_string()),
            radius_km: Some(5.0),
            source: Some(LocationSource::Geocode),
            precision_m: None,
        }
    }

    #[tokio::test]
    async fn test_no_identity_makes_no_calls() {
        let (api, _, resolver) = setup(None);

        assert_eq!(resolver.refresh().await, RefreshOutcome::Skipped);
        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.phase, ResolverPhase::Idle);
        assert!(snapshot.status.is_none());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_loads_status_and_profile() {
        let (api, _, resolver) = setup(Some("walker"));

        assert_eq!(resolver.refresh().await, RefreshOutcome::Applied);
        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.phase, ResolverPhase::Ready);
        assert_eq!(snapshot.identity.unwrap().as_str(), "walker");
        assert_eq!(snapshot.status.unwrap().steps.len(), 4);
        assert_eq!(snapshot.profile.unwrap().username, "explorer");
        assert_eq!(api.calls_to("GET /me/onboarding/status"), 1);
        assert_eq!(api.calls_to("GET /me"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_generation_wins_out_of_order() {
        let (api, _, resolver) = setup(Some("walker"));

        api.delay_next(Op::Status, Duration::from_millis(500));
        api.delay_next(Op::Profile, Duration::from_millis(500));
        let slow = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.refresh().await }
        });
        tokio::task::yield_now().await;

        // Another client saves a location between the two requests.
        api.edit_profile(|profile| profile.location = Some(portland()));

        api.delay_next(Op::Status, Duration::from_millis(100));
        api.delay_next(Op::Profile, Duration::from_millis(100));
        let fast = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.refresh().await }
        });

        assert_eq!(fast.await.unwrap(), RefreshOutcome::Applied);
        assert_eq!(slow.await.unwrap(), RefreshOutcome::Superseded);

        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.generation, 2);
        assert!(snapshot.status.unwrap().is_step_completed(&StepId::Location));
        assert!(snapshot.profile.unwrap().location.is_some());
    }

    #[tokio::test]
    async fn test_unauthorized_is_flagged() {
        let (api, _, resolver) = setup(Some("walker"));
        api.fail_next_http(Op::Status, 401, "Authentication required");

        assert_eq!(resolver.refresh().await, RefreshOutcome::Failed);
        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.phase, ResolverPhase::Error);
        assert!(snapshot.unauthenticated);
        assert_eq!(snapshot.error.as_deref(), Some(UNAUTHENTICATED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_leaves_loading_and_keeps_data() {
        let (api, _, resolver) = setup(Some("walker"));
        resolver.refresh().await;

        api.delay_next(Op::Profile, Duration::from_secs(10));
        api.fail_next(Op::Profile, GatewayError::Timeout { timeout_ms: 10_000 });

        let started = tokio::time::Instant::now();
        assert_eq!(resolver.refresh().await, RefreshOutcome::Failed);
        assert!(started.elapsed() <= Duration::from_millis(10_050));

        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.phase, ResolverPhase::Error);
        assert!(!snapshot.unauthenticated);
        assert_eq!(snapshot.error.as_deref(), Some(UNREACHABLE_MESSAGE));
        assert!(snapshot.status.is_some());
        assert!(snapshot.profile.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_data_visible() {
        let (api, _, resolver) = setup(Some("walker"));
        resolver.refresh().await;

        api.delay_next(Op::Status, Duration::from_millis(200));
        let mut receiver = resolver.subscribe();
        let pending = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.refresh().await }
        });

        receiver.changed().await.unwrap();
        let loading = receiver.borrow_and_update().clone();
        assert!(loading.is_refreshing());
        assert!(loading.profile.is_some());

        assert_eq!(pending.await.unwrap(), RefreshOutcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_identity_drops_in_flight_result() {
        let (api, identity, resolver) = setup(Some("walker"));

        api.delay_next(Op::Status, Duration::from_millis(300));
        let pending = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.refresh().await }
        });
        tokio::task::yield_now().await;

        identity.clear();
        assert_eq!(resolver.refresh().await, RefreshOutcome::Skipped);
        assert_eq!(pending.await.unwrap(), RefreshOutcome::Superseded);

        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.phase, ResolverPhase::Idle);
        assert!(snapshot.status.is_none());
        assert!(snapshot.profile.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_switch_clears_previous_data() {
        let (api, identity, resolver) = setup(Some("walker"));
        resolver.refresh().await;

        identity.set("rover");
        api.delay_next(Op::Status, Duration::from_millis(200));
        let pending = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.refresh().await }
        });
        tokio::task::yield_now().await;

        let loading = resolver.snapshot();
        assert_eq!(loading.phase, ResolverPhase::Loading);
        assert_eq!(loading.identity.as_ref().unwrap().as_str(), "rover");
        assert!(loading.profile.is_none());
        assert!(!loading.is_refreshing());

        assert_eq!(pending.await.unwrap(), RefreshOutcome::Applied);
        assert_eq!(resolver.snapshot().phase, ResolverPhase::Ready);
    }
}
