//! Onboarding page: identity, resolver, step cards and welcome gate wired
//! together.

use std::sync::{Arc, Mutex, PoisonError};

use sidequest_core::{Identity, OnboardingStatus, Profile};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::api::OnboardingApi;
use crate::identity::IdentityContext;
use crate::location::{GeolocationProvider, LocationPipeline};
use crate::resolver::{RefreshOutcome, ResolverPhase, StatusResolver};
use crate::steps::{
    CardScope, CompletionCard, LocationCard, NotificationsCard, PreferencesCard, StepCompleter,
};
use crate::welcome::WelcomeGate;

pub const NO_IDENTITY_MESSAGE: &str = "Add a debug identity to configure onboarding.";

/// Everything the page shows above the cards.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub identity: Option<Identity>,
    /// Shown instead of the cards when no identity is set.
    pub notice: Option<&'static str>,
    pub loading: bool,
    pub error: Option<String>,
    pub unauthenticated: bool,
    pub badges: Vec<String>,
    pub show_welcome: bool,
    pub status: Option<OnboardingStatus>,
    pub profile: Option<Profile>,
}

pub struct OnboardingPage {
    identity: Arc<IdentityContext>,
    resolver: Arc<StatusResolver>,
    welcome: WelcomeGate,
    location: LocationCard,
    preferences: PreferencesCard,
    notifications: NotificationsCard,
    completion: CompletionCard,
    scope: CardScope,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for OnboardingPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingPage")
            .field("resolver", &self.resolver)
            .field("welcome", &self.welcome)
            .finish_non_exhaustive()
    }
}

impl OnboardingPage {
    #[must_use]
    pub fn new(
        api: Arc<dyn OnboardingApi>,
        identity: Arc<IdentityContext>,
        geolocation: Arc<dyn GeolocationProvider>,
        default_radius_km: f64,
    ) -> Self {
        let resolver = Arc::new(StatusResolver::new(api.clone(), identity.clone()));
        let completer = StepCompleter::new(api.clone(), resolver.clone());
        let pipeline = LocationPipeline::new(api, geolocation);

        Self {
            identity,
            welcome: WelcomeGate::new(),
            location: LocationCard::new(pipeline, completer.clone(), default_radius_km),
            preferences: PreferencesCard::new(completer.clone(), None),
            notifications: NotificationsCard::new(completer.clone()),
            completion: CompletionCard::new(completer),
            resolver,
            scope: CardScope::new(),
            follower: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &Arc<StatusResolver> {
        &self.resolver
    }

    #[must_use]
    pub const fn location(&self) -> &LocationCard {
        &self.location
    }

    #[must_use]
    pub const fn preferences(&self) -> &PreferencesCard {
        &self.preferences
    }

    #[must_use]
    pub const fn notifications(&self) -> &NotificationsCard {
        &self.notifications
    }

    #[must_use]
    pub const fn completion(&self) -> &CompletionCard {
        &self.completion
    }

    /// Start following the profile and load the first snapshot. Mounting
    /// again only reloads.
    #[instrument(skip(self))]
    pub async fn mount(&self) -> RefreshOutcome {
        {
            let mut follower = self.follower.lock().unwrap_or_else(PoisonError::into_inner);
            if follower.as_ref().is_none_or(JoinHandle::is_finished) {
                *follower = Some(self.preferences.follow_profile(self.resolver.subscribe()));
            }
        }

        let outcome = self.refresh().await;
        if let Some(radius_km) = self
            .resolver
            .snapshot()
            .profile
            .and_then(|profile| profile.location)
            .and_then(|location| location.radius_km)
        {
            self.location.set_radius(radius_km);
        }
        outcome
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let outcome = self.resolver.refresh().await;
        self.welcome
            .observe(self.resolver.snapshot().status.as_ref());
        outcome
    }

    /// Re-evaluate after the identity changed.
    #[instrument(skip(self))]
    pub async fn identity_changed(&self) -> RefreshOutcome {
        let identity = self.identity.get();
        info!(
            identity = identity.as_ref().map(Identity::as_str),
            "Reloading onboarding for new identity"
        );
        self.welcome.reset();
        self.refresh().await
    }

    /// Reload whenever the identity changes, until unmounted.
    pub fn watch_identity(self: &Arc<Self>) -> JoinHandle<()> {
        let page = Arc::clone(self);
        let mut identities = self.identity.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = page.scope.unmounted() => break,
                    changed = identities.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                page.identity_changed().await;
            }
            debug!("Identity watcher stopped");
        })
    }

    /// "Start with location"
    pub fn start(&self) {
        self.welcome.dismiss();
    }

    /// "Jump to steps"
    pub fn skip_welcome(&self) {
        self.welcome.dismiss();
    }

    #[must_use]
    pub fn view(&self) -> PageView {
        let snapshot = self.resolver.snapshot();
        let identity = self.identity.get();
        let notice = identity.is_none().then_some(NO_IDENTITY_MESSAGE);

        PageView {
            notice,
            loading: snapshot.phase == ResolverPhase::Loading,
            error: snapshot.error.clone(),
            unauthenticated: snapshot.unauthenticated,
            badges: snapshot
                .status
                .as_ref()
                .map(OnboardingStatus::badges)
                .unwrap_or_default(),
            show_welcome: identity.is_some() && self.welcome.should_show(snapshot.status.as_ref()),
            identity,
            status: snapshot.status,
            profile: snapshot.profile,
        }
    }

    /// Detach every card, drop in-flight loads and stop background tasks.
    pub fn unmount(&self) {
        self.scope.unmount();
        self.location.unmount();
        self.preferences.unmount();
        self.notifications.unmount();
        self.completion.unmount();
        self.resolver.invalidate();
        if let Some(follower) = self
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            follower.abort();
        }
    }
}
