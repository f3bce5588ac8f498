//! Step 1: choose a home base.

use sidequest_core::{LocationCandidate, LocationUpdate, Profile, SavedLocation, StepId};
use tokio::sync::watch;
use tracing::{info, instrument};

use super::{ActionOutcome, CardScope, CompleteOptions, Feedback, StepCompleter};
use crate::error::{ClientError, ValidationError};
use crate::location::{LocationPipeline, candidate_update};

pub const MIN_RADIUS_KM: f64 = 1.0;
pub const MAX_RADIUS_KM: f64 = 30.0;

const SAVED_MESSAGE: &str = "Location saved successfully.";
const NO_MATCHES_MESSAGE: &str = "No matches found. Try a broader search.";

#[derive(Debug, Clone, PartialEq)]
pub struct LocationCardState {
    pub query: String,
    pub radius_km: f64,
    pub results: Vec<LocationCandidate>,
    pub searching: bool,
    pub saving: bool,
    pub locating: bool,
    pub feedback: Option<Feedback>,
}

pub struct LocationCard {
    pipeline: LocationPipeline,
    completer: StepCompleter,
    scope: CardScope,
    state: watch::Sender<LocationCardState>,
}

impl std::fmt::Debug for LocationCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationCard")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl LocationCard {
    #[must_use]
    pub fn new(pipeline: LocationPipeline, completer: StepCompleter, radius_km: f64) -> Self {
        let (state, _) = watch::channel(LocationCardState {
            query: String::new(),
            radius_km,
            results: Vec::new(),
            searching: false,
            saving: false,
            locating: false,
            feedback: None,
        });
        Self {
            pipeline,
            completer,
            scope: CardScope::new(),
            state,
        }
    }

    /// Card seeded with the radius from `profile`, falling back to `default_radius_km`.
    #[must_use]
    pub fn for_profile(
        pipeline: LocationPipeline,
        completer: StepCompleter,
        profile: Option<&Profile>,
        default_radius_km: f64,
    ) -> Self {
        let radius_km = profile
            .and_then(|profile| profile.location.as_ref())
            .and_then(|location| location.radius_km)
            .unwrap_or(default_radius_km);
        Self::new(pipeline, completer, radius_km)
    }

    #[must_use]
    pub fn snapshot(&self) -> LocationCardState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LocationCardState> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn scope(&self) -> &CardScope {
        &self.scope
    }

    /// The location currently saved on the profile.
    #[must_use]
    pub fn saved_location(&self) -> Option<SavedLocation> {
        self.completer
            .resolver()
            .snapshot()
            .profile
            .and_then(|profile| profile.location)
    }

    #[must_use]
    pub fn step_completed(&self) -> bool {
        self.completer
            .resolver()
            .snapshot()
            .status
            .is_some_and(|status| status.is_step_completed(&StepId::Location))
    }

    pub fn set_query(&self, query: &str) {
        self.state.send_modify(|state| state.query = query.to_string());
    }

    pub fn set_radius(&self, radius_km: f64) {
        self.state.send_modify(|state| state.radius_km = radius_km);
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    /// Forward geocode the current query.
    #[instrument(skip(self))]
    pub async fn search(&self) -> ActionOutcome {
        let current = self.snapshot();
        if current.searching {
            return ActionOutcome::Disabled;
        }
        if current.query.trim().is_empty() {
            self.set_feedback(Some(Feedback::info(
                ValidationError::EmptyQuery.to_string(),
            )));
            return ActionOutcome::Disabled;
        }

        self.state.send_modify(|state| {
            state.searching = true;
            state.feedback = None;
        });

        let result = self.pipeline.search(&current.query).await;
        if !self.scope.is_active() {
            return ActionOutcome::Detached;
        }

        let outcome = match result {
            Ok(results) => {
                let feedback = results
                    .is_empty()
                    .then(|| Feedback::info(NO_MATCHES_MESSAGE));
                self.state.send_modify(|state| {
                    state.results = results;
                    state.feedback = feedback;
                });
                ActionOutcome::Succeeded
            }
            Err(e) => {
                self.set_feedback(Some(Feedback::from_error(&e)));
                ActionOutcome::Failed
            }
        };
        self.state.send_modify(|state| state.searching = false);
        outcome
    }

    /// Save the search result at `index`.
    pub async fn select(&self, index: usize) -> ActionOutcome {
        let candidate = self.state.borrow().results.get(index).cloned();
        match candidate {
            Some(candidate) => self.apply_candidate(&candidate).await,
            None => {
                self.set_feedback(Some(Feedback::error(
                    ValidationError::NoSuchCandidate(index).to_string(),
                )));
                ActionOutcome::Failed
            }
        }
    }

    /// Save `candidate` as the home base.
    pub async fn apply_candidate(&self, candidate: &LocationCandidate) -> ActionOutcome {
        let current = self.snapshot();
        if current.saving {
            return ActionOutcome::Disabled;
        }
        let update = candidate_update(candidate, &current.query, current.radius_km);
        self.apply(update).await
    }

    /// Locate the device and save its position.
    #[instrument(skip(self))]
    pub async fn use_current_location(&self) -> ActionOutcome {
        let current = self.snapshot();
        if current.locating {
            return ActionOutcome::Disabled;
        }
        if let Err(e) = validate_radius(current.radius_km) {
            self.set_feedback(Some(Feedback::error(e.to_string())));
            return ActionOutcome::Failed;
        }

        self.state.send_modify(|state| {
            state.locating = true;
            state.feedback = None;
        });

        let resolved = self
            .pipeline
            .resolve_device_location(current.radius_km)
            .await;
        if !self.scope.is_active() {
            return ActionOutcome::Detached;
        }

        let outcome = match resolved {
            Ok(update) => self.apply(update).await,
            Err(e) => {
                self.set_feedback(Some(Feedback::from_error(&e)));
                ActionOutcome::Failed
            }
        };
        if self.scope.is_active() {
            self.state.send_modify(|state| state.locating = false);
        }
        outcome
    }

    async fn apply(&self, update: LocationUpdate) -> ActionOutcome {
        if let Err(e) = validate_radius(update.radius_km) {
            self.set_feedback(Some(Feedback::error(e.to_string())));
            return ActionOutcome::Failed;
        }

        self.state.send_modify(|state| {
            state.saving = true;
            state.feedback = None;
        });

        let result = self.persist(&update).await;
        if !self.scope.is_active() {
            return ActionOutcome::Detached;
        }

        let outcome = match result {
            Ok(()) => {
                info!(name = %update.name, source = %update.source, "Location saved");
                self.set_feedback(Some(Feedback::success(SAVED_MESSAGE)));
                ActionOutcome::Succeeded
            }
            Err(e) => {
                self.set_feedback(Some(Feedback::from_error(&e)));
                ActionOutcome::Failed
            }
        };
        self.state.send_modify(|state| state.saving = false);
        outcome
    }

    async fn persist(&self, update: &LocationUpdate) -> Result<(), ClientError> {
        self.completer.api().save_location(update).await?;
        self.completer
            .complete(&StepId::Location, CompleteOptions::default())
            .await?;
        Ok(())
    }

    fn set_feedback(&self, feedback: Option<Feedback>) {
        self.state.send_modify(|state| state.feedback = feedback);
    }
}

/// Reject radii outside the accepted range.
///
/// # Errors
///
/// Returns `ValidationError::RadiusOutOfRange` for values outside
/// [`MIN_RADIUS_KM`]..=[`MAX_RADIUS_KM`] or non-finite values.
pub fn validate_radius(radius_km: f64) -> Result<f64, ValidationError> {
    if radius_km.is_finite() && (MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
        Ok(radius_km)
    } else {
        Err(ValidationError::RadiusOutOfRange {
            min: MIN_RADIUS_KM,
            max: MAX_RADIUS_KM,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sidequest_core::LocationSource;

    use super::*;
    use crate::location::{FixedGeolocation, GeolocationError, Position};
    use crate::steps::Tone;
    use crate::steps::tests::Harness;
    use crate::testing::Op;

    fn card(harness: &Harness) -> LocationCard {
        LocationCard::new(harness.pipeline(), harness.completer.clone(), 2.0)
    }

    fn device_card(harness: &Harness, provider: FixedGeolocation) -> LocationCard {
        let pipeline = LocationPipeline::new(harness.api.clone(), Arc::new(provider));
        LocationCard::new(pipeline, harness.completer.clone(), 2.0)
    }

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(1.0).is_ok());
        assert!(validate_radius(30.0).is_ok());
        assert!(validate_radius(0.5).is_err());
        assert!(validate_radius(31.0).is_err());
        assert!(validate_radius(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_radius_defaults_from_profile() {
        let harness = Harness::loaded().await;
        let card = LocationCard::for_profile(harness.pipeline(), harness.completer.clone(), None, 2.0);
        assert!((card.snapshot().radius_km - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_query_is_a_no_op() {
        let harness = Harness::loaded().await;
        harness.api.clear_calls();
        let card = card(&harness);
        card.set_query("   ");

        assert_eq!(card.search().await, ActionOutcome::Disabled);
        assert_eq!(card.snapshot().feedback.unwrap().tone, Tone::Info);
        assert!(harness.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_search_without_matches() {
        let harness = Harness::loaded().await;
        let card = card(&harness);
        card.set_query("Atlantis");

        assert_eq!(card.search().await, ActionOutcome::Succeeded);
        let state = card.snapshot();
        assert!(state.results.is_empty());
        assert!(!state.searching);
        assert_eq!(state.feedback.unwrap().message, NO_MATCHES_MESSAGE);
    }

    #[tokio::test]
    async fn test_search_select_round_trip() {
        let harness = Harness::loaded().await;
        harness.api.add_place("Portland", 45.5, -122.6);
        let card = card(&harness);
        card.set_query("Portland");
        card.set_radius(5.0);

        assert_eq!(card.search().await, ActionOutcome::Succeeded);
        assert_eq!(card.snapshot().results.len(), 1);
        assert_eq!(card.select(0).await, ActionOutcome::Succeeded);

        let state = card.snapshot();
        assert_eq!(state.feedback.unwrap().message, SAVED_MESSAGE);
        assert!(!state.saving);
        assert!(card.step_completed());

        let saved = card.saved_location().unwrap();
        assert!((saved.lat - 45.5).abs() < f64::EPSILON);
        assert!((saved.lon + 122.6).abs() < f64::EPSILON);
        assert_eq!(saved.name.as_deref(), Some("Portland"));
        assert_eq!(saved.radius_km, Some(5.0));
        assert_eq!(saved.source, Some(LocationSource::Geocode));
    }

    #[tokio::test]
    async fn test_select_out_of_range() {
        let harness = Harness::loaded().await;
        let card = card(&harness);
        assert_eq!(card.select(3).await, ActionOutcome::Failed);
        assert_eq!(card.snapshot().feedback.unwrap().tone, Tone::Error);
    }

    #[tokio::test]
    async fn test_radius_out_of_range_makes_no_call() {
        let harness = Harness::loaded().await;
        harness.api.clear_calls();
        let card = card(&harness);
        card.set_radius(45.0);

        let candidate = LocationCandidate {
            lat: 1.0,
            lon: 2.0,
            display_name: Some("Somewhere".to_string()),
            kind: None,
        };
        assert_eq!(card.apply_candidate(&candidate).await, ActionOutcome::Failed);
        assert_eq!(
            card.snapshot().feedback.unwrap().message,
            "Radius must be between 1 and 30 km."
        );
        assert!(harness.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_device_location_with_failed_reverse_geocode() {
        let harness = Harness::loaded().await;
        harness.api.fail_reverse_geocode();
        let card = device_card(&harness, FixedGeolocation::new(Position::new(45.5, -122.6, Some(25.0))));

        assert_eq!(card.use_current_location().await, ActionOutcome::Succeeded);
        let saved = harness.api.stored_profile().location.unwrap();
        assert_eq!(saved.name.as_deref(), Some("45.5000, -122.6000"));
        assert_eq!(saved.source, Some(LocationSource::Geolocation));
        assert_eq!(saved.precision_m, Some(25.0));
        assert!(!card.snapshot().locating);
    }

    #[tokio::test]
    async fn test_permission_denied_feedback() {
        let harness = Harness::loaded().await;
        harness.api.clear_calls();
        let card = device_card(&harness, FixedGeolocation::failing(GeolocationError::PermissionDenied));

        assert_eq!(card.use_current_location().await, ActionOutcome::Failed);
        assert_eq!(
            card.snapshot().feedback.unwrap().message,
            "Location permission denied. Please allow access or use search instead."
        );
        assert!(harness.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let harness = Harness::loaded().await;
        harness.api.fail_next_http(Op::SaveLocation, 400, "lat and lon are required");
        let card = card(&harness);

        let candidate = LocationCandidate {
            lat: 1.0,
            lon: 2.0,
            display_name: None,
            kind: None,
        };
        assert_eq!(card.apply_candidate(&candidate).await, ActionOutcome::Failed);
        let feedback = card.snapshot().feedback.unwrap();
        assert_eq!(feedback.tone, Tone::Error);
        assert_eq!(feedback.message, "lat and lon are required");
        assert!(!card.step_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_during_search_detaches() {
        let harness = Harness::loaded().await;
        harness.api.add_place("Portland", 45.5, -122.6);
        harness.api.delay_next(Op::Search, Duration::from_millis(300));
        let card = Arc::new(card(&harness));
        card.set_query("Portland");

        let pending = tokio::spawn({
            let card = card.clone();
            async move { card.search().await }
        });
        tokio::task::yield_now().await;
        card.unmount();

        assert_eq!(pending.await.unwrap(), ActionOutcome::Detached);
        assert!(card.snapshot().results.is_empty());
    }
}
