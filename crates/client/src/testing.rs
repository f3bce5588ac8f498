//! In-memory quest service for unit tests.
//!
//! [`FakeApi`] keeps one user and derives onboarding status from it the same
//! way the service does: location is done once coordinates are saved,
//! preferences once any were written, notifications while an endpoint is
//! registered, and the final step once `complete` was posted. Individual
//! calls can be delayed or failed, and every call is logged.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sidequest_core::{
    LocationCandidate, LocationUpdate, OnboardingFlags, OnboardingStatus, OnboardingStep,
    PreferencesUpdate, Privacy, Profile, PushSubscription, Quest, QuestPreferences, SavedLocation,
    StepId,
};

use crate::api::OnboardingApi;
use crate::error::ClientError;
use crate::gateway::GatewayError;

/// Operations that can be delayed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Profile,
    Status,
    CompleteStep,
    SaveLocation,
    UpdatePreferences,
    Register,
    ClearRegistration,
    Search,
    Reverse,
    Quest,
}

struct Place {
    name: String,
    lat: f64,
    lon: f64,
}

struct FakeState {
    profile: Profile,
    preferences_written: bool,
    webpush_endpoint: Option<String>,
    places: Vec<Place>,
    reverse_fails: bool,
    quest: Option<Quest>,
    delays: HashMap<Op, VecDeque<Duration>>,
    failures: HashMap<Op, VecDeque<GatewayError>>,
    calls: Vec<String>,
}

pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                profile: Profile {
                    id: Some(1),
                    username: "explorer".to_string(),
                    display_name: None,
                    email: None,
                    bio: None,
                    avatar_url: None,
                    location: None,
                    webpush_registered: false,
                    privacy: Privacy::Public,
                    quest_preferences: QuestPreferences::default(),
                    onboarding: OnboardingFlags::default(),
                    created_at: None,
                },
                preferences_written: false,
                webpush_endpoint: None,
                places: Vec::new(),
                reverse_fails: false,
                quest: None,
                delays: HashMap::new(),
                failures: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn add_place(&self, name: &str, lat: f64, lon: f64) {
        self.state.lock().unwrap().places.push(Place {
            name: name.to_string(),
            lat,
            lon,
        });
    }

    pub fn fail_reverse_geocode(&self) {
        self.state.lock().unwrap().reverse_fails = true;
    }

    pub fn set_quest(&self, quest: Option<Quest>) {
        self.state.lock().unwrap().quest = quest;
    }

    /// Delay the next call of `op` by `delay`.
    pub fn delay_next(&self, op: Op, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .entry(op)
            .or_default()
            .push_back(delay);
    }

    /// Fail the next call of `op` with `error`.
    pub fn fail_next(&self, op: Op, error: GatewayError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Fail the next call of `op` with an HTTP error.
    pub fn fail_next_http(&self, op: Op, status: u16, message: &str) {
        self.fail_next(
            op,
            GatewayError::Http {
                status,
                message: message.to_string(),
                payload: serde_json::json!({ "error": message }),
            },
        );
    }

    /// Change the stored profile directly, as another client would.
    pub fn edit_profile(&self, edit: impl FnOnce(&mut Profile)) {
        edit(&mut self.state.lock().unwrap().profile);
    }

    pub fn stored_profile(&self) -> Profile {
        self.state.lock().unwrap().profile.clone()
    }

    pub fn status(&self) -> OnboardingStatus {
        derive_status(&self.state.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Log the call, apply it, then wait out any scripted delay.
    ///
    /// State changes land at arrival time so that overlapping calls observe
    /// each other in the order they were issued.
    async fn serve<T: Send>(
        &self,
        op: Op,
        call: String,
        handler: impl FnOnce(&mut FakeState) -> Result<T, GatewayError> + Send,
    ) -> Result<T, ClientError> {
        let (delay, result) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            let delay = state.delays.get_mut(&op).and_then(VecDeque::pop_front);
            let result = match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
                Some(error) => Err(error),
                None => handler(&mut state),
            };
            (delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result.map_err(ClientError::from)
    }
}

fn http(status: u16, message: &str) -> GatewayError {
    GatewayError::Http {
        status,
        message: message.to_string(),
        payload: serde_json::json!({ "error": message }),
    }
}

fn derive_status(state: &FakeState) -> OnboardingStatus {
    let completed = state.profile.onboarding.completed;
    let step = |id: StepId, label: &str, done: bool| OnboardingStep {
        id,
        label: label.to_string(),
        description: None,
        completed: done,
    };
    let steps = vec![
        step(
            StepId::Location,
            "Set your home base",
            state.profile.location.is_some(),
        ),
        step(
            StepId::Preferences,
            "Tell us what you like",
            state.preferences_written,
        ),
        step(
            StepId::Notifications,
            "Stay in the loop",
            state.webpush_endpoint.is_some(),
        ),
        step(StepId::Complete, "You're ready to quest", completed),
    ];

    let next_step = steps.iter().find(|step| !step.completed).map(|step| step.id.clone());
    let current_step = if completed {
        Some(StepId::Complete)
    } else {
        state
            .profile
            .onboarding
            .step
            .as_deref()
            .map(StepId::from)
            .or_else(|| next_step.clone())
    };

    OnboardingStatus {
        steps,
        completed,
        current_step,
        next_step: if completed { None } else { next_step },
    }
}

#[async_trait]
impl OnboardingApi for FakeApi {
    async fn profile(&self) -> Result<Profile, ClientError> {
        self.serve(Op::Profile, "GET /me".to_string(), |state| {
            Ok(state.profile.clone())
        })
        .await
    }

    async fn onboarding_status(&self) -> Result<OnboardingStatus, ClientError> {
        self.serve(Op::Status, "GET /me/onboarding/status".to_string(), |state| {
            Ok(derive_status(state))
        })
        .await
    }

    async fn complete_step(&self, step: &StepId) -> Result<(), ClientError> {
        let call = format!("POST /me/onboarding/complete-step {step}");
        self.serve(Op::CompleteStep, call, |state| match step {
            StepId::Other(_) => Err(http(400, "invalid step")),
            known => {
                state.profile.onboarding.step = Some(known.as_str().to_string());
                if *known == StepId::Complete {
                    state.profile.onboarding.completed = true;
                }
                Ok(())
            }
        })
        .await
    }

    async fn save_location(&self, update: &LocationUpdate) -> Result<(), ClientError> {
        self.serve(Op::SaveLocation, "POST /me/location".to_string(), |state| {
            state.profile.location = Some(SavedLocation {
                lat: update.lat,
                lon: update.lon,
                name: Some(update.name.clone()),
                radius_km: Some(update.radius_km),
                source: Some(update.source),
                precision_m: update.precision_m,
            });
            Ok(())
        })
        .await
    }

    async fn update_preferences(&self, update: &PreferencesUpdate) -> Result<(), ClientError> {
        self.serve(Op::UpdatePreferences, "PATCH /me/preferences".to_string(), |state| {
            state.profile.quest_preferences = update.quest_preferences.clone();
            state.profile.privacy = update.privacy;
            state.preferences_written = true;
            Ok(())
        })
        .await
    }

    async fn register_notifications(
        &self,
        subscription: &PushSubscription,
    ) -> Result<(), ClientError> {
        let call = "POST /me/notifications/register".to_string();
        self.serve(Op::Register, call, |state| {
            if subscription.endpoint.trim().is_empty() {
                return Err(http(400, "endpoint is required"));
            }
            state.webpush_endpoint = Some(subscription.endpoint.trim().to_string());
            state.profile.webpush_registered = true;
            Ok(())
        })
        .await
    }

    async fn clear_notifications(&self) -> Result<(), ClientError> {
        let call = "DELETE /me/notifications/register".to_string();
        self.serve(Op::ClearRegistration, call, |state| {
            state.webpush_endpoint = None;
            state.profile.webpush_registered = false;
            Ok(())
        })
        .await
    }

    async fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>, ClientError> {
        let needle = query.to_lowercase();
        self.serve(Op::Search, format!("GET /geocode?q={query}"), |state| {
            Ok(state
                .places
                .iter()
                .filter(|place| place.name.to_lowercase().contains(&needle))
                .map(|place| LocationCandidate {
                    lat: place.lat,
                    lon: place.lon,
                    display_name: Some(place.name.clone()),
                    kind: Some("city".to_string()),
                })
                .collect())
        })
        .await
    }

    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<String>, ClientError> {
        let call = format!("GET /geocode/reverse?lat={lat}&lon={lon}");
        self.serve(Op::Reverse, call, |state| {
            if state.reverse_fails {
                return Err(http(502, "lookup_failed: upstream unavailable"));
            }
            Ok(state
                .places
                .iter()
                .find(|place| (place.lat - lat).abs() < 1e-6 && (place.lon - lon).abs() < 1e-6)
                .map(|place| place.name.clone()))
        })
        .await
    }

    async fn quest_of_the_day(&self) -> Result<Option<Quest>, ClientError> {
        self.serve(Op::Quest, "GET /quests/today".to_string(), |state| {
            Ok(state.quest.clone())
        })
        .await
    }
}

/// A quest as the service would send it.
pub fn sample_quest() -> Quest {
    let value: Value = serde_json::json!({
        "id": 7,
        "date": "2026-10-15",
        "title": "Sketch a doorway",
        "details": "Find a doorway with character and sketch it in five minutes.",
        "difficulty": 2,
        "rarity": "rare",
        "hints": ["Old town has good ones"],
        "location": {"name": "Old Town", "lat": 45.52, "lon": -122.67, "radius_km": 3}
    });
    serde_json::from_value(value).unwrap()
}
