//! Core types for SideQuest.
//!
//! This module provides type-safe wrappers for the domain concepts exchanged
//! with the quest service.

pub mod identity;
pub mod location;
pub mod notifications;
pub mod onboarding;
pub mod profile;
pub mod quest;

pub use identity::{Identity, IdentityError};
pub use location::{
    LocationCandidate, LocationSource, LocationUpdate, ReverseGeocodeResponse, ReverseLocation,
    SearchResponse, coordinate_label,
};
pub use notifications::{PushKeys, PushSubscription};
pub use onboarding::{OnboardingStatus, OnboardingStep, StepId};
pub use profile::{
    OnboardingFlags, PreferencesUpdate, PreferredTime, Privacy, Profile, QuestCategory,
    QuestPreferences, SavedLocation, SpendLevel,
};
pub use quest::{Difficulty, DifficultyError, Quest, QuestResponse, QuestZone, Rarity};
