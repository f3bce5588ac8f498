//! SideQuest Client - Onboarding orchestration engine.
//!
//! This crate drives a user through onboarding against the remote quest
//! service, which owns all persistent state. It loads status and profile,
//! runs the step cards, resolves locations and shows the dashboard.
//!
//! # Architecture
//!
//! - [`gateway`] - The single HTTP entry point (timeout, cancellation, identity header)
//! - [`api`] - Typed endpoints behind the [`OnboardingApi`] trait
//! - [`identity`] - Debug identity shared by every request
//! - [`resolver`] - Status and profile snapshot with last-request-wins refreshes
//! - [`steps`] - Location, preferences, notifications and completion cards
//! - [`location`] - Geocoding, device position and save payloads
//! - [`page`] / [`dashboard`] - Screens composed from the above
//!
//! Nothing here retries. Failures surface as snapshot state with a
//! user-facing message and the caller decides what to do next.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod binder;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod location;
pub mod page;
pub mod resolver;
pub mod steps;
pub mod welcome;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, OnboardingApi};
pub use binder::{AsyncBinder, BinderOptions, BinderSnapshot};
pub use config::{ClientConfig, ConfigError};
pub use dashboard::{Dashboard, DashboardData, DashboardView, ProfileSummary};
pub use error::{ClientError, ValidationError};
pub use gateway::{CallOptions, Gateway, GatewayError};
pub use identity::{FileIdentityStore, IdentityContext, IdentityStore, MemoryIdentityStore};
pub use location::{
    CachedGeolocation, FixedGeolocation, GeolocationError, GeolocationProvider, LocationPipeline,
    Position, PositionOptions, UnsupportedGeolocation,
};
pub use page::{OnboardingPage, PageView};
pub use resolver::{RefreshOutcome, ResolverPhase, ResolverSnapshot, StatusResolver};
pub use steps::{ActionOutcome, CardScope, Feedback, StepCompleter, Tone};
pub use welcome::{WelcomeGate, should_show_welcome};
