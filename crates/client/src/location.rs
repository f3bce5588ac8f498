//! Location resolution pipeline.
//!
//! Device geolocation first, reverse geocoding to name the point, and forward
//! geocode search as the manual fallback. Only reverse geocoding is allowed to
//! fail quietly: the coordinates themselves become the label.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use sidequest_core::{LocationCandidate, LocationSource, LocationUpdate, coordinate_label};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::api::OnboardingApi;
use crate::error::{ClientError, ValidationError};

/// How a position should be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Give up waiting for the device after this long.
    pub timeout: Duration,
    /// Accept a cached position no older than this.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(60),
        }
    }
}

/// A device position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Accuracy radius in meters, when the device reports one.
    pub accuracy_m: Option<f64>,
}

impl Position {
    #[must_use]
    pub const fn new(lat: f64, lon: f64, accuracy_m: Option<f64>) -> Self {
        Self {
            lat,
            lon,
            accuracy_m,
        }
    }
}

/// Why a device position could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("position request timed out")]
    Timeout,

    #[error("geolocation is not supported")]
    Unsupported,

    #[error("geolocation failed: {0}")]
    Other(String),
}

impl GeolocationError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location permission denied. Please allow access or use search instead."
            }
            Self::PositionUnavailable => {
                "Location information is unavailable. Try again in a moment."
            }
            Self::Timeout => "Location request timed out. Try again or use search.",
            Self::Unsupported => "Your browser does not support geolocation.",
            Self::Other(_) => "Unable to retrieve your location.",
        }
    }
}

/// Source of device positions.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Read the current position.
    ///
    /// # Errors
    ///
    /// Returns the structured reason the position could not be read.
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, GeolocationError>;
}

/// Always answers with the same position or error.
///
/// Used by the CLI when coordinates are given on the command line.
#[derive(Debug, Clone)]
pub struct FixedGeolocation {
    result: Result<Position, GeolocationError>,
}

impl FixedGeolocation {
    #[must_use]
    pub const fn new(position: Position) -> Self {
        Self {
            result: Ok(position),
        }
    }

    #[must_use]
    pub const fn failing(error: GeolocationError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, GeolocationError> {
        self.result.clone()
    }
}

/// Provider for platforms without a positioning device.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedGeolocation;

#[async_trait]
impl GeolocationProvider for UnsupportedGeolocation {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Wraps a provider and reuses its last fix while it is younger than
/// `maximum_age`.
#[derive(Debug)]
pub struct CachedGeolocation<P> {
    inner: P,
    last: Mutex<Option<(Position, Instant)>>,
}

impl<P> CachedGeolocation<P> {
    pub const fn new(inner: P) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<P: GeolocationProvider> GeolocationProvider for CachedGeolocation<P> {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, GeolocationError> {
        let cached = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((position, taken_at)) = cached
            && taken_at.elapsed() <= options.maximum_age
        {
            debug!("Using cached position");
            return Ok(position);
        }

        let position = self.inner.current_position(options).await?;
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((position, Instant::now()));
        Ok(position)
    }
}

/// Geolocation, reverse geocoding and search over one API.
#[derive(Clone)]
pub struct LocationPipeline {
    api: Arc<dyn OnboardingApi>,
    geolocation: Arc<dyn GeolocationProvider>,
    options: PositionOptions,
}

impl std::fmt::Debug for LocationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationPipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl LocationPipeline {
    #[must_use]
    pub fn new(api: Arc<dyn OnboardingApi>, geolocation: Arc<dyn GeolocationProvider>) -> Self {
        Self {
            api,
            geolocation,
            options: PositionOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Forward geocode `query`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyQuery` without calling the API when the
    /// trimmed query is empty; otherwise any API failure.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<LocationCandidate>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        let results = self.api.search_locations(query).await?;
        debug!(count = results.len(), "Location search finished");
        Ok(results)
    }

    /// Read the device position, bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Geolocation` with the provider's reason, or
    /// `GeolocationError::Timeout` if the provider does not answer in time.
    #[instrument(skip(self))]
    pub async fn locate_device(&self) -> Result<Position, ClientError> {
        let lookup = self.geolocation.current_position(&self.options);
        match tokio::time::timeout(self.options.timeout, lookup).await {
            Ok(Ok(position)) => Ok(position),
            Ok(Err(e)) => {
                warn!(error = %e, "Geolocation failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(timeout = ?self.options.timeout, "Geolocation timed out");
                Err(GeolocationError::Timeout.into())
            }
        }
    }

    /// Best-effort place name for a coordinate.
    ///
    /// Falls back to [`coordinate_label`] when the reverse geocode fails or
    /// finds nothing. Never fails.
    #[instrument(skip(self))]
    pub async fn label_for(&self, lat: f64, lon: f64) -> String {
        match self.api.reverse_geocode(lat, lon).await {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            Ok(_) => coordinate_label(lat, lon),
            Err(e) => {
                warn!(error = %e, "Reverse geocode failed");
                coordinate_label(lat, lon)
            }
        }
    }

    /// Resolve the device position into a location update.
    ///
    /// # Errors
    ///
    /// Fails only when the position itself cannot be read.
    pub async fn resolve_device_location(
        &self,
        radius_km: f64,
    ) -> Result<LocationUpdate, ClientError> {
        let position = self.locate_device().await?;
        let name = self.label_for(position.lat, position.lon).await;
        Ok(device_update(&position, name, radius_km))
    }
}

/// Update for a search result the user picked.
///
/// The name falls back to the query the user typed, then to the coordinates.
#[must_use]
pub fn candidate_update(candidate: &LocationCandidate, query: &str, radius_km: f64) -> LocationUpdate {
    let name = candidate
        .display_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| Some(query.trim()).filter(|query| !query.is_empty()))
        .map_or_else(|| coordinate_label(candidate.lat, candidate.lon), str::to_string);

    LocationUpdate {
        lat: candidate.lat,
        lon: candidate.lon,
        name,
        radius_km,
        source: LocationSource::Geocode,
        precision_m: None,
    }
}

/// Update for a device position.
#[must_use]
pub fn device_update(position: &Position, name: String, radius_km: f64) -> LocationUpdate {
    LocationUpdate {
        lat: position.lat,
        lon: position.lon,
        name,
        radius_km,
        source: LocationSource::Geolocation,
        precision_m: position.accuracy_m,
    }
}
