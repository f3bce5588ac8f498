//! Geocoding results and location update payloads.

use serde::{Deserialize, Serialize};

/// Where a saved location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// Picked from a forward geocode search.
    Geocode,
    /// Read from the device position.
    Geolocation,
    /// Entered directly (server default when no source is sent).
    Manual,
}

impl std::fmt::Display for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geocode => write!(f, "geocode"),
            Self::Geolocation => write!(f, "geolocation"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// A forward geocode search result.
///
/// Candidates are ephemeral: only the one a user selects is persisted, and it
/// is enriched with a radius and a [`LocationSource`] first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Response of `GET /geocode?q=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub locations: Vec<LocationCandidate>,
}

/// Location part of a reverse geocode response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseLocation {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response of `GET /geocode/reverse`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default)]
    pub location: Option<ReverseLocation>,
}

impl ReverseGeocodeResponse {
    /// The resolved display name, if the service returned a non-empty one.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .and_then(|location| location.display_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// Body of `POST /me/location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub radius_km: f64,
    pub source: LocationSource,
    /// Always serialized, `null` when unknown.
    pub precision_m: Option<f64>,
}

/// Label used when no place name can be resolved for a coordinate.
///
/// ```
/// use sidequest_core::coordinate_label;
///
/// assert_eq!(coordinate_label(45.5, -122.6), "45.5000, -122.6000");
/// ```
#[must_use]
pub fn coordinate_label(lat: f64, lon: f64) -> String {
    format!("{lat:.4}, {lon:.4}")
}
