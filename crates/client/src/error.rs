//! Unified error handling for the onboarding client.
//!
//! Every public operation returns `Result<T, ClientError>`. Step cards catch
//! these at their own boundary and turn them into a [`Feedback`] message via
//! [`ClientError::user_message`].
//!
//! [`Feedback`]: crate::steps::Feedback

use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::identity::IdentityStoreError;
use crate::location::GeolocationError;

/// Input rejected before any request was made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// No debug identity is set, so data-dependent calls are suppressed.
    #[error("Add a debug identity to continue.")]
    NoIdentity,

    /// A location search was submitted without a query.
    #[error("Enter a place to search for.")]
    EmptyQuery,

    /// The search radius is outside the accepted range.
    #[error("Radius must be between {min} and {max} km.")]
    RadiusOutOfRange {
        /// Smallest accepted radius.
        min: f64,
        /// Largest accepted radius.
        max: f64,
    },

    /// A selection referred to a search result that does not exist.
    #[error("No search result at position {0}.")]
    NoSuchCandidate(usize),
}

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request to the quest service failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Device position could not be read.
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    /// Input was rejected locally.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Identity could not be persisted.
    #[error("Identity storage error: {0}")]
    IdentityStore(#[from] IdentityStoreError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Whether the service rejected the call as unauthenticated.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Whether a network call timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway(e) => e.user_message(),
            Self::Geolocation(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}
