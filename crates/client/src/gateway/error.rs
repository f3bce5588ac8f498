//! Error types for the request gateway.

use thiserror::Error;

/// Message shown when the backend cannot be reached in time.
pub const UNREACHABLE_MESSAGE: &str =
    "Timed out waiting for the API. Ensure the backend is running and reachable.";

/// Message shown when the backend rejects the request for lack of an identity.
pub const UNAUTHENTICATED_MESSAGE: &str =
    "Unauthorized. Set a debug identity to load sandbox data.";

/// Errors surfaced by [`Gateway::call`](super::Gateway::call).
///
/// The gateway never retries. Every variant reaches the caller unchanged.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be sent or the connection failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The internal timer fired before the response body arrived.
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured timeout for the call.
        timeout_ms: u64,
    },

    /// A caller-supplied cancellation token was triggered.
    #[error("Request cancelled")]
    Cancelled,

    /// The response body was not empty and not valid JSON, or did not match
    /// the expected shape.
    #[error("Invalid server response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server-provided `error` field, or a generic description.
        message: String,
        /// Decoded response body (`Null` when empty).
        payload: serde_json::Value,
    },

    /// The request could not be built (bad path or header value).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// HTTP status code, for [`GatewayError::Http`].
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the call as unauthenticated (401).
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Whether the call timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Network(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Message suitable for showing to the user.
    ///
    /// 401 becomes a prompt to set an identity, timeouts become a
    /// reachability hint, everything else is shown verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_timeout() {
            return UNREACHABLE_MESSAGE.to_string();
        }
        if self.is_unauthorized() {
            return UNAUTHENTICATED_MESSAGE.to_string();
        }
        self.to_string()
    }
}
