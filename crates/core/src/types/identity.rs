//! Debug identity type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Identity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The input is empty once surrounding whitespace is removed.
    #[error("identity cannot be empty")]
    Empty,
}

/// A sandbox identity standing in for an authenticated user.
///
/// The backend trusts this value without verification and auto-provisions a
/// user for any name it has not seen before. The only rule enforced on the
/// client is that an identity is never empty, so an `Identity` can always be
/// sent as a request header.
///
/// ## Examples
///
/// ```
/// use sidequest_core::Identity;
///
/// let identity = Identity::parse("  explorer-dev ").unwrap();
/// assert_eq!(identity.as_str(), "explorer-dev");
///
/// assert!(Identity::parse("").is_err());
/// assert!(Identity::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parse an `Identity`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Empty`] if nothing remains after trimming.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Identity` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
