//! Optimistic concurrency tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque concurrency token assigned by the storage service on every write.
///
/// Updates and deletes carry the token they last observed; the service
/// rejects the request when the stored entity has moved on since then.
/// [`ETag::any`] matches whatever version is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    const WILDCARD: &'static str = "*";

    /// Wraps a token as returned by the service.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The wildcard token, matching any stored version.
    #[must_use]
    pub fn any() -> Self {
        Self(Self::WILDCARD.to_string())
    }

    /// Returns true for the wildcard token.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.0 == Self::WILDCARD
    }

    /// Returns true if this token permits a write against `stored`.
    #[must_use]
    pub fn matches(&self, stored: &ETag) -> bool {
        self.is_any() || self == stored
    }

    /// Returns the raw token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ETag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ETag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ETag {
    fn from(value: String) -> Self {
        Self(value)
    }
}
