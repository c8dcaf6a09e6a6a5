//! Identifier and reference types shared by providers, cache and URL builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which provider API generation issued a reference.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Place details endpoint, `result.photos[].photo_reference`
    Legacy,
    /// Place resource endpoint, `photos[].name`
    #[default]
    Current,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Legacy => "legacy",
            ProviderKind::Current => "current",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ProviderKind::Legacy),
            "current" => Ok(ProviderKind::Current),
            other => Err(format!(
                "unknown provider '{other}', expected 'legacy' or 'current'"
            )),
        }
    }
}

/// Opaque place identifier in the provider's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(String);

impl PlaceId {
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider-issued photo token, tagged with its issuer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoReference {
    provider: ProviderKind,
    token: String,
}

impl PhotoReference {
    /// Returns `None` for an empty token.
    pub fn new(provider: ProviderKind, token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.trim().is_empty()).then_some(Self { provider, token })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for PhotoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}
