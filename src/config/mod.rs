//! Configuration management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::provider::ProviderKind;

/// Default number of billable provider fetches allowed per session
pub const DEFAULT_QUOTA_LIMIT: u32 = 20;
/// Default number of references requested from the current provider
pub const DEFAULT_RESULT_LIMIT: usize = 1;
/// Default pixel width for display URLs
pub const DEFAULT_PHOTO_WIDTH: u32 = 800;
/// Default provider request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const LEGACY_DETAILS_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/details/json";
pub const LEGACY_PHOTO_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/photo";
pub const PLACES_ENDPOINT: &str = "https://places.googleapis.com/v1/places";
pub const MEDIA_ENDPOINT: &str = "https://places.googleapis.com/v1";

/// Provider credential. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<unset>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Provider endpoint base URLs
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Legacy place details endpoint
    pub legacy_details: String,
    /// Legacy photo serving endpoint
    pub legacy_photo: String,
    /// Current place resource endpoint; the place id is appended as a path segment
    pub places: String,
    /// Current media base; `<name>/media` is appended
    pub media: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            legacy_details: LEGACY_DETAILS_ENDPOINT.to_string(),
            legacy_photo: LEGACY_PHOTO_ENDPOINT.to_string(),
            places: PLACES_ENDPOINT.to_string(),
            media: MEDIA_ENDPOINT.to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Point every endpoint at one base URL, keeping the default paths.
    /// Used to aim the resolver at a stub server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            legacy_details: format!("{base}/maps/api/place/details/json"),
            legacy_photo: format!("{base}/maps/api/place/photo"),
            places: format!("{base}/v1/places"),
            media: format!("{base}/v1"),
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize)]
pub struct ResolverConfig {
    /// Provider credential
    #[serde(skip)]
    pub api_key: ApiKey,
    /// Which provider generation to fetch from
    pub provider: ProviderKind,
    /// Result limit used when a caller does not pass one (default: 1)
    pub default_limit: usize,
    /// Fetches allowed per session (default: 20)
    pub quota_limit: u32,
    /// Provider request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
    pub endpoints: ProviderEndpoints,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            provider: ProviderKind::default(),
            default_limit: DEFAULT_RESULT_LIMIT,
            quota_limit: DEFAULT_QUOTA_LIMIT,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            endpoints: ProviderEndpoints::default(),
        }
    }
}

impl ResolverConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(api_key),
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_quota_limit(mut self, quota_limit: u32) -> Self {
        self.quota_limit = quota_limit;
        self
    }

    pub fn with_default_limit(mut self, default_limit: usize) -> Self {
        self.default_limit = default_limit.max(1);
        self
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server host (default: localhost)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
        }
    }
}
