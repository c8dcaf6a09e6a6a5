//! Photo reference providers
//!
//! Two provider API generations expose place photos in incompatible shapes:
//! - legacy: place details endpoint, key in the query string
//! - current: place resource endpoint, key in a request header
//!
//! Both implement [`PhotoProvider`]. Which one runs is a configuration
//! decision made once in [`create_provider`]; nothing inspects responses to
//! pick a strategy.

pub mod current;
pub mod legacy;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{FetchError, FetchResult};

pub use current::CurrentPlacesProvider;
pub use legacy::{LEGACY_PHOTO_CAP, LegacyPlacesProvider};
pub use types::{PhotoReference, PlaceId, ProviderKind};

const USER_AGENT: &str = concat!("place-photos/", env!("CARGO_PKG_VERSION"));

/// Fetches photo references for a place from one provider generation.
#[async_trait]
pub trait PhotoProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fetch up to `limit` references, reporting why nothing came back.
    async fn try_fetch(&self, place_id: &PlaceId, limit: usize)
    -> FetchResult<Vec<PhotoReference>>;

    /// Fetch up to `limit` references; every failure becomes an empty list.
    async fn fetch_references(&self, place_id: &PlaceId, limit: usize) -> Vec<PhotoReference> {
        match self.try_fetch(place_id, limit).await {
            Ok(references) => references,
            Err(e) => {
                warn!(
                    provider = %self.kind(),
                    place_id = %place_id,
                    error = %e,
                    "Photo reference fetch failed"
                );
                Vec::new()
            }
        }
    }
}

/// Build the shared HTTP client used by both providers
pub fn build_http_client(timeout: Duration) -> FetchResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(FetchError::Http)
}

/// Create the provider selected by `config.provider`
pub fn create_provider(config: &ResolverConfig) -> FetchResult<Arc<dyn PhotoProvider>> {
    let client = build_http_client(config.request_timeout())?;
    Ok(create_provider_with_client(config, client))
}

/// Create the configured provider around an existing client
pub fn create_provider_with_client(
    config: &ResolverConfig,
    client: reqwest::Client,
) -> Arc<dyn PhotoProvider> {
    debug!(provider = %config.provider, "Creating photo provider");
    match config.provider {
        ProviderKind::Legacy => Arc::new(LegacyPlacesProvider::new(
            client,
            config.endpoints.legacy_details.clone(),
            config.api_key.clone(),
        )),
        ProviderKind::Current => Arc::new(CurrentPlacesProvider::new(
            client,
            config.endpoints.places.clone(),
            config.api_key.clone(),
        )),
    }
}

/// Strip the request URL (it may carry the credential) from transport errors.
pub(crate) fn redact(e: reqwest::Error) -> FetchError {
    FetchError::Http(e.without_url())
}
