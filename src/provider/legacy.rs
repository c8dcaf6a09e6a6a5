//! Legacy place details provider

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{PhotoProvider, PhotoReference, PlaceId, ProviderKind, redact};
use crate::config::ApiKey;
use crate::error::{FetchError, FetchResult};

/// Hard ceiling on references taken from one legacy details response.
/// Caller limits neither raise nor lower it.
pub const LEGACY_PHOTO_CAP: usize = 5;

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: Option<String>,
    error_message: Option<String>,
    result: Option<DetailsResult>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    photos: Option<Vec<Option<LegacyPhoto>>>,
}

#[derive(Debug, Deserialize)]
struct LegacyPhoto {
    photo_reference: Option<String>,
}

/// Fetches `result.photos[].photo_reference` from the details endpoint.
#[derive(Clone)]
pub struct LegacyPlacesProvider {
    client: reqwest::Client,
    details_endpoint: String,
    api_key: ApiKey,
}

impl LegacyPlacesProvider {
    pub fn new(client: reqwest::Client, details_endpoint: String, api_key: ApiKey) -> Self {
        Self {
            client,
            details_endpoint,
            api_key,
        }
    }

    fn extract(body: &[u8]) -> FetchResult<Vec<PhotoReference>> {
        let details: DetailsResponse = serde_json::from_slice(body)?;

        match details.status.as_deref() {
            None | Some("OK") => {}
            Some("ZERO_RESULTS") | Some("NOT_FOUND") => return Ok(Vec::new()),
            Some(status) => {
                return Err(FetchError::Provider {
                    status: status.to_string(),
                    message: details.error_message.unwrap_or_default(),
                });
            }
        }

        let result = details.result.ok_or(FetchError::MissingField("result"))?;

        Ok(result
            .photos
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|photo| photo.photo_reference)
            .filter_map(|token| PhotoReference::new(ProviderKind::Legacy, token))
            .take(LEGACY_PHOTO_CAP)
            .collect())
    }
}

#[async_trait]
impl PhotoProvider for LegacyPlacesProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Legacy
    }

    async fn try_fetch(
        &self,
        place_id: &PlaceId,
        _limit: usize,
    ) -> FetchResult<Vec<PhotoReference>> {
        let response = self
            .client
            .get(&self.details_endpoint)
            .query(&[
                ("place_id", place_id.as_str()),
                ("fields", "photos"),
                ("key", self.api_key.expose()),
            ])
            .send()
            .await
            .map_err(redact)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(redact)?;
        let references = Self::extract(&body)?;
        debug!(
            place_id = %place_id,
            count = references.len(),
            "Fetched legacy photo references"
        );
        Ok(references)
    }
}
