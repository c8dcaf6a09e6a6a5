//! Current place resource provider

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::{PhotoProvider, PhotoReference, PlaceId, ProviderKind, redact};
use crate::config::ApiKey;
use crate::error::{FetchError, FetchResult};

/// Header carrying the credential for the current API
pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";

#[derive(Debug, Deserialize)]
struct PlaceResponse {
    photos: Option<Vec<Option<CurrentPhoto>>>,
}

#[derive(Debug, Deserialize)]
struct CurrentPhoto {
    name: Option<String>,
}

/// Fetches `photos[].name` from `<places-endpoint>/<place_id>?fields=photos`.
#[derive(Clone)]
pub struct CurrentPlacesProvider {
    client: reqwest::Client,
    places_endpoint: String,
    api_key: ApiKey,
}

impl CurrentPlacesProvider {
    pub fn new(client: reqwest::Client, places_endpoint: String, api_key: ApiKey) -> Self {
        Self {
            client,
            places_endpoint,
            api_key,
        }
    }

    fn place_url(&self, place_id: &PlaceId) -> FetchResult<Url> {
        let mut url = Url::parse(&self.places_endpoint)
            .map_err(|e| FetchError::InvalidEndpoint(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidEndpoint(self.places_endpoint.clone()))?
            .pop_if_empty()
            .push(place_id.as_str());
        Ok(url)
    }

    fn extract(body: &[u8], limit: usize) -> FetchResult<Vec<PhotoReference>> {
        let place: PlaceResponse = serde_json::from_slice(body)?;

        Ok(place
            .photos
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|photo| photo.name)
            .filter_map(|name| PhotoReference::new(ProviderKind::Current, name))
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl PhotoProvider for CurrentPlacesProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Current
    }

    async fn try_fetch(
        &self,
        place_id: &PlaceId,
        limit: usize,
    ) -> FetchResult<Vec<PhotoReference>> {
        let url = self.place_url(place_id)?;
        let response = self
            .client
            .get(url)
            .query(&[("fields", "photos")])
            .header(API_KEY_HEADER, self.api_key.expose())
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
        let references = Self::extract(&body, limit)?;
        debug!(
            place_id = %place_id,
            count = references.len(),
            limit,
            "Fetched current photo references"
        );
        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(endpoint: &str) -> CurrentPlacesProvider {
        CurrentPlacesProvider::new(
            reqwest::Client::new(),
            endpoint.to_string(),
            ApiKey::new("k"),
        )
    }

    #[test]
    fn test_extract_truncates_to_limit() {
        let body = serde_json::to_vec(&json!({
            "photos": [
                { "name": "places/P1/photos/A" },
                { "name": "places/P1/photos/B" },
                { "name": "places/P1/photos/C" }
            ]
        }))
        .unwrap();

        let one = CurrentPlacesProvider::extract(&body, 1).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].token(), "places/P1/photos/A");

        let all = CurrentPlacesProvider::extract(&body, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.provider() == ProviderKind::Current));
    }

    #[test]
    fn test_extract_skips_unnamed_photos() {
        let body = serde_json::to_vec(&json!({
            "photos": [null, { "name": "" }, { "widthPx": 10 }, { "name": "places/P1/photos/Z" }]
        }))
        .unwrap();

        let references = CurrentPlacesProvider::extract(&body, 5).unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].token(), "places/P1/photos/Z");
    }

    #[test]
    fn test_extract_place_without_photos() {
        assert!(CurrentPlacesProvider::extract(b"{}", 3).unwrap().is_empty());
    }

    #[test]
    fn test_extract_rejects_wrong_shape() {
        let err = CurrentPlacesProvider::extract(br#"{"photos": "nope"}"#, 1).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_place_url_appends_encoded_segment() {
        let place_id = PlaceId::parse("ChIJ abc").unwrap();
        let url = provider("https://places.example.com/v1/places/")
            .place_url(&place_id)
            .unwrap();
        assert_eq!(url.as_str(), "https://places.example.com/v1/places/ChIJ%20abc");
    }

    #[test]
    fn test_place_url_invalid_endpoint() {
        let place_id = PlaceId::parse("P1").unwrap();
        let err = provider("not a url").place_url(&place_id).unwrap_err();
        assert_eq!(err.kind(), "endpoint");
    }
}
