//! Display URL construction for photo references

use reqwest::Url;

use crate::config::{ApiKey, DEFAULT_PHOTO_WIDTH, ProviderEndpoints, ResolverConfig};
use crate::provider::{PhotoReference, ProviderKind};

/// Largest width either provider serves
pub const MAX_PHOTO_WIDTH: u32 = 4800;

/// Turns a reference into an image URL. Stateless apart from configuration;
/// nothing is cached and no request is made.
#[derive(Debug, Clone)]
pub struct PhotoUrlBuilder {
    api_key: ApiKey,
    legacy_photo_endpoint: String,
    media_endpoint: String,
}

impl PhotoUrlBuilder {
    pub fn new(api_key: ApiKey, endpoints: &ProviderEndpoints) -> Self {
        Self {
            api_key,
            legacy_photo_endpoint: endpoints.legacy_photo.clone(),
            media_endpoint: endpoints.media.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.api_key.clone(), &config.endpoints)
    }

    /// URL at the default width of 800px
    pub fn build_default(&self, reference: Option<&PhotoReference>) -> Option<String> {
        self.build_url(reference, DEFAULT_PHOTO_WIDTH)
    }

    /// Build a display URL, or `None` when there is no reference.
    pub fn build_url(&self, reference: Option<&PhotoReference>, width: u32) -> Option<String> {
        let reference = reference?;
        let width = width.clamp(1, MAX_PHOTO_WIDTH).to_string();

        let url = match reference.provider() {
            ProviderKind::Legacy => Url::parse_with_params(
                &self.legacy_photo_endpoint,
                &[
                    ("maxwidth", width.as_str()),
                    ("photo_reference", reference.token()),
                    ("key", self.api_key.expose()),
                ],
            ),
            ProviderKind::Current => Url::parse_with_params(
                &format!("{}/{}/media", self.media_endpoint, reference.token()),
                &[("maxWidthPx", width.as_str()), ("key", self.api_key.expose())],
            ),
        };

        match url {
            Ok(url) => Some(url.into()),
            Err(e) => {
                tracing::warn!(provider = %reference.provider(), error = %e, "Could not build photo URL");
                None
            }
        }
    }

    /// Build a URL from a raw token issued by `provider`
    pub fn build_from_token(&self, provider: ProviderKind, token: &str, width: u32) -> Option<String> {
        self.build_url(PhotoReference::new(provider, token).as_ref(), width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn builder() -> PhotoUrlBuilder {
        PhotoUrlBuilder::new(ApiKey::new("test-key"), &ProviderEndpoints::default())
    }

    #[test]
    fn test_absent_reference_builds_nothing() {
        assert_eq!(builder().build_url(None, 800), None);
        assert_eq!(builder().build_from_token(ProviderKind::Legacy, "", 800), None);
    }

    #[test]
    fn test_legacy_url() {
        let url = builder()
            .build_from_token(ProviderKind::Legacy, "ref123", 800)
            .unwrap();
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/place/photo?maxwidth=800&photo_reference=ref123&key=test-key"
        );
    }

    #[test]
    fn test_current_url() {
        let reference = PhotoReference::new(ProviderKind::Current, "places/P1/photos/AbC").unwrap();
        let url = builder().build_default(Some(&reference)).unwrap();
        assert_eq!(
            url,
            "https://places.googleapis.com/v1/places/P1/photos/AbC/media?maxWidthPx=800&key=test-key"
        );
    }

    #[test]
    fn test_width_is_clamped() {
        let url = builder()
            .build_from_token(ProviderKind::Legacy, "ref", 0)
            .unwrap();
        assert!(url.contains("maxwidth=1&"));

        let url = builder()
            .build_from_token(ProviderKind::Legacy, "ref", 10_000)
            .unwrap();
        assert!(url.contains("maxwidth=4800&"));
    }

    proptest! {
        #[test]
        fn prop_legacy_url_is_deterministic(token in "[A-Za-z0-9_-]{1,64}", width in 1u32..=4800) {
            let first = builder().build_from_token(ProviderKind::Legacy, &token, width).unwrap();
            let second = builder().build_from_token(ProviderKind::Legacy, &token, width).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.contains(&token));
            let width_param = format!("maxwidth={}", width);
            prop_assert!(first.contains(&width_param));
            prop_assert!(first.contains("key=test-key"));
        }
    }
}
