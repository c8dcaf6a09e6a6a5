//! Photo service: the resolver, URL builder and metrics behind one handle

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::{DEFAULT_PHOTO_WIDTH, ResolverConfig, ServerConfig};
use crate::metrics::MetricsProvider;
use crate::metrics::health::MonitoringConfig;
use crate::provider::ProviderKind;
use crate::quota::QuotaSnapshot;
use crate::resolver::PhotoResolver;
use crate::url_builder::PhotoUrlBuilder;

/// Photos resolved for one place, ready to render
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlacePhotos {
    pub place_id: String,
    pub provider: ProviderKind,
    pub references: Vec<String>,
    pub urls: Vec<String>,
}

/// Owns every piece of resolution state for one session. Construct once and
/// hand clones to whoever needs photos.
#[derive(Clone)]
pub struct PhotoService {
    config: ServerConfig,
    resolver: PhotoResolver,
    url_builder: PhotoUrlBuilder,
    metrics: Arc<MetricsProvider>,
}

impl PhotoService {
    pub fn new(server_config: ServerConfig, resolver_config: &ResolverConfig) -> Result<Self> {
        let resolver = PhotoResolver::from_config(resolver_config)
            .context("Failed to create photo provider")?;
        Ok(Self::with_resolver(server_config, resolver_config, resolver))
    }

    /// Wrap an existing resolver (e.g. one built around a custom provider)
    pub fn with_resolver(
        server_config: ServerConfig,
        resolver_config: &ResolverConfig,
        resolver: PhotoResolver,
    ) -> Self {
        let metrics = MetricsProvider::new(
            MonitoringConfig::default(),
            crate::VERSION.to_string(),
            resolver.clone(),
            resolver_config.has_credential(),
        );

        info!(
            provider = %resolver.provider_kind(),
            quota_limit = resolver.quota().limit(),
            default_limit = resolver.default_limit(),
            "Photo service initialized"
        );

        Self {
            config: server_config,
            url_builder: PhotoUrlBuilder::from_config(resolver_config),
            resolver,
            metrics: Arc::new(metrics),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PhotoResolver {
        &self.resolver
    }

    pub fn url_builder(&self) -> &PhotoUrlBuilder {
        &self.url_builder
    }

    pub fn metrics(&self) -> &Arc<MetricsProvider> {
        &self.metrics
    }

    /// Resolve a place and build display URLs at `width` (default 800px).
    /// Never fails; degraded resolutions come back with empty lists.
    #[instrument(skip(self))]
    pub async fn photos_for(
        &self,
        place_id: &str,
        limit: Option<usize>,
        width: Option<u32>,
    ) -> PlacePhotos {
        let resolution = self.resolver.resolve_detailed(place_id, limit).await;
        debug!(
            outcome = ?resolution.outcome,
            count = resolution.references.len(),
            "Resolved place photos"
        );

        let urls = resolution
            .references
            .iter()
            .filter_map(|reference| match width {
                Some(width) => self.url_builder.build_url(Some(reference), width),
                None => self.url_builder.build_default(Some(reference)),
            })
            .collect();

        PlacePhotos {
            place_id: place_id.trim().to_string(),
            provider: self.resolver.provider_kind(),
            references: resolution
                .references
                .iter()
                .map(|reference| reference.token().to_string())
                .collect(),
            urls,
        }
    }

    /// Build a display URL from a raw token in the configured provider's format
    pub fn url_for_token(&self, token: &str, width: Option<u32>) -> Option<String> {
        self.url_builder.build_from_token(
            self.resolver.provider_kind(),
            token,
            width.unwrap_or(DEFAULT_PHOTO_WIDTH),
        )
    }

    pub fn quota(&self) -> QuotaSnapshot {
        self.resolver.quota().snapshot()
    }

    pub fn reset_quota(&self) -> QuotaSnapshot {
        self.resolver.reset_quota();
        self.quota()
    }
}
