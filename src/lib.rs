//! # place-photos
//!
//! Resolves place identifiers to provider photo references under a
//! per-session request quota, memoizing results per place and collapsing
//! concurrent lookups for the same place into one provider request.

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod quota;
pub mod resolver;
pub mod server;
pub mod transport;
pub mod url_builder;

// Re-export commonly used types
pub use cache::ReferenceCache;
pub use config::{ApiKey, ProviderEndpoints, ResolverConfig, ServerConfig};
pub use error::FetchError;
pub use provider::{PhotoProvider, PhotoReference, PlaceId, ProviderKind};
pub use quota::QuotaGuard;
pub use resolver::{PhotoResolver, Resolution, ResolveOutcome};
pub use server::{PhotoService, PlacePhotos};
pub use url_builder::PhotoUrlBuilder;

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
