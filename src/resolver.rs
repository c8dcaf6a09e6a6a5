//! Photo reference resolution
//!
//! A resolution runs once through: cache check, quota check, fetch, store.
//!
//! ```text
//! resolve(P) ──► cache hit? ──yes──► return cached
//!                   │ no
//!                   ▼
//!            fetch in flight for P? ──yes──► wait for its result
//!                   │ no
//!                   ▼
//!            quota available? ──no──► return empty
//!                   │ yes (one unit recorded)
//!                   ▼
//!            spawned fetch ──► cache non-empty result ──► broadcast to waiters
//! ```
//!
//! Concurrent misses for one place share a single fetch. The fetch runs on
//! its own task, so a caller that stops waiting does not stop it and the
//! cache and quota are still updated.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::cache::ReferenceCache;
use crate::config::ResolverConfig;
use crate::error::FetchResult;
use crate::provider::{self, PhotoProvider, PhotoReference, PlaceId, ProviderKind};
use crate::quota::{QuotaGuard, QuotaSnapshot};

/// How a resolution ended. Callers of [`PhotoResolver::resolve`] never see
/// this; it feeds logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    /// Served from the reference cache
    CacheHit,
    /// Joined a fetch already in flight for the same place
    Coalesced,
    /// Session quota spent; no request made
    QuotaExhausted,
    /// Provider returned references
    Fetched,
    /// Provider answered but had no photos
    Empty,
    /// Provider request failed; degraded to empty
    ProviderFailed,
    /// Blank place id
    InvalidInput,
}

/// References plus the path that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub references: Vec<PhotoReference>,
    pub outcome: ResolveOutcome,
}

impl Resolution {
    fn empty(outcome: ResolveOutcome) -> Self {
        Self {
            references: Vec::new(),
            outcome,
        }
    }
}

/// Counter snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ResolverStats {
    pub provider: ProviderKind,
    pub requests: u64,
    pub cache_hits: u64,
    pub coalesced: u64,
    pub quota_exhausted: u64,
    pub fetches: u64,
    pub provider_failures: u64,
    pub empty_results: u64,
    pub invalid_inputs: u64,
    pub cache_entries: usize,
    pub in_flight: usize,
    pub quota: QuotaSnapshot,
}

#[derive(Debug, Default)]
struct ResolverCounters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    coalesced: AtomicU64,
    quota_exhausted: AtomicU64,
    fetches: AtomicU64,
    provider_failures: AtomicU64,
    empty_results: AtomicU64,
    invalid_inputs: AtomicU64,
}

impl ResolverCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Result shared with every waiter of one fetch
#[derive(Debug, Clone)]
struct FetchBroadcast {
    references: Vec<PhotoReference>,
    failed: bool,
}

enum Registration {
    Hit(Vec<PhotoReference>),
    Exhausted,
    Join(broadcast::Receiver<FetchBroadcast>),
    Lead(broadcast::Receiver<FetchBroadcast>),
}

struct ResolverInner {
    cache: ReferenceCache,
    quota: QuotaGuard,
    provider: Arc<dyn PhotoProvider>,
    default_limit: usize,
    in_flight: Mutex<HashMap<PlaceId, broadcast::Sender<FetchBroadcast>>>,
    counters: ResolverCounters,
}

/// Resolves place ids to photo references with caching, a session quota and
/// per-place request coalescing. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct PhotoResolver {
    inner: Arc<ResolverInner>,
}

impl PhotoResolver {
    pub fn new(provider: Arc<dyn PhotoProvider>, quota_limit: u32, default_limit: usize) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                cache: ReferenceCache::new(),
                quota: QuotaGuard::new(quota_limit),
                provider,
                default_limit: default_limit.max(1),
                in_flight: Mutex::new(HashMap::new()),
                counters: ResolverCounters::default(),
            }),
        }
    }

    /// Build the configured provider and wrap it
    pub fn from_config(config: &ResolverConfig) -> FetchResult<Self> {
        let provider = provider::create_provider(config)?;
        Ok(Self::new(
            provider,
            config.quota_limit,
            config.default_limit,
        ))
    }

    /// Resolve `place_id` to at most `limit` references (legacy: at most 5).
    /// Every failure mode yields an empty list.
    pub async fn resolve(&self, place_id: &str, limit: Option<usize>) -> Vec<PhotoReference> {
        self.resolve_detailed(place_id, limit).await.references
    }

    /// Like [`resolve`](Self::resolve), also reporting how the result was produced.
    #[instrument(skip(self), fields(provider = %self.inner.provider.kind()))]
    pub async fn resolve_detailed(&self, place_id: &str, limit: Option<usize>) -> Resolution {
        let counters = &self.inner.counters;
        ResolverCounters::bump(&counters.requests);

        let Some(place_id) = PlaceId::parse(place_id) else {
            ResolverCounters::bump(&counters.invalid_inputs);
            debug!("Ignoring blank place id");
            return Resolution::empty(ResolveOutcome::InvalidInput);
        };
        let limit = limit.unwrap_or(self.inner.default_limit).max(1);

        if let Some(references) = self.inner.cache.get(&place_id) {
            ResolverCounters::bump(&counters.cache_hits);
            debug!(place_id = %place_id, "Photo reference cache hit");
            return Resolution {
                references: self.within_limit(references, limit),
                outcome: ResolveOutcome::CacheHit,
            };
        }

        match self.register(&place_id) {
            Registration::Hit(references) => {
                ResolverCounters::bump(&counters.cache_hits);
                Resolution {
                    references: self.within_limit(references, limit),
                    outcome: ResolveOutcome::CacheHit,
                }
            }
            Registration::Exhausted => {
                ResolverCounters::bump(&counters.quota_exhausted);
                debug!(
                    place_id = %place_id,
                    limit = self.inner.quota.limit(),
                    "Photo quota exhausted, skipping provider request"
                );
                Resolution::empty(ResolveOutcome::QuotaExhausted)
            }
            Registration::Join(rx) => {
                ResolverCounters::bump(&counters.coalesced);
                debug!(place_id = %place_id, "Joining in-flight photo fetch");
                let result = Self::await_fetch(rx, &place_id).await;
                Resolution {
                    references: self.within_limit(result.references, limit),
                    outcome: ResolveOutcome::Coalesced,
                }
            }
            Registration::Lead(rx) => {
                tokio::spawn(Self::run_fetch(
                    self.inner.clone(),
                    place_id.clone(),
                    limit,
                ));
                let result = Self::await_fetch(rx, &place_id).await;
                let outcome = if result.failed {
                    ResolveOutcome::ProviderFailed
                } else if result.references.is_empty() {
                    ResolveOutcome::Empty
                } else {
                    ResolveOutcome::Fetched
                };
                Resolution {
                    references: result.references,
                    outcome,
                }
            }
        }
    }

    /// Cut shared results down to this caller's limit. Legacy lists are
    /// already capped by the provider and ignore caller limits.
    fn within_limit(
        &self,
        mut references: Vec<PhotoReference>,
        limit: usize,
    ) -> Vec<PhotoReference> {
        if self.inner.provider.kind() == ProviderKind::Current {
            references.truncate(limit);
        }
        references
    }

    /// Decide, under the in-flight lock, whether this call leads a fetch,
    /// joins one, or stops early.
    fn register(&self, place_id: &PlaceId) -> Registration {
        let mut in_flight = self.inner.in_flight.lock();

        if let Some(tx) = in_flight.get(place_id) {
            return Registration::Join(tx.subscribe());
        }
        // A fetch may have completed between the unlocked cache check and here.
        if let Some(references) = self.inner.cache.get(place_id) {
            return Registration::Hit(references);
        }
        if !self.inner.quota.try_acquire() {
            return Registration::Exhausted;
        }

        let (tx, rx) = broadcast::channel(1);
        in_flight.insert(place_id.clone(), tx);
        debug!(
            place_id = %place_id,
            in_flight = in_flight.len(),
            quota_used = self.inner.quota.used(),
            "Starting provider fetch"
        );
        Registration::Lead(rx)
    }

    async fn await_fetch(
        mut rx: broadcast::Receiver<FetchBroadcast>,
        place_id: &PlaceId,
    ) -> FetchBroadcast {
        match rx.recv().await {
            Ok(result) => result,
            Err(e) => {
                warn!(place_id = %place_id, error = %e, "Photo fetch ended without a result");
                FetchBroadcast {
                    references: Vec::new(),
                    failed: true,
                }
            }
        }
    }

    async fn run_fetch(inner: Arc<ResolverInner>, place_id: PlaceId, limit: usize) {
        let mut guard = InFlightGuard {
            inner: inner.clone(),
            place_id: place_id.clone(),
            armed: true,
        };

        ResolverCounters::bump(&inner.counters.fetches);
        let result = match inner.provider.try_fetch(&place_id, limit).await {
            Ok(references) => FetchBroadcast {
                references,
                failed: false,
            },
            Err(e) => {
                ResolverCounters::bump(&inner.counters.provider_failures);
                warn!(
                    provider = %inner.provider.kind(),
                    place_id = %place_id,
                    error = %e,
                    error_kind = e.kind(),
                    "Photo reference fetch failed"
                );
                FetchBroadcast {
                    references: Vec::new(),
                    failed: true,
                }
            }
        };

        if result.references.is_empty() {
            if !result.failed {
                ResolverCounters::bump(&inner.counters.empty_results);
            }
        } else {
            inner.cache.put(&place_id, &result.references);
        }

        // Remove and publish under one lock so no late joiner misses the result.
        let mut in_flight = inner.in_flight.lock();
        if let Some(tx) = in_flight.remove(&place_id) {
            let _ = tx.send(result);
        }
        guard.armed = false;
    }

    /// Start a new session: the quota counter goes back to zero. Cached
    /// references are kept.
    pub fn reset_quota(&self) {
        self.inner.quota.reset();
    }

    pub fn quota(&self) -> &QuotaGuard {
        &self.inner.quota
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.inner.cache
    }

    pub fn provider_kind(&self) -> ProviderKind {
        self.inner.provider.kind()
    }

    pub fn default_limit(&self) -> usize {
        self.inner.default_limit
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    pub fn stats(&self) -> ResolverStats {
        let c = &self.inner.counters;
        ResolverStats {
            provider: self.provider_kind(),
            requests: c.requests.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
            quota_exhausted: c.quota_exhausted.load(Ordering::Relaxed),
            fetches: c.fetches.load(Ordering::Relaxed),
            provider_failures: c.provider_failures.load(Ordering::Relaxed),
            empty_results: c.empty_results.load(Ordering::Relaxed),
            invalid_inputs: c.invalid_inputs.load(Ordering::Relaxed),
            cache_entries: self.inner.cache.len(),
            in_flight: self.in_flight_count(),
            quota: self.inner.quota.snapshot(),
        }
    }

    /// Log the counters at info level
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            requests = stats.requests,
            cache_hits = stats.cache_hits,
            coalesced = stats.coalesced,
            quota_exhausted = stats.quota_exhausted,
            fetches = stats.fetches,
            provider_failures = stats.provider_failures,
            quota_used = stats.quota.used,
            quota_limit = stats.quota.limit,
            "Photo resolver statistics"
        );
    }
}

/// Drops the in-flight entry if the fetch task ends without publishing,
/// so waiters see a closed channel instead of hanging.
struct InFlightGuard {
    inner: Arc<ResolverInner>,
    place_id: PlaceId,
    armed: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.in_flight.lock().remove(&self.place_id);
        }
    }
}
