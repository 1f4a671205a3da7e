//! Freshness orchestration for the release snapshot
//!
//! Each read decides between the cached snapshot, a fresh upstream fetch, and
//! the stale cached snapshot when a fetch fails:
//!
//! ```text
//!            ┌──────────── hit (not forced) ───────────▶ cache
//! read ──────┤
//!            └── miss / corrupt / forced ──▶ fetch ──┬─ ok, non-empty ─▶ write ─▶ fresh
//!                                                    ├─ ok, empty ─────────────▶ fresh (not written)
//!                                                    └─ error ──┬─ cached ─────▶ stale + error
//!                                                               └─ nothing ────▶ fresh (empty) + error
//! ```
//!
//! The snapshot is written whole under one key. Concurrent misses may fetch
//! and write twice; the last write wins.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{CACHE_KEY, CACHE_TTL_SECS};
use crate::release::cache::KeyValueStore;
use crate::release::error::{CacheError, ClassifiedError};
use crate::release::normalizer::{Normalized, ReleaseNormalizer};
use crate::release::source::ReleaseSource;
use crate::release::types::{ReleaseSnapshot, SnapshotRead};

pub struct FreshnessOrchestrator<S: KeyValueStore> {
    store: Arc<S>,
    source: Arc<dyn ReleaseSource>,
    normalizer: ReleaseNormalizer,
    auth_token: String,
    cache_key: String,
    ttl: Duration,
}

impl<S: KeyValueStore> FreshnessOrchestrator<S> {
    pub fn new(
        store: Arc<S>,
        source: Arc<dyn ReleaseSource>,
        normalizer: ReleaseNormalizer,
        auth_token: &str,
    ) -> Self {
        Self {
            store,
            source,
            normalizer,
            auth_token: auth_token.to_string(),
            cache_key: CACHE_KEY.to_string(),
            ttl: Duration::from_secs(CACHE_TTL_SECS),
        }
    }

    /// Override the snapshot key and time-to-live
    pub fn with_cache(mut self, key: &str, ttl: Duration) -> Self {
        self.cache_key = key.to_string();
        self.ttl = ttl;
        self
    }

    /// Read the snapshot, fetching upstream on miss or when forced
    ///
    /// Never fails: upstream failures fall back to the cached snapshot, or to
    /// an empty snapshot carrying the error when nothing is cached.
    pub async fn read(&self, force_refresh: bool) -> SnapshotRead {
        let cached = self.read_cached().await;

        if !force_refresh {
            if let Some(snapshot) = cached {
                debug!("Serving {} releases from cache", snapshot.len());
                return SnapshotRead::cached(snapshot);
            }
        }

        match self
            .normalizer
            .collect(self.source.as_ref(), &self.auth_token)
            .await
        {
            Ok(Normalized { snapshot, error }) => {
                if snapshot.is_empty() {
                    debug!("Fresh fetch produced no releases, cache left untouched");
                } else {
                    self.write_cached(&snapshot).await;
                }
                SnapshotRead::fresh(snapshot, error)
            }
            Err(e) => match cached {
                Some(snapshot) => {
                    warn!(
                        "Upstream fetch failed, serving {} stale releases: {}",
                        snapshot.len(),
                        e
                    );
                    SnapshotRead::stale(snapshot, e)
                }
                None => {
                    error!("Upstream fetch failed with nothing cached: {}", e);
                    SnapshotRead::fresh(ReleaseSnapshot::new(), Some(e))
                }
            },
        }
    }

    /// Read, then force one refresh if the result is empty
    ///
    /// The retry is skipped when the first read failed critically (auth or
    /// rate limit), since a second attempt would fail the same way.
    pub async fn read_with_retry(&self) -> SnapshotRead {
        let first = self.read(false).await;

        let blocked = first
            .error
            .as_ref()
            .is_some_and(ClassifiedError::is_critical);

        if first.snapshot.is_empty() && !blocked {
            info!("Empty release snapshot, retrying once with a forced refresh");
            return self.read(true).await;
        }

        first
    }

    /// Drop the cached snapshot
    pub async fn purge(&self) -> Result<(), CacheError> {
        self.store.delete(&self.cache_key).await?;
        info!("Purged cached snapshot {}", self.cache_key);
        Ok(())
    }

    /// Load and decode the cached snapshot; read and decode failures count as a miss
    async fn read_cached(&self) -> Option<ReleaseSnapshot> {
        let raw = self
            .store
            .get(&self.cache_key)
            .await
            .inspect_err(|e| warn!("Failed to read cache entry {}: {}", self.cache_key, e))
            .ok()
            .flatten()?;

        ReleaseSnapshot::from_json(&raw)
            .inspect_err(|e| warn!("Discarding undecodable cache entry {}: {}", self.cache_key, e))
            .ok()
    }

    async fn write_cached(&self, snapshot: &ReleaseSnapshot) {
        let raw = match snapshot.to_json() {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to serialize release snapshot: {}", e);
                return;
            }
        };

        match self
            .store
            .put(&self.cache_key, &raw, Some(self.ttl))
            .await
        {
            Ok(()) => info!(
                "Cached {} releases under {} for {}s",
                snapshot.len(),
                self.cache_key,
                self.ttl.as_secs()
            ),
            Err(e) => error!("Failed to write cache entry {}: {}", self.cache_key, e),
        }
    }
}
