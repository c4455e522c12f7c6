use std::future::Future;
use std::time::Duration;

use tracing::info;

use super::{CacheKey, KeyedTtlCache};
use crate::api::ApiError;

/// A cache holding at most one value for one fixed resource.
///
/// Thin adapter over [`KeyedTtlCache`] with a fixed key and TTL; used by the
/// dashboard, policies and assets services. Cloning yields another handle
/// to the same slot, so a service can invalidate a slot it does not own.
pub struct SingleSlot<V, E = ApiError> {
    cache: KeyedTtlCache<V, E>,
    key: CacheKey,
    ttl: Duration,
}

impl<V, E> Clone for SingleSlot<V, E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            key: self.key.clone(),
            ttl: self.ttl,
        }
    }
}

impl<V, E> SingleSlot<V, E>
where
    V: Clone,
{
    pub fn new(resource: &str, ttl: Duration) -> Self {
        Self {
            cache: KeyedTtlCache::new(ttl),
            key: CacheKey::new(resource),
            ttl,
        }
    }

    pub fn resource(&self) -> &str {
        self.key.resource()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if present and unexpired, without fetching.
    pub fn peek(&self) -> Option<V> {
        self.cache.get(&self.key)
    }

    /// Age of the cached value, if any.
    pub fn age_display(&self) -> Option<String> {
        self.cache.age_display(&self.key)
    }

    /// Discard the stored value. Safe to call when already empty.
    pub fn clear(&self) {
        info!(resource = %self.key, "Clearing cached resource");
        self.cache.invalidate(&self.key);
    }
}

impl<V, E> SingleSlot<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Return the cached value, or fetch, store and return a fresh one.
    /// `force` always fetches. Fetch failures propagate unchanged.
    pub async fn get<F, Fut>(&self, force: bool, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.cache
            .get_or_fetch(self.key.clone(), self.ttl, force, fetch)
            .await
    }

    /// Like [`get`](Self::get), with the fetch choosing the TTL of its result.
    pub async fn get_with_ttl<F, Fut>(&self, force: bool, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(V, Duration), E>> + Send + 'static,
    {
        self.cache
            .get_or_fetch_with_ttl(self.key.clone(), force, fetch)
            .await
    }
}
