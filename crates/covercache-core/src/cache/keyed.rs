use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info};

use super::{CacheEntry, CacheKey};
use crate::api::ApiError;

/// Default entry lifetime when the caller does not pass one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

type PendingFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct InFlight<V, E> {
    id: u64,
    future: PendingFetch<V, E>,
}

struct State<V, E> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    in_flight: HashMap<CacheKey, InFlight<V, E>>,
    next_flight_id: u64,
}

struct Inner<V, E> {
    default_ttl: Duration,
    state: Mutex<State<V, E>>,
}

impl<V, E> Inner<V, E> {
    fn lock(&self) -> MutexGuard<'_, State<V, E>> {
        // Every critical section is plain map manipulation, so a poisoned
        // lock still holds consistent data.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Snapshot of what a cache currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Stored entries, including ones that have expired but not been purged.
    pub size: usize,
    pub expired: usize,
    pub in_flight: usize,
    pub keys: Vec<String>,
}

/// Parameterized, TTL-based read-through cache.
///
/// Keyed by [`CacheKey`] (resource plus canonical parameters). Expiry is
/// checked lazily on read; nothing runs in the background. Cloning yields
/// another handle to the same cache.
///
/// Concurrent [`get_or_fetch`](Self::get_or_fetch) calls for one key share a
/// single pending fetch. Invalidating a key while its fetch is pending
/// detaches that fetch: callers already waiting still receive its result,
/// but it is not stored and later callers start a new fetch.
pub struct KeyedTtlCache<V, E = ApiError> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for KeyedTtlCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> Default for KeyedTtlCache<V, E>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V, E> KeyedTtlCache<V, E>
where
    V: Clone,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                default_ttl,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    in_flight: HashMap::new(),
                    next_flight_id: 0,
                }),
            }),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Cached value for `key`, or `None` if absent or expired.
    ///
    /// An expired entry is dropped on the way out.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        lookup(&mut self.inner.lock(), key, Instant::now())
    }

    /// Store `value` under `key` with the default TTL, replacing any entry.
    pub fn set(&self, key: &CacheKey, value: V) {
        self.set_with_ttl(key, value, self.inner.default_ttl);
    }

    /// Store `value` under `key` with its own TTL, replacing any entry.
    pub fn set_with_ttl(&self, key: &CacheKey, value: V, ttl: Duration) {
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache store");
        self.inner
            .lock()
            .entries
            .insert(key.clone(), CacheEntry::new(value, ttl));
    }

    /// Whether a valid entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Remove one key's entry and detach any pending fetch for it.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut state = self.inner.lock();
        let had_entry = state.entries.remove(key).is_some();
        let had_flight = state.in_flight.remove(key).is_some();
        if had_entry || had_flight {
            info!(key = %key, "Cache invalidated");
        }
    }

    /// Remove every key whose canonical form starts with `prefix`,
    /// e.g. all parameter variants of one resource.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut state = self.inner.lock();
        let before = state.entries.len();
        state.entries.retain(|k, _| !k.starts_with(prefix));
        state.in_flight.retain(|k, _| !k.starts_with(prefix));
        let removed = before - state.entries.len();
        info!(prefix, removed, "Cache prefix invalidated");
        removed
    }

    /// Drop every entry and detach every pending fetch.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.entries.clear();
        state.in_flight.clear();
    }

    /// Purge expired entries. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut state = self.inner.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_valid_at(now));
        before - state.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = self.inner.lock();
        let mut keys: Vec<String> = state.entries.keys().map(|k| k.to_string()).collect();
        keys.sort();
        CacheStats {
            size: state.entries.len(),
            expired: state
                .entries
                .values()
                .filter(|entry| !entry.is_valid_at(now))
                .count(),
            in_flight: state.in_flight.len(),
            keys,
        }
    }

    /// Age of the entry stored under `key`, if one is stored and valid.
    pub fn age_display(&self, key: &CacheKey) -> Option<String> {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .get(key)
            .filter(|entry| entry.is_valid_at(now))
            .map(CacheEntry::age_display)
    }
}

impl<V, E> KeyedTtlCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Read-through lookup.
    ///
    /// Returns the cached value when valid (unless `force`), otherwise runs
    /// `fetch`, stores its successful result for `ttl` and returns it.
    /// Failures are returned to every waiting caller and never stored.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        force: bool,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.get_or_fetch_with_ttl(key, force, move || {
            let fut = fetch();
            async move { fut.await.map(|value| (value, ttl)) }
        })
        .await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), but the fetch decides the
    /// TTL of the value it produced.
    pub async fn get_or_fetch_with_ttl<F, Fut>(
        &self,
        key: CacheKey,
        force: bool,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(V, Duration), E>> + Send + 'static,
    {
        if let Some(pending) = self.hit_or_join(&key, force) {
            return match pending {
                Lookup::Hit(value) => Ok(value),
                Lookup::Join(future) => future.await,
            };
        }

        // Build the request outside the lock; it is not polled until awaited.
        let request = fetch();

        let future = {
            let mut state = self.inner.lock();
            match state.in_flight.get(&key) {
                // Someone else started the same fetch while we were building ours
                Some(existing) if !force => {
                    debug!(key = %key, "Joining in-flight fetch");
                    existing.future.clone()
                }
                _ => {
                    let id = state.next_flight_id;
                    state.next_flight_id += 1;
                    let future = self.spawn_flight(key.clone(), id, request);
                    state.in_flight.insert(
                        key.clone(),
                        InFlight {
                            id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        future.await
    }

    fn hit_or_join(&self, key: &CacheKey, force: bool) -> Option<Lookup<V, E>> {
        if force {
            debug!(key = %key, "Cache bypassed (forced refresh)");
            return None;
        }
        let mut state = self.inner.lock();
        if let Some(value) = lookup(&mut state, key, Instant::now()) {
            debug!(key = %key, "Cache hit");
            return Some(Lookup::Hit(value));
        }
        if let Some(flight) = state.in_flight.get(key) {
            debug!(key = %key, "Joining in-flight fetch");
            return Some(Lookup::Join(flight.future.clone()));
        }
        debug!(key = %key, "Cache miss");
        None
    }

    fn spawn_flight<Fut>(&self, key: CacheKey, id: u64, request: Fut) -> PendingFetch<V, E>
    where
        Fut: Future<Output = Result<(V, Duration), E>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        async move {
            let result = request.await;
            let mut state = inner.lock();
            // Only the current flight for this key may store its result;
            // a detached or superseded one just reports back to its waiters.
            let current = state.in_flight.get(&key).map(|f| f.id) == Some(id);
            if current {
                state.in_flight.remove(&key);
                if let Ok((ref value, ttl)) = result {
                    debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache store");
                    state
                        .entries
                        .insert(key.clone(), CacheEntry::new(value.clone(), ttl));
                }
            } else {
                debug!(key = %key, "Discarding result of detached fetch");
            }
            result.map(|(value, _)| value)
        }
        .boxed()
        .shared()
    }
}

enum Lookup<V, E> {
    Hit(V),
    Join(PendingFetch<V, E>),
}

fn lookup<V: Clone, E>(state: &mut State<V, E>, key: &CacheKey, now: Instant) -> Option<V> {
    match state.entries.get(key) {
        Some(entry) if entry.is_valid_at(now) => Some(entry.value.clone()),
        Some(_) => {
            state.entries.remove(key);
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn types_key(params: serde_json::Value) -> CacheKey {
        CacheKey::from_params("policies/types", &params).unwrap()
    }

    #[test]
    fn test_get_set_round_trip() {
        let cache: KeyedTtlCache<Vec<String>> = KeyedTtlCache::default();
        let key = CacheKey::new("policies/categories");
        assert_eq!(cache.get(&key), None);

        cache.set(&key, vec!["motor".into()]);
        assert_eq!(cache.get(&key), Some(vec!["motor".to_string()]));
    }

    #[test]
    fn test_empty_value_is_distinct_from_absent() {
        let cache: KeyedTtlCache<Vec<u32>> = KeyedTtlCache::default();
        let key = CacheKey::new("assets");
        cache.set(&key, Vec::new());
        assert_eq!(cache.get(&key), Some(Vec::new()));
    }

    #[test]
    fn test_different_params_are_isolated() {
        let cache: KeyedTtlCache<&str> = KeyedTtlCache::default();
        cache.set(&types_key(json!({"category": "motor"})), "A");
        assert_eq!(cache.get(&types_key(json!({"category": "medical"}))), None);
        assert_eq!(cache.get(&types_key(json!({"category": "motor"}))), Some("A"));
    }

    #[test]
    fn test_param_order_hits_same_slot() {
        let cache: KeyedTtlCache<&str> = KeyedTtlCache::default();
        cache.set(&types_key(json!({"a": 1, "b": 2})), "A");
        assert_eq!(cache.get(&types_key(json!({"b": 2, "a": 1}))), Some("A"));
    }

    #[test]
    fn test_expired_entry_is_absent_and_dropped() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let key = CacheKey::new("dashboard");
        cache.set_with_ttl(&key, 7, Duration::ZERO);
        assert_eq!(cache.stats().size, 1);
        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_set_overwrites() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let key = CacheKey::new("dashboard");
        cache.set(&key, 1);
        cache.set(&key, 2);
        assert_eq!(cache.get(&key), Some(2));
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let key = CacheKey::new("policies/my-policies");
        cache.set(&key, 1);
        cache.invalidate(&key);
        cache.invalidate(&key);
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn test_invalidate_prefix_drops_all_variants() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        cache.set(&types_key(json!({"category": "motor"})), 1);
        cache.set(&types_key(json!({"search": "car"})), 2);
        cache.set(&CacheKey::new("policies/types/featured"), 3);
        cache.set(&CacheKey::new("policies/categories"), 4);

        assert_eq!(cache.invalidate_prefix("policies/types"), 3);
        assert_eq!(cache.get(&CacheKey::new("policies/categories")), Some(4));
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_cleanup_and_stats() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        cache.set(&CacheKey::new("b"), 1);
        cache.set_with_ttl(&CacheKey::new("a"), 2, Duration::ZERO);

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.keys, vec!["a".to_string(), "b".to_string()]);

        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.stats().keys, vec!["b".to_string()]);
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("dashboard");

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = cache
                .get_or_fetch(key.clone(), Duration::from_secs(60), false, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ApiError>(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_force_bypasses_valid_entry() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let key = CacheKey::new("dashboard");
        cache.set(&key, 1);

        let value = cache
            .get_or_fetch(key.clone(), Duration::from_secs(60), true, || async {
                Ok::<_, ApiError>(2)
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(cache.get(&key), Some(2));
    }

    #[tokio::test]
    async fn test_get_or_fetch_does_not_store_errors() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let key = CacheKey::new("dashboard");

        let err = cache
            .get_or_fetch(key.clone(), Duration::from_secs(60), false, || async {
                Err::<u32, _>(ApiError::ServerError {
                    status: 503,
                    message: "down".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ServerError { status: 503, .. }));
        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let key = CacheKey::new("policies/my-policies");

        let first = {
            let calls = Arc::clone(&calls);
            cache.get_or_fetch(key.clone(), Duration::from_secs(60), false, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = release_rx.await;
                Ok::<_, ApiError>(5)
            })
        };
        let second = {
            let calls = Arc::clone(&calls);
            cache.get_or_fetch(key.clone(), Duration::from_secs(60), false, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>(99)
            })
        };

        let release = async move {
            tokio::task::yield_now().await;
            let _ = release_tx.send(());
        };
        let (a, b, ()) = tokio::join!(first, second, release);

        assert_eq!(a.unwrap(), 5);
        assert_eq!(b.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_detaches_pending_fetch() {
        let cache: KeyedTtlCache<u32> = KeyedTtlCache::default();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let key = CacheKey::new("policies/my-policies");

        let stale = cache.get_or_fetch(key.clone(), Duration::from_secs(60), false, move || async move {
            let _ = release_rx.await;
            Ok::<_, ApiError>(1)
        });
        let mutate = {
            let cache = cache.clone();
            let key = key.clone();
            async move {
                tokio::task::yield_now().await;
                cache.invalidate(&key);
                let _ = release_tx.send(());
            }
        };
        let (result, ()) = tokio::join!(stale, mutate);

        // The waiter still gets its answer, but it is not cached
        assert_eq!(result.unwrap(), 1);
        assert_eq!(cache.get(&key), None);

        let fresh = cache
            .get_or_fetch(key.clone(), Duration::from_secs(60), false, || async {
                Ok::<_, ApiError>(2)
            })
            .await
            .unwrap();
        assert_eq!(fresh, 2);
    }
}
