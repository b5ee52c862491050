// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Generic TTL + LRU cache with hit/miss accounting.
//!
//! Every mutating operation serialises on one async mutex that also owns the
//! LRU index. The entry map itself sits behind a short-lived `RwLock`, so
//! `peek` and `contains_key` never queue behind a running operation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::entry::{CacheConfig, CacheEntry, CacheMetrics, CounterValues};
use crate::error::{BoxError, PerfError, Result};
use crate::logging::PerfLogger;
use crate::observable::Observable;
use crate::perf_metrics;

const CATEGORY: &str = "CACHE";

/// Keys ordered by last touch; the smallest sequence is least recent.
struct LruIndex<K> {
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

impl<K: Clone> LruIndex<K> {
    fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Move `key` to most-recent, returning its new sequence.
    fn touch(&mut self, key: &K, previous: Option<u64>) -> u64 {
        if let Some(seq) = previous {
            self.order.remove(&seq);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        seq
    }

    fn remove(&mut self, seq: u64) {
        self.order.remove(&seq);
    }

    fn pop_oldest(&mut self) -> Option<K> {
        self.order.pop_first().map(|(_, key)| key)
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}

/// Lookups are counted only as hits or misses; the request total is their
/// sum, so a snapshot never sees one without the other.
#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CounterValues {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CounterValues {
            total_requests: hits + misses,
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

struct CacheInner<K, V> {
    config: CacheConfig,
    max_size: AtomicUsize,
    ops: tokio::sync::Mutex<LruIndex<K>>,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    counters: Counters,
    metrics: Observable<CacheMetrics>,
    logger: PerfLogger,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl<K, V> CacheInner<K, V> {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Cache entry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Cache entry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Take the operation lock. The LRU index left behind by `destroy` is
    /// dropped here when `destroy` could not take the lock itself.
    async fn lock_ops(&self) -> tokio::sync::MutexGuard<'_, LruIndex<K>>
    where
        K: Clone,
    {
        let mut lru = self.ops.lock().await;
        if self.destroyed.load(Ordering::Acquire) && !lru.order.is_empty() {
            lru.clear();
        }
        lru
    }

    fn abort_tasks(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl<K, V> Drop for CacheInner<K, V> {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Cloneable handle to a TTL/LRU cache.
pub struct SmartCache<K, V> {
    inner: Arc<CacheInner<K, V>>,
}

impl<K, V> Clone for SmartCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for SmartCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartCache")
            .field("len", &self.inner.read().len())
            .field("max_size", &self.inner.max_size.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K, V> SmartCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache. Background cleanup and metrics refresh start when a
    /// Tokio runtime is available.
    pub fn new(config: CacheConfig, logger: PerfLogger) -> Self {
        let initial = CacheMetrics {
            max_size: config.max_size,
            ..CacheMetrics::default()
        };
        let cache = Self {
            inner: Arc::new(CacheInner {
                max_size: AtomicUsize::new(config.max_size),
                ops: tokio::sync::Mutex::new(LruIndex::new()),
                entries: RwLock::new(HashMap::new()),
                counters: Counters::default(),
                metrics: Observable::new(initial),
                logger,
                tasks: Mutex::new(Vec::new()),
                destroyed: AtomicBool::new(false),
                config,
            }),
        };
        cache.spawn_background();
        cache
    }

    fn spawn_background(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available, cache background tasks disabled");
            return;
        };

        let config = &self.inner.config;
        let mut tasks = Vec::new();
        if !config.cleanup_interval.is_zero() {
            let weak = Arc::downgrade(&self.inner);
            tasks.push(handle.spawn(run_periodic(weak, config.cleanup_interval, |cache| {
                Box::pin(async move {
                    cache.cleanup().await;
                })
            })));
        }
        if config.enable_metrics && !config.metrics_interval.is_zero() {
            let weak = Arc::downgrade(&self.inner);
            tasks.push(handle.spawn(run_periodic(weak, config.metrics_interval, |cache| {
                Box::pin(async move {
                    cache.refresh_metrics();
                })
            })));
        }

        let mut slot = self.inner.tasks.lock().unwrap_or_else(|p| p.into_inner());
        *slot = tasks;
    }

    /// Look up `key`. Expired entries are dropped and count as both an
    /// expiration and a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut lru = self.inner.lock_ops().await;
        let counters = &self.inner.counters;
        let now = Instant::now();

        let outcome = {
            let mut entries = self.inner.write();
            let state = entries.get(key).map(|e| (e.is_expired(now), e.touch_seq, e.age(now)));
            match state {
                None => Lookup::Miss,
                Some((true, seq, age)) => {
                    entries.remove(key);
                    lru.remove(seq);
                    Lookup::Expired(age)
                }
                Some((false, seq, _)) => {
                    let new_seq = lru.touch(key, Some(seq));
                    match entries.get_mut(key) {
                        Some(entry) => {
                            entry.touch(now, new_seq);
                            Lookup::Hit(entry.value.clone(), entry.access_count)
                        }
                        None => Lookup::Miss,
                    }
                }
            }
        };
        drop(lru);

        let value = match outcome {
            Lookup::Miss => {
                Counters::bump(&counters.misses, 1);
                None
            }
            Lookup::Expired(age) => {
                Counters::bump(&counters.expirations, 1);
                Counters::bump(&counters.misses, 1);
                self.debug(
                    "Cache entry expired",
                    perf_metrics! {
                        "key" => format!("{key:?}"),
                        "age_ms" => age.as_millis() as u64,
                    },
                );
                None
            }
            Lookup::Hit(value, access_count) => {
                Counters::bump(&counters.hits, 1);
                self.debug(
                    "Cache hit",
                    perf_metrics! {
                        "key" => format!("{key:?}"),
                        "access_count" => access_count,
                    },
                );
                Some(value)
            }
        };
        self.refresh_metrics();
        value
    }

    /// Insert with the default TTL.
    pub async fn put(&self, key: K, value: V) {
        let ttl = self.inner.config.default_ttl;
        self.put_with_ttl(key, value, ttl).await;
    }

    /// Insert or replace. A new key at capacity evicts the least recently
    /// used entry first.
    pub async fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        if self.is_destroyed() {
            tracing::debug!("Ignoring put on destroyed cache");
            return;
        }
        let max_size = self.max_size();
        if max_size == 0 {
            return;
        }

        let mut lru = self.inner.lock_ops().await;
        let now = Instant::now();
        let (evicted, size) = {
            let mut entries = self.inner.write();
            // destroy() clears the map under this same write lock
            if self.is_destroyed() {
                tracing::debug!("Ignoring put on destroyed cache");
                return;
            }
            let previous = entries.get(&key).map(|e| e.touch_seq);
            let mut evicted = None;
            if previous.is_none() && entries.len() >= max_size {
                if let Some(oldest) = lru.pop_oldest() {
                    entries.remove(&oldest);
                    evicted = Some(oldest);
                }
            }
            let seq = lru.touch(&key, previous);
            entries.insert(key.clone(), CacheEntry::new(value, ttl, now, seq));
            (evicted, entries.len())
        };
        drop(lru);

        if let Some(oldest) = evicted {
            Counters::bump(&self.inner.counters.evictions, 1);
            self.debug(
                "LRU eviction",
                perf_metrics! {
                    "evicted_key" => format!("{oldest:?}"),
                    "cache_size" => size,
                },
            );
        }
        self.debug(
            "Cache put",
            perf_metrics! {
                "key" => format!("{key:?}"),
                "ttl_ms" => ttl.as_millis() as u64,
                "cache_size" => size,
            },
        );
        self.refresh_metrics();
    }

    /// Delete `key` regardless of expiry, returning the stored value.
    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut lru = self.inner.lock_ops().await;
        let removed = self.inner.write().remove(key);
        if let Some(entry) = &removed {
            lru.remove(entry.touch_seq);
        }
        drop(lru);

        if removed.is_some() {
            self.debug("Cache remove", perf_metrics! { "key" => format!("{key:?}") });
        }
        self.refresh_metrics();
        removed.map(|e| e.value)
    }

    /// Return the cached value or compute, store and return a new one.
    ///
    /// Concurrent callers missing on the same key each run `factory`; the
    /// last write wins. A failing factory stores nothing and its error is
    /// returned as [`PerfError::Factory`].
    pub async fn get_or_put<F, Fut, E>(&self, key: K, ttl: Option<Duration>, factory: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<BoxError>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let computed = self
            .inner
            .logger
            .measure_async(CATEGORY, "compute_value", async {
                factory().await.map_err(Into::<BoxError>::into)
            })
            .await
            .map_err(PerfError::Factory)?;

        let ttl = ttl.unwrap_or(self.inner.config.default_ttl);
        self.put_with_ttl(key, computed.clone(), ttl).await;
        Ok(computed)
    }

    /// Remove every expired entry, returning how many were dropped.
    pub async fn cleanup(&self) -> usize {
        let mut lru = self.inner.lock_ops().await;
        let now = Instant::now();
        let (removed, remaining) = {
            let mut entries = self.inner.write();
            let expired: Vec<K> = entries
                .iter()
                .filter(|(_, e)| e.is_expired(now))
                .map(|(k, _)| k.clone())
                .collect();
            for key in &expired {
                if let Some(entry) = entries.remove(key) {
                    lru.remove(entry.touch_seq);
                }
            }
            (expired.len(), entries.len())
        };
        drop(lru);

        Counters::bump(&self.inner.counters.expirations, removed as u64);
        if removed > 0 && self.inner.config.enable_metrics {
            self.inner.logger.info(
                CATEGORY,
                "Cleanup completed",
                perf_metrics! {
                    "expired_entries" => removed,
                    "remaining_entries" => remaining,
                },
            );
        }
        self.refresh_metrics();
        removed
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut lru = self.inner.lock_ops().await;
        let cleared = {
            let mut entries = self.inner.write();
            let n = entries.len();
            entries.clear();
            n
        };
        lru.clear();
        drop(lru);

        if self.inner.config.enable_metrics {
            self.inner.logger.info(
                CATEGORY,
                "Cache cleared",
                perf_metrics! { "cleared_entries" => cleared },
            );
        }
        self.refresh_metrics();
    }

    /// Read a live value without touching LRU order or metrics.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.inner
            .read()
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        self.inner
            .read()
            .get(key)
            .is_some_and(|e| !e.is_expired(now))
    }

    /// Stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Keys of entries that have not expired.
    pub fn keys(&self) -> Vec<K> {
        let now = Instant::now();
        self.inner
            .read()
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size.load(Ordering::Relaxed)
    }

    /// Fresh metrics computed from the live counters.
    pub fn stats(&self) -> CacheMetrics {
        CacheMetrics::compute(self.inner.counters.snapshot(), self.len(), self.max_size())
    }

    /// Published metrics, refreshed on every operation and periodically.
    pub fn metrics(&self) -> &Observable<CacheMetrics> {
        &self.inner.metrics
    }

    /// Change the capacity bound, evicting LRU entries until it is met.
    /// Returns how many entries were evicted.
    pub async fn resize(&self, new_max_size: usize) -> usize {
        let mut lru = self.inner.lock_ops().await;
        let old_max = self.inner.max_size.swap(new_max_size, Ordering::Relaxed);
        let (evicted, remaining) = {
            let mut entries = self.inner.write();
            let mut evicted = 0usize;
            while entries.len() > new_max_size {
                let Some(oldest) = lru.pop_oldest() else { break };
                entries.remove(&oldest);
                evicted += 1;
            }
            (evicted, entries.len())
        };
        drop(lru);

        Counters::bump(&self.inner.counters.evictions, evicted as u64);
        if self.inner.config.enable_metrics {
            self.inner.logger.info(
                CATEGORY,
                "Cache resized",
                perf_metrics! {
                    "old_size" => old_max,
                    "new_size" => new_max_size,
                    "current_entries" => remaining,
                },
            );
        }
        self.refresh_metrics();
        evicted
    }

    /// Drop the least used entries (lowest access count, then least recently
    /// touched) so the cache falls back towards three quarters of capacity.
    /// At most a quarter of the entries go in one call.
    pub async fn optimize(&self) -> usize {
        let mut lru = self.inner.lock_ops().await;
        let max_size = self.max_size();
        let (removed, remaining) = {
            let mut entries = self.inner.write();
            let len = entries.len();
            let target = (max_size as f64 * 0.75).floor() as usize;
            let to_remove = (len / 4).min(len.saturating_sub(target));
            if to_remove > 0 {
                let mut ranked: Vec<(u64, u64, K)> = entries
                    .iter()
                    .map(|(k, e)| (e.access_count, e.touch_seq, k.clone()))
                    .collect();
                ranked.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
                for (_, seq, key) in ranked.into_iter().take(to_remove) {
                    entries.remove(&key);
                    lru.remove(seq);
                }
            }
            (to_remove, entries.len())
        };
        drop(lru);

        if removed > 0 {
            Counters::bump(&self.inner.counters.evictions, removed as u64);
            if self.inner.config.enable_metrics {
                self.inner.logger.info(
                    CATEGORY,
                    "Cache optimized",
                    perf_metrics! {
                        "removed_entries" => removed,
                        "remaining_entries" => remaining,
                    },
                );
            }
            self.refresh_metrics();
        }
        removed
    }

    /// Cancel background work and drop all state. Later puts are ignored.
    pub fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::Release);
        self.inner.abort_tasks();
        self.inner.write().clear();
        // a held lock clears the index on its next acquisition
        if let Ok(mut lru) = self.inner.ops.try_lock() {
            lru.clear();
        }
        self.refresh_metrics();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Recompute and publish the metrics snapshot.
    pub fn refresh_metrics(&self) {
        if self.inner.config.enable_metrics {
            self.inner.metrics.set(self.stats());
        }
    }

    fn debug(&self, message: &str, metrics: crate::logging::Metrics) {
        if self.inner.config.enable_metrics {
            self.inner.logger.debug(CATEGORY, message, metrics);
        }
    }
}

enum Lookup<V> {
    Miss,
    Expired(Duration),
    Hit(V, u64),
}

type Job<K, V> =
    fn(SmartCache<K, V>) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Run `job` every `period` for as long as the cache is alive.
async fn run_periodic<K, V>(weak: Weak<CacheInner<K, V>>, period: Duration, job: Job<K, V>)
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else { break };
        job(SmartCache { inner }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LoggerConfig;

    fn quiet_logger() -> PerfLogger {
        PerfLogger::new(LoggerConfig {
            console_enabled: false,
            ..LoggerConfig::default()
        })
    }

    fn cache(max_size: usize) -> SmartCache<String, u32> {
        SmartCache::new(CacheConfig::default().with_max_size(max_size), quiet_logger())
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_then_get() {
        let cache = cache(10);
        cache.put("a".into(), 1).await;
        assert_eq!(cache.get(&"a".to_string()).await, Some(1));
        assert_eq!(cache.get(&"b".to_string()).await, None);

        let stats = cache.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = cache(10);
        cache
            .put_with_ttl("k".into(), 7, Duration::from_millis(100))
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get(&"k".to_string()).await, Some(7));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get(&"k".to_string()).await, None);
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits + stats.misses, stats.total_requests);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_pressure_scenario() {
        let cache = cache(2);
        cache.put("a".into(), 1).await;
        cache.put("b".into(), 2).await;
        cache.put("c".into(), 3).await;

        assert_eq!(cache.get(&"a".to_string()).await, None);
        assert_eq!(cache.get(&"b".to_string()).await, Some(2));
        assert_eq!(cache.get(&"c".to_string()).await, Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_refreshes_lru_position() {
        let cache = cache(2);
        cache.put("a".into(), 1).await;
        cache.put("b".into(), 2).await;
        assert_eq!(cache.get(&"a".to_string()).await, Some(1));
        cache.put("c".into(), 3).await;

        assert!(cache.contains_key(&"a".to_string()));
        assert!(!cache.contains_key(&"b".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_key_does_not_evict() {
        let cache = cache(2);
        cache.put("a".into(), 1).await;
        cache.put("b".into(), 2).await;
        cache.put("a".into(), 10).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&"a".to_string()), Some(10));
        assert_eq!(cache.stats().evictions, 0);

        // "b" is now the least recent
        cache.put("c".into(), 3).await;
        assert!(!cache.contains_key(&"b".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_does_not_touch_metrics_or_order() {
        let cache = cache(2);
        cache.put("a".into(), 1).await;
        cache.put("b".into(), 2).await;
        assert_eq!(cache.peek(&"a".to_string()), Some(1));
        assert_eq!(cache.stats().total_requests, 0);

        cache.put("c".into(), 3).await;
        assert!(!cache.contains_key(&"a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_honours_expiry() {
        let cache = cache(4);
        cache
            .put_with_ttl("k".into(), 1, Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.peek(&"k".to_string()), None);
        assert!(!cache.contains_key(&"k".to_string()));
        assert!(cache.keys().is_empty());
        // still stored until swept
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_returns_value() {
        let cache = cache(4);
        cache.put("a".into(), 1).await;
        assert_eq!(cache.remove(&"a".to_string()).await, Some(1));
        assert_eq!(cache.remove(&"a".to_string()).await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_counts_expired() {
        let cache = cache(10);
        cache
            .put_with_ttl("short".into(), 1, Duration::from_millis(10))
            .await;
        cache.put("long".into(), 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.cleanup().await, 1);
        assert_eq!(cache.keys(), vec!["long".to_string()]);
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.cleanup().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_cleanup_sweeps() {
        let config = CacheConfig {
            max_size: 10,
            cleanup_interval: Duration::from_secs(1),
            ..CacheConfig::default()
        };
        let cache: SmartCache<String, u32> = SmartCache::new(config, quiet_logger());
        cache
            .put_with_ttl("k".into(), 1, Duration::from_millis(100))
            .await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_evicts_lru_and_keeps_bound() {
        let cache = cache(5);
        for (i, key) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            cache.put(key.to_string(), i as u32).await;
        }
        assert_eq!(cache.resize(3).await, 2);
        assert_eq!(cache.max_size(), 3);
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["c", "d", "e"]);

        cache.put("f".into(), 5).await;
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains_key(&"c".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimize_drops_least_used() {
        let cache = cache(8);
        for i in 0..8u32 {
            cache.put(format!("k{i}"), i).await;
        }
        for i in 2..8u32 {
            cache.get(&format!("k{i}")).await;
        }
        // len 8, max 8: min(8 / 4, 8 - 6) = 2
        assert_eq!(cache.optimize().await, 2);
        assert!(!cache.contains_key(&"k0".to_string()));
        assert!(!cache.contains_key(&"k1".to_string()));
        assert_eq!(cache.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimize_noop_under_threshold() {
        let cache = cache(100);
        for i in 0..10u32 {
            cache.put(format!("k{i}"), i).await;
        }
        assert_eq!(cache.optimize().await, 0);
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_put_computes_once_then_hits() {
        let cache = cache(4);
        let value = cache
            .get_or_put("k".into(), None, || async { Ok::<_, PerfError>(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);

        let again = cache
            .get_or_put("k".into(), None, || async { Ok::<_, PerfError>(0) })
            .await
            .unwrap();
        assert_eq!(again, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_put_propagates_factory_error() {
        let cache = cache(4);
        let result = cache
            .get_or_put("k".into(), None, || async {
                Err::<u32, _>(std::io::Error::other("backend down"))
            })
            .await;
        assert!(matches!(result, Err(PerfError::Factory(_))));
        assert!(!cache.contains_key(&"k".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_and_destroy() {
        let cache = cache(4);
        cache.put("a".into(), 1).await;
        cache.clear().await;
        assert!(cache.is_empty());

        cache.put("b".into(), 2).await;
        cache.destroy();
        assert!(cache.is_destroyed());
        assert!(cache.is_empty());
        cache.put("c".into(), 3).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_put_waiting_on_lock_is_dropped_after_destroy() {
        let cache = cache(4);
        cache.put("a".into(), 1).await;

        let held = cache.inner.ops.lock().await;
        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.put("late".into(), 2).await }
        });
        // let the put pass its entry check and queue on the lock
        tokio::task::yield_now().await;
        cache.destroy();
        drop(held);
        pending.await.unwrap();

        assert!(cache.is_empty());
        assert!(!cache.contains_key(&"late".to_string()));
        assert!(cache.inner.ops.lock().await.order.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_observable_tracks_operations() {
        let cache = cache(4);
        let rx = cache.metrics().subscribe();
        cache.put("a".into(), 1).await;
        cache.get(&"a".to_string()).await;
        let metrics = rx.borrow().clone();
        assert_eq!(metrics.current_size, 1);
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.memory_usage_bytes, 1024);
        assert_eq!(metrics.utilization_rate, 0.25);
    }

    #[test]
    fn test_cache_works_without_background_runtime() {
        let cache: SmartCache<u32, u32> = SmartCache::new(CacheConfig::default(), quiet_logger());
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            cache.put(1, 2).await;
            assert_eq!(cache.get(&1).await, Some(2));
        });
    }
}
