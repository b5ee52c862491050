// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use perfcore::cache::{CacheConfig, ImageCache, SmartCache};
use perfcore::error::PerfError;
use perfcore::hardware::PerformanceTier;
use perfcore::logging::{LogLevel, LoggerConfig, PerfLogger};

fn quiet_logger() -> PerfLogger {
    PerfLogger::new(LoggerConfig {
        console_enabled: false,
        ..LoggerConfig::default()
    })
}

#[derive(Debug, Clone)]
enum Op {
    Put(u8),
    Get(u8),
    Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Put),
        (0u8..8).prop_map(Op::Get),
        (0u8..8).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_accounting_and_bound_hold(ops in proptest::collection::vec(op(), 1..60), max in 1usize..6) {
        tokio_test::block_on(async {
            let cache: SmartCache<u8, u32> =
                SmartCache::new(CacheConfig::default().with_max_size(max), quiet_logger());
            let mut gets = 0u64;
            for op in &ops {
                match *op {
                    Op::Put(k) => cache.put(k, u32::from(k)).await,
                    Op::Get(k) => {
                        gets += 1;
                        if let Some(v) = cache.get(&k).await {
                            assert_eq!(v, u32::from(k));
                        }
                    }
                    Op::Remove(k) => {
                        cache.remove(&k).await;
                    }
                }
                assert!(cache.len() <= max);
            }
            let stats = cache.stats();
            assert_eq!(stats.total_requests, gets);
            assert_eq!(stats.hits + stats.misses, stats.total_requests);
            assert!(stats.hit_rate >= 0.0 && stats.hit_rate <= 1.0);
            assert_eq!(stats.current_size, cache.len());
            cache.destroy();
        });
    }
}

#[tokio::test(start_paused = true)]
async fn test_lru_scenario_from_cold_start() {
    let cache: SmartCache<String, &'static str> =
        SmartCache::new(CacheConfig::default().with_max_size(3), quiet_logger());
    for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
        cache.put(k.to_string(), v).await;
    }
    // touching "a" makes "b" the eviction victim
    assert_eq!(cache.get(&"a".to_string()).await, Some("1"));
    cache.put("d".to_string(), "4").await;

    assert!(!cache.contains_key(&"b".to_string()));
    let mut keys = cache.keys();
    keys.sort();
    assert_eq!(keys, vec!["a", "c", "d"]);
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_counts_as_miss() {
    let cache: SmartCache<&'static str, u32> =
        SmartCache::new(CacheConfig::default(), quiet_logger());
    cache.put_with_ttl("k", 1, Duration::from_millis(100)).await;
    tokio::time::advance(Duration::from_millis(150)).await;

    assert_eq!(cache.get(&"k").await, None);
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 0);
}

#[tokio::test(start_paused = true)]
async fn test_background_cleanup_sweeps_expired_entries() {
    let config = CacheConfig {
        cleanup_interval: Duration::from_secs(1),
        ..CacheConfig::default()
    };
    let cache: SmartCache<u32, u32> = SmartCache::new(config, quiet_logger());
    cache.put_with_ttl(1, 1, Duration::from_millis(500)).await;
    cache.put(2, 2).await;

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().expirations, 1);
}

#[tokio::test]
async fn test_get_or_put_factory_failure_stores_nothing() {
    let logger = quiet_logger();
    let cache: SmartCache<String, String> =
        SmartCache::new(CacheConfig::default(), logger.clone());

    let err = cache
        .get_or_put("cfg".to_string(), None, || async {
            Err::<String, _>(std::io::Error::other("backend down"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PerfError::Factory(_)));
    assert!(cache.is_empty());

    let value = cache
        .get_or_put("cfg".to_string(), None, || async {
            Ok::<_, std::io::Error>("fresh".to_string())
        })
        .await
        .unwrap();
    assert_eq!(value, "fresh");
    assert_eq!(cache.peek(&"cfg".to_string()).as_deref(), Some("fresh"));

    logger.flush().await;
    let failures = logger.log_history(Some(LogLevel::Error), Some("CACHE"));
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message, "Operation failed: compute_value");
}

#[tokio::test]
async fn test_concurrent_puts_respect_bound() {
    let cache: SmartCache<u32, u32> =
        SmartCache::new(CacheConfig::default().with_max_size(16), quiet_logger());
    let handles: Vec<_> = (0..8u32)
        .map(|worker| {
            let cache = cache.clone();
            tokio::spawn(async move {
                for i in 0..50u32 {
                    cache.put(worker * 100 + i, i).await;
                    cache.get(&(worker * 100 + i / 2)).await;
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(cache.len(), 16);
    let stats = cache.stats();
    assert_eq!(stats.total_requests, 400);
    assert_eq!(stats.hits + stats.misses, 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hit_miss_accounting_consistent_while_gets_run() {
    let cache: SmartCache<u32, u32> =
        SmartCache::new(CacheConfig::default().with_max_size(64), quiet_logger());
    for key in 0..25u32 {
        cache.put(key, key).await;
    }

    let done = Arc::new(AtomicBool::new(false));
    let sampler = {
        let cache = cache.clone();
        let done = Arc::clone(&done);
        tokio::task::spawn_blocking(move || {
            let mut checks = 0u64;
            while !done.load(Ordering::SeqCst) {
                for m in [cache.stats(), cache.metrics().get()] {
                    assert_eq!(m.hits + m.misses, m.total_requests);
                }
                checks += 1;
            }
            checks
        })
    };

    // keys 25..50 are never stored, so half of all lookups miss
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move {
                for i in 0..2000u32 {
                    cache.get(&(i % 50)).await;
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }
    done.store(true, Ordering::SeqCst);
    assert!(sampler.await.unwrap() > 0);

    let stats = cache.stats();
    assert_eq!(stats.total_requests, 8000);
    assert_eq!(stats.hits, 4000);
    assert_eq!(stats.misses, 4000);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_get_or_put_misses_each_compute() {
    let cache: SmartCache<String, u32> = SmartCache::new(CacheConfig::default(), quiet_logger());
    let calls = Arc::new(AtomicUsize::new(0));
    let both_missed = Arc::new(tokio::sync::Barrier::new(2));

    let factory = |value: u32, delay: Duration| {
        let calls = Arc::clone(&calls);
        let both_missed = Arc::clone(&both_missed);
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            both_missed.wait().await;
            tokio::time::sleep(delay).await;
            Ok::<_, PerfError>(value)
        }
    };

    let (first, second) = tokio::join!(
        cache.get_or_put("k".to_string(), None, factory(1, Duration::ZERO)),
        cache.get_or_put("k".to_string(), None, factory(2, Duration::from_millis(10))),
    );

    assert_eq!(first.unwrap(), 1);
    assert_eq!(second.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    // the slower caller stored last
    assert_eq!(cache.peek(&"k".to_string()), Some(2));
    assert_eq!(cache.stats().misses, 2);
}

#[tokio::test]
async fn test_image_cache_preload_skips_cached_and_failed() {
    let images = ImageCache::new(PerformanceTier::LowEnd, quiet_logger());
    assert_eq!(images.capacity(), 12_800);
    images.put_image("https://cdn/a.png", vec![1u8, 2, 3]).await;

    let loaded = images
        .preload_images(
            ["https://cdn/a.png", "https://cdn/b.png", "https://cdn/missing.png"],
            |url| async move {
                if url.ends_with("missing.png") {
                    None
                } else {
                    Some(vec![9u8; 4])
                }
            },
        )
        .await;

    assert_eq!(loaded, 1);
    assert_eq!(images.get_image("https://cdn/a.png").await.as_deref(), Some(&[1u8, 2, 3][..]));
    assert_eq!(images.get_image("https://cdn/b.png").await.map(|b| b.len()), Some(4));
    assert!(images.get_image("https://cdn/missing.png").await.is_none());

    let shared: Arc<[u8]> = Arc::from(vec![0u8; 2]);
    images.put_image("https://cdn/c.png", shared.clone()).await;
    assert!(Arc::ptr_eq(
        &images.get_image("https://cdn/c.png").await.unwrap(),
        &shared
    ));
}
