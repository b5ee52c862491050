// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Byte cache for decoded or downloaded images, sized by device tier.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::entry::{CacheConfig, CacheMetrics, ESTIMATED_ENTRY_BYTES};
use super::smart::SmartCache;
use crate::hardware::PerformanceTier;
use crate::logging::PerfLogger;
use crate::perf_metrics;

/// Byte budget before the tier multiplier is applied.
pub const DEFAULT_IMAGE_BUDGET_BYTES: u64 = 50 * 1024 * 1024;

/// Images stay fresh for an hour by default.
pub const DEFAULT_IMAGE_TTL: Duration = Duration::from_secs(60 * 60);

/// Image bytes keyed by URL.
#[derive(Debug, Clone)]
pub struct ImageCache {
    cache: SmartCache<String, Arc<[u8]>>,
    tier: PerformanceTier,
    logger: PerfLogger,
}

impl ImageCache {
    pub fn new(tier: PerformanceTier, logger: PerfLogger) -> Self {
        Self::with_budget(DEFAULT_IMAGE_BUDGET_BYTES, DEFAULT_IMAGE_TTL, tier, logger)
    }

    pub fn with_budget(
        base_budget_bytes: u64,
        ttl: Duration,
        tier: PerformanceTier,
        logger: PerfLogger,
    ) -> Self {
        let config = CacheConfig {
            max_size: Self::capacity_for(base_budget_bytes, tier),
            default_ttl: ttl,
            ..CacheConfig::default()
        };
        Self {
            cache: SmartCache::new(config, logger.clone()),
            tier,
            logger,
        }
    }

    /// Entry capacity approximating the tier-adjusted byte budget.
    pub fn capacity_for(base_budget_bytes: u64, tier: PerformanceTier) -> usize {
        let adjusted = match tier {
            PerformanceTier::LowEnd => base_budget_bytes / 4,
            PerformanceTier::MidEnd => base_budget_bytes / 2,
            PerformanceTier::HighEnd => base_budget_bytes,
            PerformanceTier::Premium => base_budget_bytes.saturating_mul(2),
        };
        usize::try_from(adjusted / ESTIMATED_ENTRY_BYTES).unwrap_or(usize::MAX)
    }

    pub async fn get_image(&self, url: &str) -> Option<Arc<[u8]>> {
        self.cache.get(&url.to_string()).await
    }

    pub async fn put_image(&self, url: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        self.cache.put(url.into(), data.into()).await;
    }

    /// Fetch and store every URL that is not already cached.
    ///
    /// URLs for which `loader` yields `None` are skipped. Requests already
    /// in flight elsewhere for the same URL are not coalesced. Returns the
    /// number of images stored.
    pub async fn preload_images<I, S, F, Fut>(&self, urls: I, mut loader: F) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Option<Vec<u8>>>,
    {
        let mut loaded = 0usize;
        let mut skipped = 0usize;
        for url in urls {
            let url = url.into();
            if self.cache.contains_key(&url) {
                skipped += 1;
                continue;
            }
            match loader(url.clone()).await {
                Some(bytes) => {
                    self.cache.put(url, Arc::from(bytes)).await;
                    loaded += 1;
                }
                None => skipped += 1,
            }
        }
        self.logger.debug(
            "IMAGE_CACHE",
            "Preload finished",
            perf_metrics! {
                "loaded" => loaded,
                "skipped" => skipped,
                "tier" => self.tier.name(),
            },
        );
        loaded
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.cache.cleanup().await
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.cache.stats()
    }

    pub fn tier(&self) -> PerformanceTier {
        self.tier
    }

    pub fn capacity(&self) -> usize {
        self.cache.max_size()
    }

    pub fn destroy(&self) {
        self.cache.destroy();
    }
}
