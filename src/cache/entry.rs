// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Cache entry, configuration and metrics types.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Estimated footprint of one entry used for `memory_usage_bytes`.
pub const ESTIMATED_ENTRY_BYTES: u64 = 1024;

/// Tuning knobs for a [`SmartCache`](super::SmartCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_size: usize,
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
    pub metrics_interval: Duration,
    /// Publish metrics and emit per-operation debug logs
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            default_ttl: Duration::from_secs(30 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
            metrics_interval: Duration::from_secs(10),
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// One stored value plus its bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
    pub access_count: u64,
    pub last_accessed: Instant,
    /// Position in the LRU index
    pub touch_seq: u64,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration, now: Instant, touch_seq: u64) -> Self {
        Self {
            value,
            created_at: now,
            ttl,
            access_count: 0,
            last_accessed: now,
            touch_seq,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub fn touch(&mut self, now: Instant, touch_seq: u64) {
        self.access_count += 1;
        self.last_accessed = now;
        self.touch_seq = touch_seq;
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub current_size: usize,
    pub max_size: usize,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub utilization_rate: f64,
    pub memory_usage_bytes: u64,
}

impl CacheMetrics {
    pub(crate) fn compute(counters: CounterValues, current_size: usize, max_size: usize) -> Self {
        let ratio = |n: u64, d: u64| if d > 0 { n as f64 / d as f64 } else { 0.0 };
        Self {
            total_requests: counters.total_requests,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
            current_size,
            max_size,
            hit_rate: ratio(counters.hits, counters.total_requests),
            miss_rate: ratio(counters.misses, counters.total_requests),
            utilization_rate: if max_size > 0 {
                current_size as f64 / max_size as f64
            } else {
                0.0
            },
            memory_usage_bytes: current_size as u64 * ESTIMATED_ENTRY_BYTES,
        }
    }
}

/// Plain copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CounterValues {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}
