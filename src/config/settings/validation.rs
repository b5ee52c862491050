// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::time::Duration;

use crate::cache::CacheConfig;
use crate::error::{PerfError, Result};
use crate::logging::LoggerConfig;
use crate::telemetry::MonitorConfig;

use super::Settings;

impl Settings {
    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, u64); 7] = [
            ("logging.buffer_capacity", self.logging.buffer_capacity as u64),
            ("cache.default_ttl_secs", self.cache.default_ttl_secs),
            ("cache.cleanup_interval_secs", self.cache.cleanup_interval_secs),
            ("cache.metrics_interval_secs", self.cache.metrics_interval_secs),
            ("monitor.metrics_interval_ms", self.monitor.metrics_interval_ms),
            ("monitor.thermal_interval_ms", self.monitor.thermal_interval_ms),
            ("monitor.frame_window", self.monitor.frame_window as u64),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, value)| *value == 0) {
            return Err(PerfError::Config(format!("{name} must be greater than zero")));
        }
        if self.monitor.retry_delay_ms == 0 {
            return Err(PerfError::Config(
                "monitor.retry_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.cache.max_entries == Some(0) {
            return Err(PerfError::Config(
                "cache.max_entries must be greater than zero".to_string(),
            ));
        }
        if self.image_cache.base_budget_bytes == 0 || self.image_cache.ttl_secs == 0 {
            return Err(PerfError::Config(
                "image_cache budget and ttl must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            min_level: self.logging.min_level,
            console_enabled: self.logging.console_enabled,
            file_path: self.logging.file_path.clone(),
            buffer_capacity: self.logging.buffer_capacity,
        }
    }

    /// Cache configuration, bounded by `max_entries` or else by
    /// `tier_entries` (the tier's cache size).
    pub fn cache_config(&self, tier_entries: usize) -> CacheConfig {
        CacheConfig {
            max_size: self.cache.max_entries.unwrap_or(tier_entries),
            default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
            cleanup_interval: Duration::from_secs(self.cache.cleanup_interval_secs),
            metrics_interval: Duration::from_secs(self.cache.metrics_interval_secs),
            enable_metrics: self.cache.enable_metrics,
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            metrics_interval: Duration::from_millis(self.monitor.metrics_interval_ms),
            thermal_interval: Duration::from_millis(self.monitor.thermal_interval_ms),
            retry_delay: Duration::from_millis(self.monitor.retry_delay_ms),
            frame_window: self.monitor.frame_window,
        }
    }

    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.image_cache.ttl_secs)
    }

    pub fn override_refresh_interval(&self) -> Option<Duration> {
        (self.overrides.refresh_interval_secs > 0)
            .then(|| Duration::from_secs(self.overrides.refresh_interval_secs))
    }
}
