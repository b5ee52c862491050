// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Runtime context owning every component.
//!
//! Components are built once, in dependency order, and handed out by
//! reference. Nothing here is global: a process may run several runtimes
//! (tests do) and each one stops its own background tasks on shutdown.

use std::sync::Arc;

use crate::cache::{ImageCache, SmartCache};
use crate::config::{FileOverrideSource, OverrideSource, PerformanceConfig, Settings};
use crate::error::Result;
use crate::hardware::{CapabilityDetector, DeviceProfile, HostProbe};
use crate::logging::PerfLogger;
use crate::perf_metrics;
use crate::telemetry::{GpuMonitor, SensorPaths, SensorReader};

const CATEGORY: &str = "RUNTIME";

/// General-purpose cache for structured values.
pub type GeneralCache = SmartCache<String, serde_json::Value>;

/// Owner of the logger, detector, override config, caches and monitor.
#[derive(Debug)]
pub struct PerfRuntime {
    settings: Settings,
    logger: PerfLogger,
    detector: CapabilityDetector,
    profile: DeviceProfile,
    overrides: PerformanceConfig,
    cache: GeneralCache,
    images: ImageCache,
    monitor: GpuMonitor,
}

impl PerfRuntime {
    /// Build every component from `settings`. The override document is read
    /// from `settings.overrides.path` when one is configured.
    pub async fn init(
        settings: Settings,
        probe: Arc<dyn HostProbe>,
        sensors: Arc<dyn SensorReader>,
    ) -> Result<Self> {
        let source = settings
            .overrides
            .path
            .as_ref()
            .map(|path| Arc::new(FileOverrideSource::new(path)) as Arc<dyn OverrideSource>);
        Self::init_with_overrides(settings, probe, sensors, source).await
    }

    /// Same as [`PerfRuntime::init`] with an explicit override source.
    pub async fn init_with_overrides(
        settings: Settings,
        probe: Arc<dyn HostProbe>,
        sensors: Arc<dyn SensorReader>,
        override_source: Option<Arc<dyn OverrideSource>>,
    ) -> Result<Self> {
        settings.validate()?;

        let logger = PerfLogger::new(settings.logger_config());

        let detector = CapabilityDetector::new(probe, logger.clone());
        let profile = detector.detect_capabilities();
        let tier = profile.tier;

        let overrides = PerformanceConfig::new(override_source, logger.clone());
        overrides.refresh().await;
        if let Some(interval) = settings.override_refresh_interval() {
            overrides.start_periodic_refresh(interval);
        }

        let tier_entries = overrides.cache_size_for_tier(tier) as usize;
        let cache = GeneralCache::new(settings.cache_config(tier_entries), logger.clone());

        let images = ImageCache::with_budget(
            settings.image_cache.base_budget_bytes,
            settings.image_ttl(),
            tier,
            logger.clone(),
        );

        let monitor = GpuMonitor::new(
            tier,
            sensors,
            SensorPaths::default(),
            settings.monitor_config(),
            logger.clone(),
        );
        monitor.start();

        logger.info(
            CATEGORY,
            "Performance runtime initialized",
            perf_metrics! {
                "device_tier" => tier.name(),
                "cache_entries" => cache.max_size(),
                "image_entries" => images.capacity(),
                "overrides_version" => overrides.current().version,
            },
        );

        Ok(Self {
            settings,
            logger,
            detector,
            profile,
            overrides,
            cache,
            images,
            monitor,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn logger(&self) -> &PerfLogger {
        &self.logger
    }

    pub fn detector(&self) -> &CapabilityDetector {
        &self.detector
    }

    /// Profile from the detection pass run at startup.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn overrides(&self) -> &PerformanceConfig {
        &self.overrides
    }

    pub fn cache(&self) -> &GeneralCache {
        &self.cache
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn monitor(&self) -> &GpuMonitor {
        &self.monitor
    }

    /// Stop every background task and drop cached state. Pending log
    /// entries are processed before the logger stops.
    pub async fn shutdown(&self) {
        self.monitor.shutdown();
        self.overrides.shutdown();
        self.cache.destroy();
        self.images.destroy();
        self.logger
            .info(CATEGORY, "Performance runtime stopped", perf_metrics! {});
        self.logger.flush().await;
        self.logger.shutdown();
    }
}
