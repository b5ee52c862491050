// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Device capability detection and profiling

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::probe::{DisplayMetrics, HostProbe};
use super::thermal::ThermalCapabilities;
use super::tier::{PerformanceSettings, PerformanceTier, ScoreInputs};
use crate::error::Result;
use crate::logging::PerfLogger;
use crate::observable::Observable;
use crate::perf_metrics;

const CATEGORY: &str = "DEVICE_DETECTION";

/// Optional platform capabilities that influence tiering and settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceFeature {
    ModernGraphicsApi,
    HardwareAcceleration,
    HighRefreshDisplay,
    ThermalManagement,
    AdvancedMemoryManagement,
}

/// Complete device profile produced by one detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub tier: PerformanceTier,
    pub memory_gb: u32,
    pub cpu_core_count: u32,
    pub platform_api_level: u32,
    pub hardware_acceleration_available: bool,
    pub supported_features: BTreeSet<DeviceFeature>,
    pub thermal_capabilities: ThermalCapabilities,
    pub display_metrics: DisplayMetrics,
    pub recommended_settings: PerformanceSettings,
}

impl DeviceProfile {
    pub fn has_feature(&self, feature: DeviceFeature) -> bool {
        self.supported_features.contains(&feature)
    }

    /// Inputs that produced this profile's tier
    pub fn score_inputs(&self) -> ScoreInputs {
        ScoreInputs {
            memory_gb: self.memory_gb,
            cpu_cores: self.cpu_core_count,
            api_level: self.platform_api_level,
            modern_graphics_api: self.has_feature(DeviceFeature::ModernGraphicsApi),
            high_refresh_display: self.has_feature(DeviceFeature::HighRefreshDisplay),
            hardware_acceleration: self.has_feature(DeviceFeature::HardwareAcceleration),
        }
    }
}

/// Classifies the host into a [`PerformanceTier`] and publishes the result.
pub struct CapabilityDetector {
    probe: Arc<dyn HostProbe>,
    logger: PerfLogger,
    profile: Observable<Option<DeviceProfile>>,
}

impl fmt::Debug for CapabilityDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDetector")
            .field("profile", &self.profile.get())
            .finish()
    }
}

impl CapabilityDetector {
    pub fn new(probe: Arc<dyn HostProbe>, logger: PerfLogger) -> Self {
        Self {
            probe,
            logger,
            profile: Observable::new(None),
        }
    }

    /// Run one detection pass. Never fails: every failed probe is replaced by
    /// a conservative default.
    pub fn detect_capabilities(&self) -> DeviceProfile {
        let probe = &self.probe;
        let memory_gb = self.probe_or("memory_gb", 0, probe.memory_gb());
        let cpu_core_count = self.probe_or("cpu_cores", 1, probe.cpu_cores()).max(1);
        let platform_api_level = self.probe_or("api_level", 0, probe.api_level());
        let modern_graphics = self.probe_or("modern_graphics_api", false, probe.modern_graphics_api());
        let hardware_acceleration =
            self.probe_or("hardware_acceleration", false, probe.hardware_acceleration());
        let display_metrics =
            self.probe_or("display_metrics", DisplayMetrics::default(), probe.display_metrics());
        let thermal_query =
            self.probe_or("thermal_query", false, probe.thermal_query_supported());

        let mut supported_features = BTreeSet::new();
        if modern_graphics {
            supported_features.insert(DeviceFeature::ModernGraphicsApi);
        }
        if hardware_acceleration {
            supported_features.insert(DeviceFeature::HardwareAcceleration);
        }
        if platform_api_level >= 29 || thermal_query {
            supported_features.insert(DeviceFeature::ThermalManagement);
        }
        if platform_api_level >= 30 {
            supported_features.insert(DeviceFeature::AdvancedMemoryManagement);
        }
        if display_metrics.refresh_rate_hz > 60.0 {
            supported_features.insert(DeviceFeature::HighRefreshDisplay);
        }

        let inputs = ScoreInputs {
            memory_gb,
            cpu_cores: cpu_core_count,
            api_level: platform_api_level,
            modern_graphics_api: modern_graphics,
            high_refresh_display: supported_features.contains(&DeviceFeature::HighRefreshDisplay),
            hardware_acceleration,
        };
        let score = inputs.score();
        let tier = PerformanceTier::from_score(score);
        let recommended_settings = tier.recommended_settings(inputs.high_refresh_display);

        let profile = DeviceProfile {
            tier,
            memory_gb,
            cpu_core_count,
            platform_api_level,
            hardware_acceleration_available: hardware_acceleration,
            supported_features,
            thermal_capabilities: ThermalCapabilities::from_query_support(thermal_query),
            display_metrics,
            recommended_settings,
        };

        tracing::debug!("Detected {} device (score {})", tier, score);
        self.logger.info(
            CATEGORY,
            "Device capabilities detected",
            perf_metrics! {
                "tier" => tier.name(),
                "score" => score,
                "memory_gb" => memory_gb,
                "cpu_cores" => cpu_core_count,
                "api_level" => platform_api_level,
                "target_fps" => profile.recommended_settings.target_fps,
            },
        );

        self.profile.set(Some(profile.clone()));
        profile
    }

    /// Latest detected profile, if detection has run
    pub fn current(&self) -> Option<DeviceProfile> {
        self.profile.get()
    }

    pub fn profile(&self) -> &Observable<Option<DeviceProfile>> {
        &self.profile
    }

    fn probe_or<T>(&self, probe: &str, fallback: T, result: Result<T>) -> T
    where
        T: fmt::Debug,
    {
        match result {
            Ok(value) => value,
            Err(err) => {
                let shown = format!("{fallback:?}");
                self.logger.debug(
                    CATEGORY,
                    &format!("Probe {probe} failed, using default"),
                    perf_metrics! {
                        "probe" => probe,
                        "default" => shown,
                        "error" => err.to_string(),
                    },
                );
                fallback
            }
        }
    }
}
