// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! GPU vendor detection and baseline performance profiles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::sensors::SensorReader;
use crate::hardware::PerformanceTier;

/// GPU vendor family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuVendor {
    Adreno,
    Mali,
    PowerVr,
    Unknown,
}

impl GpuVendor {
    /// Detect the vendor from known driver nodes, then the hardware string.
    pub fn detect(reader: &dyn SensorReader) -> Self {
        if reader.exists(Path::new("/sys/class/kgsl/kgsl-3d0")) {
            return GpuVendor::Adreno;
        }
        if reader.exists(Path::new("/sys/devices/platform/mali"))
            || reader.exists(Path::new("/sys/class/devfreq/mali0"))
        {
            return GpuVendor::Mali;
        }
        match reader.hardware_name() {
            Some(name) if name.to_ascii_lowercase().contains("pvr") => GpuVendor::PowerVr,
            _ => GpuVendor::Unknown,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GpuVendor::Adreno => "Qualcomm Adreno",
            GpuVendor::Mali => "ARM Mali",
            GpuVendor::PowerVr => "PowerVR",
            GpuVendor::Unknown => "Unknown",
        }
    }

    /// Scaling applied to the baseline frequency range.
    fn frequency_scale(&self) -> f32 {
        match self {
            GpuVendor::Mali => 0.8,
            GpuVendor::PowerVr => 0.9,
            GpuVendor::Adreno | GpuVendor::Unknown => 1.0,
        }
    }
}

impl fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Coarse GPU performance class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GpuClass {
    IntegratedLow,
    IntegratedMid,
    IntegratedHigh,
    DiscreteGaming,
}

/// Expected operating envelope of the GPU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuPerformanceProfile {
    pub class: GpuClass,
    pub base_frequency_mhz: f32,
    pub max_frequency_mhz: f32,
    pub thermal_throttle_temp_c: f32,
    pub recommended_target_fps: u32,
    pub max_texture_resolution: u32,
    pub supports_advanced_shading: bool,
}

impl GpuPerformanceProfile {
    /// Baseline profile for `tier`, scaled for `vendor`.
    pub fn for_device(vendor: GpuVendor, tier: PerformanceTier) -> Self {
        let mut profile = Self::baseline(tier);
        let scale = vendor.frequency_scale();
        profile.base_frequency_mhz *= scale;
        profile.max_frequency_mhz *= scale;
        profile
    }

    fn baseline(tier: PerformanceTier) -> Self {
        match tier {
            PerformanceTier::LowEnd => Self {
                class: GpuClass::IntegratedLow,
                base_frequency_mhz: 400.0,
                max_frequency_mhz: 600.0,
                thermal_throttle_temp_c: 65.0,
                recommended_target_fps: 30,
                max_texture_resolution: 2048,
                supports_advanced_shading: false,
            },
            PerformanceTier::MidEnd => Self {
                class: GpuClass::IntegratedMid,
                base_frequency_mhz: 500.0,
                max_frequency_mhz: 800.0,
                thermal_throttle_temp_c: 70.0,
                recommended_target_fps: 45,
                max_texture_resolution: 4096,
                supports_advanced_shading: true,
            },
            PerformanceTier::HighEnd => Self {
                class: GpuClass::IntegratedHigh,
                base_frequency_mhz: 600.0,
                max_frequency_mhz: 1000.0,
                thermal_throttle_temp_c: 75.0,
                recommended_target_fps: 60,
                max_texture_resolution: 4096,
                supports_advanced_shading: true,
            },
            PerformanceTier::Premium => Self {
                class: GpuClass::DiscreteGaming,
                base_frequency_mhz: 800.0,
                max_frequency_mhz: 1200.0,
                thermal_throttle_temp_c: 80.0,
                recommended_target_fps: 90,
                max_texture_resolution: 8192,
                supports_advanced_shading: true,
            },
        }
    }

    /// Target frame budget in milliseconds.
    pub fn target_frame_time_ms(&self) -> f32 {
        1000.0 / self.recommended_target_fps.max(1) as f32
    }
}

/// Rough GPU memory footprint by tier, in MB.
pub fn estimated_memory_usage_mb(tier: PerformanceTier) -> u64 {
    match tier {
        PerformanceTier::LowEnd => 128,
        PerformanceTier::MidEnd => 256,
        PerformanceTier::HighEnd => 512,
        PerformanceTier::Premium => 1024,
    }
}
