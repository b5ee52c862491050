// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Host environment probes feeding capability detection

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use sysinfo::System;

use crate::error::{PerfError, Result};

/// Physical display characteristics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub width_px: u32,
    pub height_px: u32,
    pub density_dpi: u32,
    pub refresh_rate_hz: f32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            width_px: 1080,
            height_px: 1920,
            density_dpi: 480,
            refresh_rate_hz: 60.0,
        }
    }
}

/// Source of raw host facts.
///
/// Every query may fail; the detector substitutes conservative defaults.
pub trait HostProbe: Send + Sync {
    fn memory_gb(&self) -> Result<u32>;
    fn cpu_cores(&self) -> Result<u32>;
    fn api_level(&self) -> Result<u32>;
    fn modern_graphics_api(&self) -> Result<bool>;
    fn hardware_acceleration(&self) -> Result<bool>;
    fn display_metrics(&self) -> Result<DisplayMetrics>;
    fn thermal_query_supported(&self) -> Result<bool>;
}

const BUILD_PROP: &str = "system/build.prop";
const SDK_KEY: &str = "ro.build.version.sdk";

const VULKAN_LIBRARIES: &[&str] = &[
    "system/lib64/libvulkan.so",
    "system/lib/libvulkan.so",
    "usr/lib/x86_64-linux-gnu/libvulkan.so.1",
    "usr/lib/aarch64-linux-gnu/libvulkan.so.1",
    "usr/lib/libvulkan.so.1",
    "usr/lib64/libvulkan.so.1",
];

const GPU_DEVICES: &[&str] = &["dev/kgsl-3d0", "dev/mali0", "dev/pvrsrvkm", "dev/dri"];

const FRAMEBUFFER_SIZE: &str = "sys/class/graphics/fb0/virtual_size";
const THERMAL_ZONE: &str = "sys/class/thermal/thermal_zone0/temp";

/// Probe backed by `sysinfo` and best-effort filesystem checks.
///
/// Paths are resolved under `root`, which is `/` on a real device.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    root: PathBuf,
    api_level_override: Option<u32>,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
            api_level_override: None,
        }
    }

    /// Resolve probe paths under a different root directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            api_level_override: None,
        }
    }

    /// Report this API level instead of reading `build.prop`.
    pub fn with_api_level(mut self, level: Option<u32>) -> Self {
        self.api_level_override = level;
        self
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn any_exists(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|p| self.path(p).exists())
    }
}

impl HostProbe for SystemProbe {
    fn memory_gb(&self) -> Result<u32> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(PerfError::Sensor("total memory unavailable".into()));
        }
        Ok((total / (1024 * 1024 * 1024)) as u32)
    }

    fn cpu_cores(&self) -> Result<u32> {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        match sys.cpus().len() {
            0 => std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .map_err(PerfError::from),
            n => Ok(n as u32),
        }
    }

    fn api_level(&self) -> Result<u32> {
        if let Some(level) = self.api_level_override {
            return Ok(level);
        }
        let props = std::fs::read_to_string(self.path(BUILD_PROP))?;
        parse_sdk_level(&props)
            .ok_or_else(|| PerfError::Sensor(format!("{SDK_KEY} missing from build.prop")))
    }

    fn modern_graphics_api(&self) -> Result<bool> {
        Ok(self.any_exists(VULKAN_LIBRARIES))
    }

    fn hardware_acceleration(&self) -> Result<bool> {
        Ok(self.any_exists(GPU_DEVICES) || self.any_exists(VULKAN_LIBRARIES))
    }

    fn display_metrics(&self) -> Result<DisplayMetrics> {
        let raw = std::fs::read_to_string(self.path(FRAMEBUFFER_SIZE))?;
        let (width_px, height_px) = parse_virtual_size(&raw)
            .ok_or_else(|| PerfError::Sensor(format!("unparseable framebuffer size: {raw:?}")))?;
        Ok(DisplayMetrics {
            width_px,
            height_px,
            ..DisplayMetrics::default()
        })
    }

    fn thermal_query_supported(&self) -> Result<bool> {
        Ok(self.path(THERMAL_ZONE).exists())
    }
}

fn parse_sdk_level(props: &str) -> Option<u32> {
    props.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if key.trim() != SDK_KEY {
            return None;
        }
        value.trim().parse().ok()
    })
}

fn parse_virtual_size(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.trim().split_once(',')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}
