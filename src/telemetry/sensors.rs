// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Sensor access: a narrow reader seam plus ordered path probing.
//!
//! Nodes are tried in order and the first one yielding a parseable value
//! wins. Absent, unreadable and unparseable nodes are skipped. Only a
//! genuine I/O fault reported by the reader is surfaced to the caller.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::hardware::parse_thermal_zone_temp;

/// Highest index substituted for `*` in wildcard templates.
pub const MAX_WILDCARD_INDEX: u32 = 20;

/// Access to OS-exposed sensor nodes.
pub trait SensorReader: Send + Sync {
    /// Contents of `path`, or `None` when the node is missing or not readable.
    fn read_to_string(&self, path: &Path) -> Result<Option<String>>;

    fn exists(&self, path: &Path) -> bool;

    /// Platform hardware string (for example the board or SoC name).
    fn hardware_name(&self) -> Option<String>;
}

/// Reader for sysfs-style nodes on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct SysfsSensorReader {
    hardware_override: Option<String>,
}

impl SysfsSensorReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this hardware string instead of the detected one.
    pub fn with_hardware_name(mut self, name: impl Into<String>) -> Self {
        self.hardware_override = Some(name.into());
        self
    }
}

impl SensorReader for SysfsSensorReader {
    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::InvalidData
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn hardware_name(&self) -> Option<String> {
        if let Some(name) = &self.hardware_override {
            return Some(name.clone());
        }
        ["/proc/device-tree/compatible", "/proc/device-tree/model"]
            .iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .map(|s| s.replace('\0', " ").trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Ordered candidate nodes for each metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorPaths {
    pub frequency: Vec<String>,
    pub utilization: Vec<String>,
    pub thermal: Vec<String>,
}

impl Default for SensorPaths {
    fn default() -> Self {
        let owned = |paths: &[&str]| paths.iter().map(|p| p.to_string()).collect();
        Self {
            frequency: owned(&[
                "/sys/class/kgsl/kgsl-3d0/gpufreq",
                "/sys/class/kgsl/kgsl-3d0/freq",
                "/sys/devices/platform/mali/cur_freq",
                "/sys/devices/platform/gpusysfs/gpu_freq_table",
                "/sys/class/devfreq/mali0/cur_freq",
                "/sys/kernel/debug/clk/gpu_cc_gx_gfx3d_clk/clk_rate",
            ]),
            utilization: owned(&[
                "/sys/class/kgsl/kgsl-3d0/gpu_busy_percentage",
                "/sys/class/kgsl/kgsl-3d0/devfreq/gpu_busy",
                "/sys/devices/platform/mali/utilization",
                "/sys/class/devfreq/mali0/device/utilization",
            ]),
            thermal: owned(&[
                "/sys/class/thermal/thermal_zone*/temp",
                "/sys/devices/virtual/thermal/thermal_zone*/temp",
            ]),
        }
    }
}

/// Expand a template into concrete paths, substituting `*` with 0..=20.
pub fn expand_template(template: &str) -> Vec<PathBuf> {
    if template.contains('*') {
        (0..=MAX_WILDCARD_INDEX)
            .map(|i| PathBuf::from(template.replace('*', &i.to_string())))
            .collect()
    } else {
        vec![PathBuf::from(template)]
    }
}

/// First value produced by `parse` over the expanded templates.
pub fn probe_first<T>(
    reader: &dyn SensorReader,
    templates: &[String],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    for template in templates {
        for path in expand_template(template) {
            if !reader.exists(&path) {
                continue;
            }
            let Some(raw) = reader.read_to_string(&path)? else {
                continue;
            };
            if let Some(value) = parse(raw.trim()) {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

/// Frequency nodes report Hz.
pub fn parse_frequency_mhz(raw: &str) -> Option<f32> {
    let hz: u64 = raw.trim().parse().ok()?;
    Some(hz as f32 / 1_000_000.0)
}

/// Busy percentage, tolerating a trailing `%`.
pub fn parse_utilization(raw: &str) -> Option<f32> {
    let value: f32 = raw.trim().trim_end_matches('%').trim().parse().ok()?;
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

pub fn parse_temperature_c(raw: &str) -> Option<f32> {
    parse_thermal_zone_temp(raw)
}
