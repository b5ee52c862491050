// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Thermal capability description and thermal-zone parsing helpers.

use serde::{Deserialize, Serialize};

/// What the platform lets us know and expect about sustained load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalCapabilities {
    pub supports_thermal_query: bool,
    /// Fraction of peak performance sustainable over time, in [0, 1]
    pub max_sustained_performance_ratio: f32,
    pub throttle_temperature_c: f32,
}

impl ThermalCapabilities {
    pub fn from_query_support(supported: bool) -> Self {
        if supported {
            Self {
                supports_thermal_query: true,
                max_sustained_performance_ratio: 1.0,
                throttle_temperature_c: 70.0,
            }
        } else {
            Self {
                supports_thermal_query: false,
                max_sustained_performance_ratio: 0.8,
                throttle_temperature_c: 65.0,
            }
        }
    }
}

impl Default for ThermalCapabilities {
    fn default() -> Self {
        Self::from_query_support(false)
    }
}

/// Parse a thermal-zone reading. Values above 1000 are milli-degrees.
pub fn parse_thermal_zone_temp(raw: &str) -> Option<f32> {
    let value: f32 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value > 1000.0 {
        Some(value / 1000.0)
    } else {
        Some(value)
    }
}
