// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Thermal classification and the rendering-quality ratchet.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hardware::PerformanceTier;

/// Coarse thermal state derived from temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermalState {
    Normal,
    Warm,
    Hot,
    Critical,
}

impl ThermalState {
    /// Boundary temperatures belong to the cooler state.
    pub fn classify(temperature_c: f32) -> Self {
        if temperature_c <= 50.0 {
            ThermalState::Normal
        } else if temperature_c <= 65.0 {
            ThermalState::Warm
        } else if temperature_c <= 80.0 {
            ThermalState::Hot
        } else {
            ThermalState::Critical
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThermalState::Normal => "NORMAL",
            ThermalState::Warm => "WARM",
            ThermalState::Hot => "HOT",
            ThermalState::Critical => "CRITICAL",
        }
    }

    /// Whether callers should shed load.
    pub fn needs_throttle(&self) -> bool {
        matches!(self, ThermalState::Hot | ThermalState::Critical)
    }
}

impl fmt::Display for ThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rendering quality recommendation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderingQuality {
    UltraLow,
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

/// Inputs of one quality evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySignal {
    pub throttling: bool,
    pub temperature_c: f32,
    pub utilization_percent: f32,
}

impl RenderingQuality {
    pub fn name(&self) -> &'static str {
        match self {
            RenderingQuality::UltraLow => "ULTRA_LOW",
            RenderingQuality::Low => "LOW",
            RenderingQuality::Medium => "MEDIUM",
            RenderingQuality::High => "HIGH",
            RenderingQuality::Ultra => "ULTRA",
        }
    }

    fn lower(self) -> Self {
        match self {
            RenderingQuality::Ultra => RenderingQuality::High,
            RenderingQuality::High => RenderingQuality::Medium,
            RenderingQuality::Medium => RenderingQuality::Low,
            RenderingQuality::Low | RenderingQuality::UltraLow => RenderingQuality::UltraLow,
        }
    }

    fn higher(self, tier: PerformanceTier) -> Self {
        match self {
            RenderingQuality::UltraLow => RenderingQuality::Low,
            RenderingQuality::Low => RenderingQuality::Medium,
            RenderingQuality::Medium => RenderingQuality::High,
            RenderingQuality::High if tier == PerformanceTier::Premium => RenderingQuality::Ultra,
            other => other,
        }
    }

    /// Evaluate one tick. Moves at most one level.
    ///
    /// Heat always steps down. Load above 90% only trims HIGH and ULTRA.
    /// Light load on a cool device steps up, with ULTRA reserved for the
    /// premium tier.
    pub fn next(self, signal: QualitySignal, tier: PerformanceTier) -> Self {
        if signal.throttling || signal.temperature_c > 75.0 {
            self.lower()
        } else if signal.utilization_percent > 90.0 {
            if self >= RenderingQuality::High {
                self.lower()
            } else {
                self
            }
        } else if signal.utilization_percent < 50.0 && signal.temperature_c < 60.0 {
            self.higher(tier)
        } else {
            self
        }
    }
}

impl fmt::Display for RenderingQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
