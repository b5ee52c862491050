// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Performance tier classification and the per-tier settings table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PerfError;

/// Device performance tier, ordered by ascending capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceTier {
    /// Under 3 GB, few cores, old platform
    LowEnd,
    /// Mainstream devices
    MidEnd,
    /// Recent flagships without every feature
    HighEnd,
    /// Top of the range: lots of RAM, 8+ cores, modern graphics API
    Premium,
}

impl PerformanceTier {
    pub const ALL: [PerformanceTier; 4] = [
        PerformanceTier::LowEnd,
        PerformanceTier::MidEnd,
        PerformanceTier::HighEnd,
        PerformanceTier::Premium,
    ];

    /// Canonical name used in override documents and logs
    pub fn name(&self) -> &'static str {
        match self {
            PerformanceTier::LowEnd => "LOW_END",
            PerformanceTier::MidEnd => "MID_END",
            PerformanceTier::HighEnd => "HIGH_END",
            PerformanceTier::Premium => "PREMIUM",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            PerformanceTier::LowEnd => "Low End",
            PerformanceTier::MidEnd => "Mid Range",
            PerformanceTier::HighEnd => "High End",
            PerformanceTier::Premium => "Premium",
        }
    }

    /// 1 for the weakest tier up to 4 for the strongest
    pub fn priority(&self) -> u8 {
        match self {
            PerformanceTier::LowEnd => 1,
            PerformanceTier::MidEnd => 2,
            PerformanceTier::HighEnd => 3,
            PerformanceTier::Premium => 4,
        }
    }

    /// Map a capability score to a tier.
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 9 => PerformanceTier::Premium,
            s if s >= 6 => PerformanceTier::HighEnd,
            s if s >= 3 => PerformanceTier::MidEnd,
            _ => PerformanceTier::LowEnd,
        }
    }

    /// Recommended settings for this tier.
    ///
    /// `high_refresh` raises the frame rate target on the two upper tiers.
    pub fn recommended_settings(&self, high_refresh: bool) -> PerformanceSettings {
        match self {
            PerformanceTier::LowEnd => PerformanceSettings {
                target_fps: 30,
                animation_scale: 0.3,
                image_quality: ImageQuality::Basic,
                max_concurrent_operations: 2,
                advanced_effects_enabled: false,
                cache_size_mb: 32,
            },
            PerformanceTier::MidEnd => PerformanceSettings {
                target_fps: 45,
                animation_scale: 0.6,
                image_quality: ImageQuality::Standard,
                max_concurrent_operations: 4,
                advanced_effects_enabled: false,
                cache_size_mb: 64,
            },
            PerformanceTier::HighEnd => PerformanceSettings {
                target_fps: if high_refresh { 90 } else { 60 },
                animation_scale: 0.8,
                image_quality: ImageQuality::High,
                max_concurrent_operations: 6,
                advanced_effects_enabled: true,
                cache_size_mb: 128,
            },
            PerformanceTier::Premium => PerformanceSettings {
                target_fps: if high_refresh { 120 } else { 60 },
                animation_scale: 1.0,
                image_quality: ImageQuality::Ultra,
                max_concurrent_operations: 8,
                advanced_effects_enabled: true,
                cache_size_mb: 256,
            },
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PerformanceTier {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        PerformanceTier::ALL
            .into_iter()
            .find(|tier| tier.name() == normalized)
            .ok_or_else(|| PerfError::InvalidInput(format!("unknown performance tier: {s}")))
    }
}

/// Image decode/render quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageQuality {
    Basic,
    Standard,
    High,
    Ultra,
}

/// Concrete settings bundle derived from a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSettings {
    pub target_fps: u32,
    /// Animation duration scale in [0, 1]
    pub animation_scale: f32,
    pub image_quality: ImageQuality,
    pub max_concurrent_operations: u32,
    pub advanced_effects_enabled: bool,
    pub cache_size_mb: u32,
}

/// Raw inputs of the tier score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreInputs {
    pub memory_gb: u32,
    pub cpu_cores: u32,
    pub api_level: u32,
    pub modern_graphics_api: bool,
    pub high_refresh_display: bool,
    pub hardware_acceleration: bool,
}

impl ScoreInputs {
    /// Weighted capability score: three 0..=3 buckets plus feature bonuses.
    pub fn score(&self) -> u32 {
        let memory = match self.memory_gb {
            0..=2 => 0,
            3..=5 => 1,
            6..=7 => 2,
            _ => 3,
        };
        let cores = match self.cpu_cores {
            0..=3 => 0,
            4..=5 => 1,
            6..=7 => 2,
            _ => 3,
        };
        let api = match self.api_level {
            0..=25 => 0,
            26..=28 => 1,
            29..=30 => 2,
            _ => 3,
        };

        let mut score = memory + cores + api;
        if self.modern_graphics_api {
            score += 2;
        }
        if self.high_refresh_display {
            score += 1;
        }
        if self.hardware_acceleration {
            score += 1;
        }
        score
    }

    pub fn tier(&self) -> PerformanceTier {
        PerformanceTier::from_score(self.score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_score_cutoffs() {
        assert_eq!(PerformanceTier::from_score(0), PerformanceTier::LowEnd);
        assert_eq!(PerformanceTier::from_score(2), PerformanceTier::LowEnd);
        assert_eq!(PerformanceTier::from_score(3), PerformanceTier::MidEnd);
        assert_eq!(PerformanceTier::from_score(6), PerformanceTier::HighEnd);
        assert_eq!(PerformanceTier::from_score(9), PerformanceTier::Premium);
        assert_eq!(PerformanceTier::from_score(12), PerformanceTier::Premium);
    }

    #[test]
    fn test_cold_start_flagship_scores_eleven() {
        let inputs = ScoreInputs {
            memory_gb: 8,
            cpu_cores: 8,
            api_level: 33,
            modern_graphics_api: true,
            ..ScoreInputs::default()
        };
        assert_eq!(inputs.score(), 11);
        assert_eq!(inputs.tier(), PerformanceTier::Premium);
    }

    #[test]
    fn test_bucket_thresholds() {
        let at = |memory_gb, cpu_cores, api_level| {
            ScoreInputs {
                memory_gb,
                cpu_cores,
                api_level,
                ..ScoreInputs::default()
            }
            .score()
        };
        assert_eq!(at(2, 0, 0), 0);
        assert_eq!(at(3, 0, 0), 1);
        assert_eq!(at(6, 0, 0), 2);
        assert_eq!(at(0, 4, 0), 1);
        assert_eq!(at(0, 8, 0), 3);
        assert_eq!(at(0, 0, 26), 1);
        assert_eq!(at(0, 0, 29), 2);
        assert_eq!(at(0, 0, 31), 3);
    }

    #[test]
    fn test_premium_fps_depends_on_refresh() {
        assert_eq!(PerformanceTier::Premium.recommended_settings(false).target_fps, 60);
        assert_eq!(PerformanceTier::Premium.recommended_settings(true).target_fps, 120);
        assert_eq!(PerformanceTier::HighEnd.recommended_settings(true).target_fps, 90);
        assert_eq!(PerformanceTier::LowEnd.recommended_settings(true).target_fps, 30);
    }

    #[test]
    fn test_tier_names_round_trip() {
        for tier in PerformanceTier::ALL {
            assert_eq!(tier.to_string().parse::<PerformanceTier>().unwrap(), tier);
        }
        assert_eq!("high-end".parse::<PerformanceTier>().unwrap(), PerformanceTier::HighEnd);
        assert!("ultra".parse::<PerformanceTier>().is_err());
    }

    #[test]
    fn test_tier_serde_uses_canonical_name() {
        let json = serde_json::to_string(&PerformanceTier::MidEnd).unwrap();
        assert_eq!(json, "\"MID_END\"");
    }

    #[test]
    fn test_settings_monotonic_in_tier() {
        for refresh in [false, true] {
            for pair in PerformanceTier::ALL.windows(2) {
                let lower = pair[0].recommended_settings(refresh);
                let upper = pair[1].recommended_settings(refresh);
                assert!(upper.target_fps >= lower.target_fps);
                assert!(upper.cache_size_mb >= lower.cache_size_mb);
                assert!(upper.max_concurrent_operations >= lower.max_concurrent_operations);
                assert!(upper.animation_scale >= lower.animation_scale);
                assert!(upper.image_quality >= lower.image_quality);
            }
        }
    }

    fn inputs() -> impl Strategy<Value = ScoreInputs> {
        (
            0u32..16,
            0u32..16,
            0u32..40,
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(m, c, a, g, r, h)| ScoreInputs {
                memory_gb: m,
                cpu_cores: c,
                api_level: a,
                modern_graphics_api: g,
                high_refresh_display: r,
                hardware_acceleration: h,
            })
    }

    proptest! {
        #[test]
        fn prop_tier_monotonic(a in inputs(), b in inputs()) {
            let hi = ScoreInputs {
                memory_gb: a.memory_gb.max(b.memory_gb),
                cpu_cores: a.cpu_cores.max(b.cpu_cores),
                api_level: a.api_level.max(b.api_level),
                modern_graphics_api: a.modern_graphics_api || b.modern_graphics_api,
                high_refresh_display: a.high_refresh_display || b.high_refresh_display,
                hardware_acceleration: a.hardware_acceleration || b.hardware_acceleration,
            };
            prop_assert!(hi.tier() >= a.tier());
            prop_assert!(hi.tier() >= b.tier());
        }
    }
}
