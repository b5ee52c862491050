// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Device capability command

use std::fmt::Write as _;
use std::sync::Arc;

use crate::cli::args::{OutputFormat, SystemArgs};
use crate::config::Settings;
use crate::error::Result;
use crate::hardware::{CapabilityDetector, DeviceProfile};

use super::{host_probe, quiet_logger, to_json};

/// Execute the system command
pub async fn execute(args: &SystemArgs, format: &OutputFormat, settings: &Settings) -> Result<()> {
    let logger = quiet_logger(settings);
    let detector = CapabilityDetector::new(Arc::new(host_probe(settings)), logger.clone());
    let profile = detector.detect_capabilities();
    println!("{}", render(&profile, args.detailed, format)?);
    logger.flush().await;
    logger.shutdown();
    Ok(())
}

/// Format a detected profile.
pub fn render(profile: &DeviceProfile, detailed: bool, format: &OutputFormat) -> Result<String> {
    if matches!(format, OutputFormat::Json) {
        return to_json(profile);
    }

    let settings = &profile.recommended_settings;
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Device Performance Profile ===\n");
    let _ = writeln!(
        out,
        "Tier: {} ({})",
        profile.tier.display_name(),
        profile.tier
    );
    let _ = writeln!(out, "Memory: {}GB", profile.memory_gb);
    let _ = writeln!(out, "CPU cores: {}", profile.cpu_core_count);
    let _ = writeln!(out, "Platform API level: {}", profile.platform_api_level);
    let _ = writeln!(
        out,
        "Hardware acceleration: {}",
        if profile.hardware_acceleration_available {
            "yes"
        } else {
            "no"
        }
    );

    if !profile.supported_features.is_empty() {
        let _ = writeln!(out, "\n=== Features ===");
        for feature in &profile.supported_features {
            let _ = writeln!(out, "  ✓ {feature:?}");
        }
    }

    let _ = writeln!(out, "\n=== Recommended Settings ===");
    let _ = writeln!(out, "  Target FPS: {}", settings.target_fps);
    let _ = writeln!(out, "  Animation scale: {:.1}", settings.animation_scale);
    let _ = writeln!(out, "  Image quality: {:?}", settings.image_quality);
    let _ = writeln!(
        out,
        "  Max concurrent operations: {}",
        settings.max_concurrent_operations
    );
    let _ = writeln!(
        out,
        "  Advanced effects: {}",
        if settings.advanced_effects_enabled {
            "on"
        } else {
            "off"
        }
    );
    let _ = writeln!(out, "  Cache size: {}MB", settings.cache_size_mb);

    if detailed {
        let thermal = &profile.thermal_capabilities;
        let display = &profile.display_metrics;
        let _ = writeln!(out, "\n=== Thermal ===");
        let _ = writeln!(
            out,
            "  Thermal query: {}",
            if thermal.supports_thermal_query {
                "supported"
            } else {
                "unsupported"
            }
        );
        let _ = writeln!(
            out,
            "  Sustained performance ratio: {:.1}",
            thermal.max_sustained_performance_ratio
        );
        let _ = writeln!(
            out,
            "  Throttle temperature: {:.0}°C",
            thermal.throttle_temperature_c
        );
        let _ = writeln!(out, "\n=== Display ===");
        let _ = writeln!(
            out,
            "  {}x{} @ {} dpi, {:.0} Hz",
            display.width_px, display.height_px, display.density_dpi, display.refresh_rate_hz
        );
    }

    Ok(out)
}
