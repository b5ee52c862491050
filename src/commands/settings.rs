// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Effective settings command

use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use crate::cli::args::{OutputFormat, SettingsArgs};
use crate::config::{FileOverrideSource, OverrideSource, PerformanceConfig, Settings};
use crate::error::Result;
use crate::hardware::PerformanceTier;

use super::{quiet_logger, to_json};

/// One row of the per-tier table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierRow {
    pub tier: PerformanceTier,
    pub target_fps: u32,
    pub animation_scale: f32,
    pub cache_size_mb: u32,
}

#[derive(Serialize)]
struct SettingsReport<'a> {
    path: String,
    settings: &'a Settings,
    overrides_version: u32,
    tiers: Vec<TierRow>,
}

/// Execute the settings command
pub async fn execute(
    args: &SettingsArgs,
    format: &OutputFormat,
    settings: &Settings,
    path: &Path,
) -> Result<()> {
    if args.path {
        println!("{}", path.display());
        return Ok(());
    }

    let logger = quiet_logger(settings);
    let source = settings
        .overrides
        .path
        .as_ref()
        .map(|p| Arc::new(FileOverrideSource::new(p)) as Arc<dyn OverrideSource>);
    let overrides = PerformanceConfig::new(source, logger.clone());
    overrides.refresh().await;

    let report = SettingsReport {
        path: path.display().to_string(),
        settings,
        overrides_version: overrides.current().version,
        tiers: tier_table(&overrides),
    };

    if matches!(format, OutputFormat::Json) {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", render_text(&report)?);
    }
    logger.flush().await;
    logger.shutdown();
    Ok(())
}

/// Effective per-tier values after overrides.
pub fn tier_table(overrides: &PerformanceConfig) -> Vec<TierRow> {
    PerformanceTier::ALL
        .into_iter()
        .map(|tier| TierRow {
            tier,
            target_fps: overrides.target_fps_for_tier(tier),
            animation_scale: overrides.animation_scale_for_tier(tier),
            cache_size_mb: overrides.cache_size_for_tier(tier),
        })
        .collect()
}

fn render_text(report: &SettingsReport<'_>) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "Settings file: {}\n", report.path);
    let _ = writeln!(out, "{}", to_json(report.settings)?);
    let _ = writeln!(
        out,
        "\n=== Per-tier values (overrides v{}) ===",
        report.overrides_version
    );
    let _ = writeln!(out, "  {:<10} {:>4} {:>6} {:>9}", "TIER", "FPS", "ANIM", "CACHE MB");
    for row in &report.tiers {
        let _ = writeln!(
            out,
            "  {:<10} {:>4} {:>6.1} {:>9}",
            row.tier.name(),
            row.target_fps,
            row.animation_scale,
            row.cache_size_mb
        );
    }
    Ok(out)
}
