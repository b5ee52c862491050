// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for perfcore
//!
//! Handles loading and saving settings from ~/.perfcore/settings.json

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::logging::{LogLevel, MAX_LOG_ENTRIES};

mod io;
mod migration;
mod validation;

/// Main settings structure, stored in ~/.perfcore/settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Structured performance logger
    #[serde(default)]
    pub logging: LoggingSettings,

    /// General-purpose cache
    #[serde(default)]
    pub cache: CacheSettings,

    /// Image cache budget
    #[serde(default)]
    pub image_cache: ImageCacheSettings,

    /// GPU and thermal monitor timing
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Host probing overrides
    #[serde(default)]
    pub host: HostSettings,

    /// Per-tier override document
    #[serde(default)]
    pub overrides: OverrideSettings,
}

/// Performance logger settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level mirrored to the console
    #[serde(default = "default_min_level")]
    pub min_level: LogLevel,

    #[serde(default = "default_true")]
    pub console_enabled: bool,

    /// Append entries to this file when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// In-memory history size
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

/// General cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entry bound. When unset the bound comes from the tier cache size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,

    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,

    #[serde(default = "default_true")]
    pub enable_metrics: bool,
}

/// Image cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCacheSettings {
    /// Byte budget before tier scaling
    #[serde(default = "default_image_budget_bytes")]
    pub base_budget_bytes: u64,

    #[serde(default = "default_image_ttl_secs")]
    pub ttl_secs: u64,
}

/// GPU monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,

    #[serde(default = "default_thermal_interval_ms")]
    pub thermal_interval_ms: u64,

    /// Delay after a failed polling iteration
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Number of frame times averaged
    #[serde(default = "default_frame_window")]
    pub frame_window: usize,
}

/// Host probing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HostSettings {
    /// Report this platform API level instead of probing for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_level: Option<u32>,

    /// Filesystem root used for device probing (defaults to /)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_root: Option<PathBuf>,
}

/// Override document settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSettings {
    /// JSON or TOML override document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Background refresh period, 0 disables it
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_min_level() -> LogLevel {
    LogLevel::Info
}

fn default_buffer_capacity() -> usize {
    MAX_LOG_ENTRIES
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    5 * 60
}

fn default_metrics_interval_secs() -> u64 {
    10
}

fn default_image_budget_bytes() -> u64 {
    crate::cache::DEFAULT_IMAGE_BUDGET_BYTES
}

fn default_image_ttl_secs() -> u64 {
    60 * 60
}

fn default_metrics_interval_ms() -> u64 {
    1000
}

fn default_thermal_interval_ms() -> u64 {
    2000
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_frame_window() -> usize {
    crate::telemetry::DEFAULT_FRAME_WINDOW
}

fn default_refresh_interval_secs() -> u64 {
    30 * 60
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            console_enabled: true,
            file_path: None,
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: None,
            default_ttl_secs: default_cache_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            metrics_interval_secs: default_metrics_interval_secs(),
            enable_metrics: true,
        }
    }
}

impl Default for ImageCacheSettings {
    fn default() -> Self {
        Self {
            base_budget_bytes: default_image_budget_bytes(),
            ttl_secs: default_image_ttl_secs(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            metrics_interval_ms: default_metrics_interval_ms(),
            thermal_interval_ms: default_thermal_interval_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            frame_window: default_frame_window(),
        }
    }
}

impl Default for OverrideSettings {
    fn default() -> Self {
        Self {
            path: None,
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.logging.min_level, LogLevel::Info);
        assert_eq!(settings.logging.buffer_capacity, 1000);
        assert!(settings.cache.max_entries.is_none());
        assert_eq!(settings.cache.default_ttl_secs, 1800);
        assert_eq!(settings.image_cache.base_budget_bytes, 50 * 1024 * 1024);
        assert_eq!(settings.monitor.frame_window, 60);
        assert_eq!(settings.overrides.refresh_interval_secs, 1800);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"logging": {"min_level": "DEBUG"}, "cache": {"max_entries": 50}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.logging.min_level, LogLevel::Debug);
        assert!(settings.logging.console_enabled);
        assert_eq!(settings.cache.max_entries, Some(50));
        assert_eq!(settings.cache.cleanup_interval_secs, 300);
        assert_eq!(settings.monitor, MonitorSettings::default());
    }

    #[test]
    fn test_settings_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.host.api_level = Some(33);
        settings.monitor.metrics_interval_ms = 500;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_optional_fields_are_not_serialized() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert!(value["logging"].get("file_path").is_none());
        assert!(value["host"].get("api_level").is_none());
    }
}
