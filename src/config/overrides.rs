// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Per-tier override documents
//!
//! An override document adjusts the tier table (frame rate targets,
//! animation scales, cache sizes) and carries experiment flags plus free-form
//! string overrides. Documents come from an [`OverrideSource`] and are only
//! adopted when their version is newer than the one in use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::{PerfError, Result};
use crate::hardware::{PerformanceSettings, PerformanceTier};
use crate::logging::PerfLogger;
use crate::observable::Observable;
use crate::perf_metrics;

const CATEGORY: &str = "CONFIG";

/// Default period of the background refresh.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Override document, keyed by canonical tier name (`LOW_END`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierOverrides {
    pub version: u32,
    pub enable_experimental_features: bool,
    pub frame_rate_targets: BTreeMap<String, u32>,
    pub animation_scale_multipliers: BTreeMap<String, f32>,
    pub cache_size_mb: BTreeMap<String, u32>,
    pub experiment_flags: BTreeMap<String, bool>,
    pub performance_overrides: BTreeMap<String, String>,
}

impl Default for TierOverrides {
    fn default() -> Self {
        Self {
            version: 1,
            enable_experimental_features: false,
            frame_rate_targets: tier_table(|s| s.target_fps),
            animation_scale_multipliers: tier_table(|s| s.animation_scale),
            cache_size_mb: tier_table(|s| s.cache_size_mb),
            experiment_flags: BTreeMap::new(),
            performance_overrides: BTreeMap::new(),
        }
    }
}

/// One column of the tier table, without the high-refresh bump.
fn tier_table<T>(pick: impl Fn(&PerformanceSettings) -> T) -> BTreeMap<String, T> {
    PerformanceTier::ALL
        .into_iter()
        .map(|tier| (tier.name().to_string(), pick(&tier.recommended_settings(false))))
        .collect()
}

impl TierOverrides {
    /// Frame rate target for `tier`, falling back to the tier table.
    pub fn target_fps_for_tier(&self, tier: PerformanceTier) -> u32 {
        self.frame_rate_targets
            .get(tier.name())
            .copied()
            .unwrap_or_else(|| tier.recommended_settings(false).target_fps)
    }

    pub fn animation_scale_for_tier(&self, tier: PerformanceTier) -> f32 {
        self.animation_scale_multipliers
            .get(tier.name())
            .copied()
            .unwrap_or_else(|| tier.recommended_settings(false).animation_scale)
    }

    /// General cache size for `tier` in MB.
    pub fn cache_size_for_tier(&self, tier: PerformanceTier) -> u32 {
        self.cache_size_mb
            .get(tier.name())
            .copied()
            .unwrap_or_else(|| tier.recommended_settings(false).cache_size_mb)
    }

    /// Experimental features need both the global switch and their flag.
    pub fn is_experimental_feature_enabled(&self, feature: &str) -> bool {
        self.enable_experimental_features
            && self.experiment_flags.get(feature).copied().unwrap_or(false)
    }

    /// Parse a document, choosing TOML or JSON by `format`.
    pub fn parse(content: &str, format: DocumentFormat) -> Result<Self> {
        match format {
            DocumentFormat::Json => Ok(serde_json::from_str(content)?),
            DocumentFormat::Toml => Ok(toml::from_str(content)?),
        }
    }
}

/// On-disk encoding of an override document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// `.toml` files are TOML, anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Somewhere an override document can be fetched from.
#[async_trait]
pub trait OverrideSource: Send + Sync {
    async fn fetch(&self) -> Result<TierOverrides>;

    /// Short description used in log entries.
    fn describe(&self) -> String;
}

/// Reads an override document from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileOverrideSource {
    path: PathBuf,
}

impl FileOverrideSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OverrideSource for FileOverrideSource {
    async fn fetch(&self) -> Result<TierOverrides> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        TierOverrides::parse(&content, DocumentFormat::from_path(&self.path))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory source whose document can be swapped at any time.
#[derive(Debug, Default)]
pub struct StaticOverrideSource {
    document: Mutex<Option<TierOverrides>>,
}

impl StaticOverrideSource {
    pub fn new(document: TierOverrides) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }

    /// A source that fails every fetch until a document is set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&self, document: TierOverrides) {
        *self.document.lock().unwrap_or_else(|p| p.into_inner()) = Some(document);
    }
}

#[async_trait]
impl OverrideSource for StaticOverrideSource {
    async fn fetch(&self) -> Result<TierOverrides> {
        self.document
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or_else(|| PerfError::Config("no override document available".to_string()))
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

struct ConfigInner {
    source: Option<Arc<dyn OverrideSource>>,
    current: Observable<TierOverrides>,
    loading: Observable<bool>,
    logger: PerfLogger,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ConfigInner {
    fn drop(&mut self) {
        if let Some(task) = self
            .refresh_task
            .get_mut()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            task.abort();
        }
    }
}

/// Live override configuration shared by the runtime.
#[derive(Clone)]
pub struct PerformanceConfig {
    inner: Arc<ConfigInner>,
}

impl fmt::Debug for PerformanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceConfig")
            .field("version", &self.inner.current.get().version)
            .field(
                "source",
                &self.inner.source.as_ref().map(|s| s.describe()),
            )
            .finish()
    }
}

impl PerformanceConfig {
    /// Start from the default document. Without a source, `refresh` is a
    /// no-op and only temporary overrides change the document.
    pub fn new(source: Option<Arc<dyn OverrideSource>>, logger: PerfLogger) -> Self {
        Self {
            inner: Arc::new(ConfigInner {
                source,
                current: Observable::new(TierOverrides::default()),
                loading: Observable::new(false),
                logger,
                refresh_task: Mutex::new(None),
            }),
        }
    }

    pub fn current(&self) -> TierOverrides {
        self.inner.current.get()
    }

    pub fn overrides(&self) -> &Observable<TierOverrides> {
        &self.inner.current
    }

    pub fn is_loading(&self) -> &Observable<bool> {
        &self.inner.loading
    }

    /// Fetch from the source and adopt the result if its version is newer.
    ///
    /// Returns whether a new document was adopted. Fetch failures are logged
    /// and leave the current document in place.
    pub async fn refresh(&self) -> bool {
        let Some(source) = self.inner.source.as_ref() else {
            return false;
        };
        let logger = &self.inner.logger;
        self.inner.loading.set(true);
        logger.info(
            CATEGORY,
            "Fetching override config",
            perf_metrics! { "source" => source.describe() },
        );

        let adopted = match source.fetch().await {
            Ok(document) => {
                let old_version = self.inner.current.get().version;
                let new_version = document.version;
                let adopted = new_version > old_version;
                if adopted {
                    self.inner.current.set(document);
                    logger.info(
                        CATEGORY,
                        "Override config updated",
                        perf_metrics! {
                            "old_version" => old_version,
                            "new_version" => new_version,
                        },
                    );
                } else {
                    logger.info(
                        CATEGORY,
                        "Override config up to date",
                        perf_metrics! { "version" => old_version },
                    );
                }
                adopted
            }
            Err(err) => {
                logger.error(
                    CATEGORY,
                    "Failed to fetch override config",
                    perf_metrics! { "source" => source.describe() },
                    Some(&err),
                );
                false
            }
        };

        self.inner.loading.set(false);
        adopted
    }

    /// Refresh now and then every `interval`. Returns false when already
    /// scheduled, when there is no source or no runtime.
    pub fn start_periodic_refresh(&self, interval: Duration) -> bool {
        if self.inner.source.is_none() || interval.is_zero() {
            return false;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        let mut slot = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        if slot.is_some() {
            return false;
        }
        *slot = Some(handle.spawn(refresh_loop(Arc::downgrade(&self.inner), interval)));
        true
    }

    pub fn stop_periodic_refresh(&self) {
        let task = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    pub fn is_experimental_feature_enabled(&self, feature: &str) -> bool {
        self.inner.current.get().is_experimental_feature_enabled(feature)
    }

    /// Experiment flag lookup with a default.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.inner
            .current
            .get()
            .experiment_flags
            .get(key)
            .copied()
            .unwrap_or(default)
    }

    /// Typed lookup into the string overrides. Unparseable values are
    /// reported and replaced by `default`.
    pub fn config_value<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let current = self.inner.current.get();
        let Some(raw) = current.performance_overrides.get(key) else {
            return default;
        };
        match raw.parse() {
            Ok(value) => value,
            Err(err) => {
                self.inner.logger.warn(
                    CATEGORY,
                    &format!("Failed to get config value for key: {key}"),
                    perf_metrics! { "error" => err.to_string() },
                );
                default
            }
        }
    }

    /// Set an in-memory override. It is lost when a newer document arrives.
    pub fn set_temporary_override(&self, key: &str, value: impl fmt::Display) {
        let value = value.to_string();
        self.inner.current.update(|current| {
            current
                .performance_overrides
                .insert(key.to_string(), value.clone());
        });
        self.inner.logger.info(
            CATEGORY,
            "Temporary override set",
            perf_metrics! { "key" => key, "value" => value },
        );
    }

    pub fn clear_temporary_overrides(&self) {
        self.inner
            .current
            .update(|current| current.performance_overrides.clear());
        self.inner
            .logger
            .info(CATEGORY, "Temporary overrides cleared", perf_metrics! {});
    }

    pub fn target_fps_for_tier(&self, tier: PerformanceTier) -> u32 {
        self.inner.current.get().target_fps_for_tier(tier)
    }

    pub fn animation_scale_for_tier(&self, tier: PerformanceTier) -> f32 {
        self.inner.current.get().animation_scale_for_tier(tier)
    }

    pub fn cache_size_for_tier(&self, tier: PerformanceTier) -> u32 {
        self.inner.current.get().cache_size_for_tier(tier)
    }

    pub fn shutdown(&self) {
        self.stop_periodic_refresh();
    }
}

async fn refresh_loop(weak: Weak<ConfigInner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else { break };
        PerformanceConfig { inner }.refresh().await;
    }
}
