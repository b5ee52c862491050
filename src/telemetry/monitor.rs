// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Adaptive GPU and thermal monitor.
//!
//! Two independent loops run while the monitor is started: a metrics loop
//! that samples sensors, publishes a [`GpuMetricsSnapshot`] and advances the
//! rendering-quality ratchet, and a thermal loop that reclassifies the
//! [`ThermalState`]. A failed iteration is logged and retried after a longer
//! delay; it never ends the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::frames::FrameTimeWindow;
use super::gpu::{estimated_memory_usage_mb, GpuPerformanceProfile, GpuVendor};
use super::quality::{QualitySignal, RenderingQuality, ThermalState};
use super::sensors::{
    parse_frequency_mhz, parse_temperature_c, parse_utilization, probe_first, SensorPaths,
    SensorReader,
};
use crate::error::Result;
use crate::hardware::PerformanceTier;
use crate::logging::PerfLogger;
use crate::observable::Observable;
use crate::perf_metrics;

const CATEGORY: &str = "GPU_METRICS";

/// Temperature assumed when no thermal node can be read.
pub const DEFAULT_TEMPERATURE_C: f32 = 45.0;

/// Loop timing and window size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub metrics_interval: Duration,
    pub thermal_interval: Duration,
    pub retry_delay: Duration,
    pub frame_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            metrics_interval: Duration::from_secs(1),
            thermal_interval: Duration::from_secs(2),
            retry_delay: Duration::from_secs(5),
            frame_window: super::frames::DEFAULT_FRAME_WINDOW,
        }
    }
}

/// One polling tick worth of GPU readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuMetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub frequency_mhz: f32,
    pub utilization_percent: f32,
    pub temperature_c: f32,
    pub is_throttling: bool,
    pub memory_usage_mb: u64,
    pub frame_render_time_ms: f32,
}

impl Default for GpuMetricsSnapshot {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            frequency_mhz: 0.0,
            utilization_percent: 0.0,
            temperature_c: 0.0,
            is_throttling: false,
            memory_usage_mb: 0,
            frame_render_time_ms: 0.0,
        }
    }
}

/// Cumulative figures for the current monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub total_frames_rendered: u64,
    pub thermal_throttle_events: u64,
    pub average_frame_time_ms: f32,
    pub current_gpu_utilization: f32,
    pub current_temperature: f32,
    pub current_quality: RenderingQuality,
}

struct MonitorInner {
    reader: Arc<dyn SensorReader>,
    paths: SensorPaths,
    tier: PerformanceTier,
    vendor: GpuVendor,
    profile: GpuPerformanceProfile,
    config: MonitorConfig,
    logger: PerfLogger,
    frames: FrameTimeWindow,
    snapshot: Observable<GpuMetricsSnapshot>,
    thermal_state: Observable<ThermalState>,
    quality: Observable<RenderingQuality>,
    throttle_events: AtomicU64,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MonitorInner {
    fn abort_tasks(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        let n = tasks.len();
        for task in tasks.drain(..) {
            task.abort();
        }
        n
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Cloneable handle to the GPU monitor.
#[derive(Clone)]
pub struct GpuMonitor {
    inner: Arc<MonitorInner>,
}

impl fmt::Debug for GpuMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuMonitor")
            .field("tier", &self.inner.tier)
            .field("vendor", &self.inner.vendor)
            .field("quality", &self.inner.quality.get())
            .finish()
    }
}

impl GpuMonitor {
    /// Detect the GPU vendor and pick a profile for `tier`. Polling does not
    /// begin until [`GpuMonitor::start`].
    pub fn new(
        tier: PerformanceTier,
        reader: Arc<dyn SensorReader>,
        paths: SensorPaths,
        config: MonitorConfig,
        logger: PerfLogger,
    ) -> Self {
        let vendor = GpuVendor::detect(reader.as_ref());
        let profile = GpuPerformanceProfile::for_device(vendor, tier);

        logger.info(
            CATEGORY,
            "GPU detection completed",
            perf_metrics! {
                "vendor" => vendor.display_name(),
                "class" => format!("{:?}", profile.class),
                "device_tier" => tier.name(),
                "throttle_temp_c" => profile.thermal_throttle_temp_c,
            },
        );

        Self {
            inner: Arc::new(MonitorInner {
                reader,
                paths,
                tier,
                vendor,
                profile,
                frames: FrameTimeWindow::new(config.frame_window),
                config,
                logger,
                snapshot: Observable::new(GpuMetricsSnapshot::default()),
                thermal_state: Observable::new(ThermalState::Normal),
                quality: Observable::new(RenderingQuality::default()),
                throttle_events: AtomicU64::new(0),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Spawn the metrics and thermal loops. Returns false when already
    /// running or when no Tokio runtime is available.
    pub fn start(&self) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("GPU monitor needs a Tokio runtime to start");
            return false;
        };
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(|p| p.into_inner());
        if !tasks.is_empty() {
            return false;
        }

        let config = &self.inner.config;
        tasks.push(handle.spawn(run_loop(
            Arc::downgrade(&self.inner),
            config.metrics_interval,
            config.retry_delay,
            "Metrics collection error",
            |monitor| monitor.metrics_tick().map(|_| ()),
        )));
        tasks.push(handle.spawn(run_loop(
            Arc::downgrade(&self.inner),
            config.thermal_interval,
            config.retry_delay,
            "Thermal monitoring error",
            |monitor| monitor.thermal_tick().map(|_| ()),
        )));
        true
    }

    pub fn is_running(&self) -> bool {
        !self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_empty()
    }

    /// Read every sensor once, applying fallbacks for missing values.
    pub fn collect_metrics(&self) -> Result<GpuMetricsSnapshot> {
        let inner = &self.inner;
        let reader = inner.reader.as_ref();
        let average_frame = inner.frames.average();

        let frequency_mhz = probe_first(reader, &inner.paths.frequency, parse_frequency_mhz)?
            .unwrap_or(inner.profile.base_frequency_mhz);
        let utilization_percent =
            match probe_first(reader, &inner.paths.utilization, parse_utilization)? {
                Some(value) => value,
                None => self.estimate_utilization(average_frame),
            };
        let temperature_c = self.read_temperature()?;

        Ok(GpuMetricsSnapshot {
            timestamp: Utc::now(),
            frequency_mhz,
            utilization_percent,
            temperature_c,
            is_throttling: temperature_c > inner.profile.thermal_throttle_temp_c,
            memory_usage_mb: estimated_memory_usage_mb(inner.tier),
            frame_render_time_ms: average_frame,
        })
    }

    /// One metrics-loop iteration: sample, publish, adjust quality.
    pub fn metrics_tick(&self) -> Result<GpuMetricsSnapshot> {
        let snapshot = self.collect_metrics()?;
        self.inner.snapshot.set(snapshot.clone());
        self.update_rendering_quality(&snapshot);
        Ok(snapshot)
    }

    /// One thermal-loop iteration. Entering HOT or CRITICAL counts as a
    /// throttle event and is logged as a warning.
    pub fn thermal_tick(&self) -> Result<ThermalState> {
        let temperature = self.read_temperature()?;
        let state = ThermalState::classify(temperature);
        if self.inner.thermal_state.set_if_changed(state) && state.needs_throttle() {
            self.inner.throttle_events.fetch_add(1, Ordering::Relaxed);
            self.inner.logger.warn(
                CATEGORY,
                "Thermal throttling detected",
                perf_metrics! {
                    "temperature" => temperature,
                    "state" => state.name(),
                },
            );
        }
        Ok(state)
    }

    fn read_temperature(&self) -> Result<f32> {
        let inner = &self.inner;
        Ok(
            probe_first(inner.reader.as_ref(), &inner.paths.thermal, parse_temperature_c)?
                .unwrap_or(DEFAULT_TEMPERATURE_C),
        )
    }

    fn estimate_utilization(&self, average_frame_ms: f32) -> f32 {
        let target = self.inner.profile.target_frame_time_ms();
        (average_frame_ms / target * 100.0).clamp(0.0, 100.0)
    }

    fn update_rendering_quality(&self, snapshot: &GpuMetricsSnapshot) {
        let current = self.inner.quality.get();
        let signal = QualitySignal {
            throttling: snapshot.is_throttling,
            temperature_c: snapshot.temperature_c,
            utilization_percent: snapshot.utilization_percent,
        };
        let next = current.next(signal, self.inner.tier);
        if next != current {
            self.inner.quality.set(next);
            self.inner.logger.info(
                CATEGORY,
                "Rendering quality adjusted",
                perf_metrics! {
                    "old_quality" => current.name(),
                    "new_quality" => next.name(),
                    "gpu_utilization" => snapshot.utilization_percent,
                    "temperature" => snapshot.temperature_c,
                },
            );
        }
    }

    /// Force a quality level, for example from a settings screen.
    pub fn set_rendering_quality(&self, quality: RenderingQuality) {
        let previous = self.inner.quality.get();
        if self.inner.quality.set_if_changed(quality) {
            self.inner.logger.info(
                CATEGORY,
                "Rendering quality overridden",
                perf_metrics! {
                    "old_quality" => previous.name(),
                    "new_quality" => quality.name(),
                },
            );
        }
    }

    pub fn record_frame_render_time(&self, render_time_ms: f32) {
        self.inner.frames.record(render_time_ms);
    }

    pub fn average_frame_time(&self) -> f32 {
        self.inner.frames.average()
    }

    /// Advice for the current thermal state.
    pub fn recommendations(&self) -> Vec<String> {
        let advice: &[&str] = match self.inner.thermal_state.get() {
            ThermalState::Critical => &[
                "Reduce texture resolution",
                "Disable advanced effects",
                "Lower the target frame rate",
            ],
            ThermalState::Hot => &["Reduce shader quality", "Enable adaptive VSync"],
            ThermalState::Warm => &["Keep an eye on device temperature"],
            ThermalState::Normal => {
                if self.inner.snapshot.get().utilization_percent < 50.0 {
                    &["Graphics quality can be raised"]
                } else {
                    &[]
                }
            }
        };
        advice.iter().map(|s| s.to_string()).collect()
    }

    pub fn session_stats(&self) -> SessionStats {
        let snapshot = self.inner.snapshot.get();
        SessionStats {
            total_frames_rendered: self.inner.frames.total_frames(),
            thermal_throttle_events: self.inner.throttle_events.load(Ordering::Relaxed),
            average_frame_time_ms: self.inner.frames.average(),
            current_gpu_utilization: snapshot.utilization_percent,
            current_temperature: snapshot.temperature_c,
            current_quality: self.inner.quality.get(),
        }
    }

    pub fn performance_profile(&self) -> &GpuPerformanceProfile {
        &self.inner.profile
    }

    pub fn vendor(&self) -> GpuVendor {
        self.inner.vendor
    }

    pub fn tier(&self) -> PerformanceTier {
        self.inner.tier
    }

    pub fn snapshot(&self) -> &Observable<GpuMetricsSnapshot> {
        &self.inner.snapshot
    }

    pub fn thermal_state(&self) -> &Observable<ThermalState> {
        &self.inner.thermal_state
    }

    pub fn rendering_quality(&self) -> &Observable<RenderingQuality> {
        &self.inner.quality
    }

    /// Stop both loops and drop the frame history.
    pub fn shutdown(&self) {
        if self.inner.abort_tasks() > 0 {
            tracing::debug!("GPU monitor stopped");
        }
        self.inner.frames.clear();
    }
}

/// Drive `tick` every `period`, backing off to `retry` after a failure.
async fn run_loop(
    weak: Weak<MonitorInner>,
    period: Duration,
    retry: Duration,
    failure_message: &'static str,
    tick: fn(&GpuMonitor) -> Result<()>,
) {
    loop {
        let Some(inner) = weak.upgrade() else { break };
        let monitor = GpuMonitor { inner };
        let delay = match tick(&monitor) {
            Ok(()) => period,
            Err(err) => {
                monitor.inner.logger.error(
                    CATEGORY,
                    failure_message,
                    perf_metrics! { "retry_ms" => retry.as_millis() as u64 },
                    Some(&err),
                );
                retry
            }
        };
        drop(monitor);
        tokio::time::sleep(delay).await;
    }
}
