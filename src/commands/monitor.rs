// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Live GPU monitoring command

use futures::StreamExt;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::args::{MonitorArgs, OutputFormat};
use crate::config::Settings;
use crate::error::Result;
use crate::logging::LogSummary;
use crate::runtime::PerfRuntime;
use crate::telemetry::{
    GpuMetricsSnapshot, RenderingQuality, SensorReader, SessionStats, SysfsSensorReader,
    ThermalState,
};

use super::{host_probe, to_json};

/// One printed monitoring sample.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSample {
    #[serde(flatten)]
    pub snapshot: GpuMetricsSnapshot,
    pub thermal_state: ThermalState,
    pub rendering_quality: RenderingQuality,
}

#[derive(Serialize)]
struct MonitorReport<'a> {
    vendor: String,
    samples: &'a [MonitorSample],
    session: SessionStats,
    recommendations: Vec<String>,
    log_summary: LogSummary,
}

/// Execute the monitor command
pub async fn execute(args: &MonitorArgs, format: &OutputFormat, settings: Settings) -> Result<()> {
    let sensors: Arc<dyn SensorReader> = Arc::new(SysfsSensorReader::new());
    let probe = Arc::new(host_probe(&settings));
    let runtime = PerfRuntime::init(settings, probe, sensors).await?;
    let json = matches!(format, OutputFormat::Json);

    if !json {
        println!(
            "Monitoring {} GPU on a {} device for {}s...",
            runtime.monitor().vendor(),
            runtime.profile().tier.display_name(),
            args.seconds
        );
    }

    let samples = collect_samples(&runtime, Duration::from_secs(args.seconds), |sample, changed| {
        if !json && (args.all || changed) {
            println!("{}", render_sample(sample));
        }
    })
    .await;

    runtime.logger().flush().await;
    let report = MonitorReport {
        vendor: runtime.monitor().vendor().to_string(),
        samples: &samples,
        session: runtime.monitor().session_stats(),
        recommendations: runtime.monitor().recommendations(),
        log_summary: runtime.logger().log_summary(),
    };

    if json {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", render_report(&report));
    }

    runtime.shutdown().await;
    Ok(())
}

/// Gather snapshots published by the running monitor until `duration`
/// elapses. `on_sample` sees each sample and whether the thermal state or
/// quality changed since the previous one.
pub async fn collect_samples<F>(
    runtime: &PerfRuntime,
    duration: Duration,
    mut on_sample: F,
) -> Vec<MonitorSample>
where
    F: FnMut(&MonitorSample, bool),
{
    let monitor = runtime.monitor();
    let mut snapshots = monitor.snapshot().stream();
    // The first item is the placeholder published at construction.
    snapshots.next().await;

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    let mut samples: Vec<MonitorSample> = Vec::new();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            next = snapshots.next() => {
                let Some(snapshot) = next else { break };
                let sample = MonitorSample {
                    snapshot,
                    thermal_state: monitor.thermal_state().get(),
                    rendering_quality: monitor.rendering_quality().get(),
                };
                let changed = samples.last().map_or(true, |prev| {
                    prev.thermal_state != sample.thermal_state
                        || prev.rendering_quality != sample.rendering_quality
                });
                on_sample(&sample, changed);
                samples.push(sample);
            }
        }
    }
    samples
}

fn render_sample(sample: &MonitorSample) -> String {
    let s = &sample.snapshot;
    format!(
        "[{}] {:>7.1} MHz  {:>5.1}%  {:>5.1}°C  {:<8} {:<9}{}",
        s.timestamp.format("%H:%M:%S"),
        s.frequency_mhz,
        s.utilization_percent,
        s.temperature_c,
        sample.thermal_state,
        sample.rendering_quality,
        if s.is_throttling { "  throttling" } else { "" }
    )
}

fn render_report(report: &MonitorReport<'_>) -> String {
    let mut out = String::new();
    let session = &report.session;
    let _ = writeln!(out, "\n=== Session ===");
    let _ = writeln!(out, "  Samples: {}", report.samples.len());
    let _ = writeln!(out, "  Frames rendered: {}", session.total_frames_rendered);
    let _ = writeln!(out, "  Throttle events: {}", session.thermal_throttle_events);
    let _ = writeln!(out, "  Temperature: {:.1}°C", session.current_temperature);
    let _ = writeln!(out, "  Quality: {}", session.current_quality);

    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "\n=== Recommendations ===");
        for advice in &report.recommendations {
            let _ = writeln!(out, "  • {advice}");
        }
    }

    let summary = &report.log_summary;
    let _ = writeln!(out, "\n=== Log Summary ===");
    let _ = writeln!(out, "  Entries: {}", summary.total_entries);
    for (level, count) in &summary.level_distribution {
        let _ = writeln!(out, "  {level:<8} {count}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{DisplayMetrics, HostProbe};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    struct Budget;

    impl HostProbe for Budget {
        fn memory_gb(&self) -> Result<u32> {
            Ok(2)
        }
        fn cpu_cores(&self) -> Result<u32> {
            Ok(4)
        }
        fn api_level(&self) -> Result<u32> {
            Ok(26)
        }
        fn modern_graphics_api(&self) -> Result<bool> {
            Ok(false)
        }
        fn hardware_acceleration(&self) -> Result<bool> {
            Ok(false)
        }
        fn display_metrics(&self) -> Result<DisplayMetrics> {
            Ok(DisplayMetrics::default())
        }
        fn thermal_query_supported(&self) -> Result<bool> {
            Ok(true)
        }
    }

    struct Nodes(HashMap<PathBuf, String>);

    impl SensorReader for Nodes {
        fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
            Ok(self.0.get(path).cloned())
        }
        fn exists(&self, path: &Path) -> bool {
            self.0.contains_key(path)
        }
        fn hardware_name(&self) -> Option<String> {
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_samples_reports_changes_once() {
        let mut settings = Settings::default();
        settings.logging.console_enabled = false;
        let nodes = Nodes(HashMap::from([(
            PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
            "58000".to_string(),
        )]));
        let runtime = PerfRuntime::init(settings, Arc::new(Budget), Arc::new(nodes))
            .await
            .unwrap();

        let mut changes = 0;
        let samples = collect_samples(&runtime, Duration::from_millis(4500), |_, changed| {
            if changed {
                changes += 1;
            }
        })
        .await;

        assert!(samples.len() >= 4);
        assert!(samples.iter().all(|s| s.snapshot.temperature_c == 58.0));
        assert!(changes >= 1);
        assert!(changes < samples.len());
        runtime.shutdown().await;
    }

    #[test]
    fn test_render_sample_line() {
        let sample = MonitorSample {
            snapshot: GpuMetricsSnapshot {
                frequency_mhz: 585.0,
                utilization_percent: 42.0,
                temperature_c: 71.5,
                is_throttling: true,
                ..GpuMetricsSnapshot::default()
            },
            thermal_state: ThermalState::Hot,
            rendering_quality: RenderingQuality::Low,
        };
        let line = render_sample(&sample);
        assert!(line.contains("585.0 MHz"));
        assert!(line.contains("71.5°C"));
        assert!(line.contains("HOT"));
        assert!(line.ends_with("throttling"));
    }
}
