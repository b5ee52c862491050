// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::sync::Arc;

use mockall::mock;

use perfcore::error::{PerfError, Result};
use perfcore::hardware::{
    CapabilityDetector, DeviceFeature, DisplayMetrics, HostProbe, PerformanceTier, SystemProbe,
};
use perfcore::logging::{LogLevel, LoggerConfig, PerfLogger};

mock! {
    pub Probe {}

    impl HostProbe for Probe {
        fn memory_gb(&self) -> Result<u32>;
        fn cpu_cores(&self) -> Result<u32>;
        fn api_level(&self) -> Result<u32>;
        fn modern_graphics_api(&self) -> Result<bool>;
        fn hardware_acceleration(&self) -> Result<bool>;
        fn display_metrics(&self) -> Result<DisplayMetrics>;
        fn thermal_query_supported(&self) -> Result<bool>;
    }
}

struct Host {
    memory_gb: u32,
    cores: u32,
    api: u32,
    vulkan: bool,
    accel: bool,
    refresh_hz: f32,
    thermal: bool,
}

fn mock_probe(host: Host) -> MockProbe {
    let mut probe = MockProbe::new();
    probe.expect_memory_gb().times(1).return_once(move || Ok(host.memory_gb));
    probe.expect_cpu_cores().times(1).return_once(move || Ok(host.cores));
    probe.expect_api_level().times(1).return_once(move || Ok(host.api));
    probe
        .expect_modern_graphics_api()
        .times(1)
        .return_once(move || Ok(host.vulkan));
    probe
        .expect_hardware_acceleration()
        .times(1)
        .return_once(move || Ok(host.accel));
    probe.expect_display_metrics().times(1).return_once(move || {
        Ok(DisplayMetrics {
            refresh_rate_hz: host.refresh_hz,
            ..DisplayMetrics::default()
        })
    });
    probe
        .expect_thermal_query_supported()
        .times(1)
        .return_once(move || Ok(host.thermal));
    probe
}

fn quiet_logger() -> PerfLogger {
    PerfLogger::new(LoggerConfig {
        console_enabled: false,
        ..LoggerConfig::default()
    })
}

#[tokio::test]
async fn test_mid_range_host() {
    let probe = mock_probe(Host {
        memory_gb: 4,
        cores: 4,
        api: 28,
        vulkan: false,
        accel: false,
        refresh_hz: 60.0,
        thermal: false,
    });
    let detector = CapabilityDetector::new(Arc::new(probe), quiet_logger());
    let profile = detector.detect_capabilities();

    assert_eq!(profile.tier, PerformanceTier::MidEnd);
    assert_eq!(profile.recommended_settings.target_fps, 45);
    assert_eq!(profile.recommended_settings.cache_size_mb, 64);
    assert!(profile.supported_features.is_empty());
    assert!(!profile.thermal_capabilities.supports_thermal_query);
}

#[tokio::test]
async fn test_high_refresh_high_end_host() {
    let probe = mock_probe(Host {
        memory_gb: 6,
        cores: 6,
        api: 29,
        vulkan: false,
        accel: false,
        refresh_hz: 90.0,
        thermal: true,
    });
    let detector = CapabilityDetector::new(Arc::new(probe), quiet_logger());
    let profile = detector.detect_capabilities();

    // 2 + 2 + 2 + 1 for the display
    assert_eq!(profile.score_inputs().score(), 7);
    assert_eq!(profile.tier, PerformanceTier::HighEnd);
    assert_eq!(profile.recommended_settings.target_fps, 90);
    assert!(profile.has_feature(DeviceFeature::HighRefreshDisplay));
    assert!(profile.has_feature(DeviceFeature::ThermalManagement));
    assert!(!profile.has_feature(DeviceFeature::AdvancedMemoryManagement));
    assert_eq!(profile.thermal_capabilities.throttle_temperature_c, 70.0);
}

#[tokio::test]
async fn test_failed_probe_falls_back_and_is_logged() {
    let mut probe = MockProbe::new();
    probe
        .expect_memory_gb()
        .returning(|| Err(PerfError::Sensor("meminfo unreadable".into())));
    probe.expect_cpu_cores().returning(|| Ok(8));
    probe.expect_api_level().returning(|| Ok(33));
    probe.expect_modern_graphics_api().returning(|| Ok(true));
    probe.expect_hardware_acceleration().returning(|| Ok(true));
    probe.expect_display_metrics().returning(|| {
        Ok(DisplayMetrics {
            refresh_rate_hz: 120.0,
            ..DisplayMetrics::default()
        })
    });
    probe.expect_thermal_query_supported().returning(|| Ok(true));

    let logger = quiet_logger();
    let detector = CapabilityDetector::new(Arc::new(probe), logger.clone());
    let profile = detector.detect_capabilities();

    // memory counts as zero; 3 + 3 + 2 + 1 + 1 still reaches premium
    assert_eq!(profile.memory_gb, 0);
    assert_eq!(profile.tier, PerformanceTier::Premium);
    assert_eq!(profile.recommended_settings.target_fps, 120);

    logger.flush().await;
    let debug = logger.log_history(Some(LogLevel::Debug), Some("DEVICE_DETECTION"));
    assert_eq!(debug.len(), 1);
    assert_eq!(debug[0].message, "Probe memory_gb failed, using default");
    assert_eq!(
        logger
            .log_history(Some(LogLevel::Info), Some("DEVICE_DETECTION"))
            .len(),
        1
    );
}

#[tokio::test]
async fn test_profile_is_published_to_subscribers() {
    let probe = mock_probe(Host {
        memory_gb: 2,
        cores: 2,
        api: 24,
        vulkan: false,
        accel: false,
        refresh_hz: 60.0,
        thermal: false,
    });
    let detector = CapabilityDetector::new(Arc::new(probe), quiet_logger());
    let mut rx = detector.profile().subscribe();
    assert!(rx.borrow().is_none());

    let profile = detector.detect_capabilities();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().as_ref(), Some(&profile));
    assert_eq!(profile.tier, PerformanceTier::LowEnd);
    assert_eq!(detector.current(), Some(profile));
}

#[tokio::test]
async fn test_system_probe_over_fake_root() {
    let root = tempfile::tempdir().unwrap();
    let write = |relative: &str, content: &str| {
        let path = root.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    };
    write("system/build.prop", "ro.product.model=test\nro.build.version.sdk=31\n");
    write("system/lib64/libvulkan.so", "");
    write("sys/class/graphics/fb0/virtual_size", "1440,3200\n");
    write("sys/class/thermal/thermal_zone0/temp", "41000\n");

    let detector = CapabilityDetector::new(
        Arc::new(SystemProbe::with_root(root.path())),
        quiet_logger(),
    );
    let profile = detector.detect_capabilities();

    assert_eq!(profile.platform_api_level, 31);
    assert_eq!(profile.display_metrics.width_px, 1440);
    assert_eq!(profile.display_metrics.height_px, 3200);
    assert!(profile.has_feature(DeviceFeature::ModernGraphicsApi));
    assert!(profile.has_feature(DeviceFeature::HardwareAcceleration));
    assert!(profile.has_feature(DeviceFeature::AdvancedMemoryManagement));
    assert!(profile.thermal_capabilities.supports_thermal_query);
    assert!(profile.cpu_core_count >= 1);
}
