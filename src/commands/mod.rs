// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Subcommand implementations
//!
//! Each command renders into a `String` so output can be tested without a
//! terminal, and `execute` prints it.

pub mod monitor;
pub mod settings;
pub mod system;

use serde::Serialize;

use crate::config::Settings;
use crate::error::Result;
use crate::hardware::SystemProbe;
use crate::logging::{LoggerConfig, PerfLogger};

/// Host probe honouring the `host` settings section.
pub fn host_probe(settings: &Settings) -> SystemProbe {
    let probe = match &settings.host.probe_root {
        Some(root) => SystemProbe::with_root(root),
        None => SystemProbe::new(),
    };
    probe.with_api_level(settings.host.api_level)
}

/// Logger for one-shot commands; nothing is mirrored to the console.
pub(crate) fn quiet_logger(settings: &Settings) -> PerfLogger {
    PerfLogger::new(LoggerConfig {
        console_enabled: false,
        ..settings.logger_config()
    })
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
