// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// perfcore - device-adaptive performance toolkit
#[derive(Parser, Debug)]
#[command(name = "perfcore")]
#[command(version, about = "Device capability detection, caching and GPU telemetry")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (defaults to ~/.perfcore/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect device capabilities and print the profile
    #[command(alias = "hw")]
    System(SystemArgs),

    /// Run the GPU monitor and print what it sees
    Monitor(MonitorArgs),

    /// Print effective settings and per-tier overrides
    #[command(alias = "config")]
    Settings(SettingsArgs),
}

/// Arguments for the system subcommand
#[derive(clap::Args, Debug, Default)]
pub struct SystemArgs {
    /// Also print the thermal and display details
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the monitor subcommand
#[derive(clap::Args, Debug)]
pub struct MonitorArgs {
    /// How long to monitor for
    #[arg(short, long, default_value_t = 5)]
    pub seconds: u64,

    /// Print every snapshot instead of only changes in quality or thermal state
    #[arg(long)]
    pub all: bool,
}

impl Default for MonitorArgs {
    fn default() -> Self {
        Self {
            seconds: 5,
            all: false,
        }
    }
}

/// Arguments for the settings subcommand
#[derive(clap::Args, Debug, Default)]
pub struct SettingsArgs {
    /// Only print the settings file location
    #[arg(long)]
    pub path: bool,
}

/// Output format for command results
#[derive(ValueEnum, Clone, Debug, Default, PartialEq)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Text,

    /// JSON output
    Json,
}
