// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! perfcore - device-adaptive performance toolkit
//!
//! Entry point for the perfcore CLI application.

use anyhow::Context;
use clap::Parser;

use perfcore::cli::{Cli, Commands};
use perfcore::commands;
use perfcore::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` shows crate diagnostics and the mirrored perf log; `-vv` adds
    // debug entries everywhere. `RUST_LOG` still applies.
    let directives: &[&str] = match cli.verbose {
        0 => &[],
        1 => &["perfcore=debug"],
        _ => &["perfcore=trace", "debug"],
    };
    for directive in directives {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load_from(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
    settings.validate().context("invalid settings")?;

    match cli.command {
        Commands::System(ref args) => commands::system::execute(args, &cli.format, &settings)
            .await
            .context("device detection failed")?,
        Commands::Monitor(ref args) => commands::monitor::execute(args, &cli.format, settings)
            .await
            .context("monitoring failed")?,
        Commands::Settings(ref args) => {
            commands::settings::execute(args, &cli.format, &settings, &settings_path)
                .await
                .context("failed to show settings")?
        }
    }

    Ok(())
}
