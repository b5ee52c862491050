// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! perfcore - device-adaptive performance runtime.
//!
//! This crate exposes the components used by the `perfcore` CLI and by
//! embedding applications:
//! - `hardware`: one-shot capability detection and tier settings
//! - `cache`: TTL/LRU cache with metrics, plus a tier-sized image cache
//! - `telemetry`: GPU and thermal polling with adaptive rendering quality
//! - `logging`: buffered structured performance log
//! - `config`: user settings and per-tier override documents
//! - `runtime`: owner that builds and shuts down all of the above
//!
//! Components publish their state through [`observable::Observable`] so UI
//! layers can subscribe without polling.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod observable;
pub mod runtime;
pub mod telemetry;

pub use error::{PerfError, Result};
pub use runtime::PerfRuntime;
