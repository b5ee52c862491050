// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! GPU telemetry and adaptive rendering quality
//!
//! Sensor nodes are polled through [`SensorReader`] so that tests and
//! non-Linux hosts can supply their own values. Missing sensors fall back
//! to profile estimates rather than failing.

pub mod frames;
pub mod gpu;
pub mod monitor;
pub mod quality;
pub mod sensors;

pub use frames::{FrameTimeWindow, DEFAULT_FRAME_TIME_MS, DEFAULT_FRAME_WINDOW};
pub use gpu::*;
pub use monitor::*;
pub use quality::*;
pub use sensors::*;
