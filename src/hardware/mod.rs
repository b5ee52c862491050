// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Hardware detection and device profiling for adaptive behavior
//!
//! A single detection pass scores the host on memory, cores, platform level
//! and a handful of features, then maps the score onto a performance tier
//! with a fixed settings bundle.

pub mod detector;
pub mod probe;
pub mod thermal;
pub mod tier;

pub use detector::*;
pub use probe::*;
pub use thermal::*;
pub use tier::*;
