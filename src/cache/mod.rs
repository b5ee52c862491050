// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! In-memory caching with expiry and least-recently-used eviction

pub mod entry;
pub mod image;
pub mod smart;

pub use entry::{CacheConfig, CacheMetrics, ESTIMATED_ENTRY_BYTES};
pub use image::*;
pub use smart::SmartCache;
