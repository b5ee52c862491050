// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Structured performance logging
//!
//! Every component reports through a shared [`PerfLogger`]. Entries carry a
//! category, a message and a small typed metrics payload, and are kept in a
//! bounded in-memory history for debug surfaces.

pub mod entry;
pub mod logger;
pub mod measure;

pub use entry::*;
pub use logger::*;

/// Build a [`Metrics`] map from `key => value` pairs.
///
/// Values go through `MetricValue::from`, so integers, floats, bools and
/// strings can be mixed freely.
#[macro_export]
macro_rules! perf_metrics {
    () => {
        $crate::logging::Metrics::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut metrics = $crate::logging::Metrics::new();
        $(
            metrics.insert(
                ::std::string::ToString::to_string(&$key),
                $crate::logging::MetricValue::from($value),
            );
        )+
        metrics
    }};
}
