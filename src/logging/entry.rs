// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Log entry, level and metric value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PerfError;

/// Severity of a performance log entry, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Tag printed in formatted output.
    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Debug => "PERF_DEBUG",
            LogLevel::Info => "PERF_INFO",
            LogLevel::Warn => "PERF_WARN",
            LogLevel::Error => "PERF_ERROR",
            LogLevel::Critical => "PERF_CRITICAL",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(PerfError::InvalidInput(format!("unknown log level: {other}"))),
        }
    }
}

/// Free-form metric payload value attached to a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Bool(v) => write!(f, "{v}"),
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v:.2}"),
            MetricValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Str(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Str(v)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Float(v as f64)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

macro_rules! int_metric {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MetricValue {
                fn from(v: $t) -> Self {
                    MetricValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

int_metric!(i32, i64, u32, u64, usize);

/// Key/value payload of a log entry. Ordered so exports are stable.
pub type Metrics = BTreeMap<String, MetricValue>;

/// One immutable structured log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Submission order, assigned when the entry is enqueued.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl LogEntry {
    /// Single-line rendering used by the file sink and `export_logs`.
    pub fn format_line(&self) -> String {
        let ts = self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let mut line = format!(
            "[{ts}] [{}] [{}] {}",
            self.level.tag(),
            self.category,
            self.message
        );
        if !self.metrics.is_empty() {
            let pairs: Vec<String> = self
                .metrics
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            line.push_str(" | Metrics: {");
            line.push_str(&pairs.join(", "));
            line.push('}');
        }
        if let Some(trace) = &self.stack_trace {
            line.push_str(" | Cause: ");
            line.push_str(trace);
        }
        line
    }
}
