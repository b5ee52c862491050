// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Timed execution helpers.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use super::logger::PerfLogger;
use crate::perf_metrics;

impl PerfLogger {
    /// Run `operation`, logging its duration and outcome.
    ///
    /// The result is handed back untouched; a failure is logged at ERROR
    /// with the error as cause and still returned to the caller.
    pub fn measure<T, E, F>(&self, category: &str, name: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Display,
    {
        let started = Instant::now();
        let result = operation();
        self.record_outcome(category, name, started, &result);
        result
    }

    /// Async counterpart of [`PerfLogger::measure`].
    pub async fn measure_async<T, E, Fut>(
        &self,
        category: &str,
        name: &str,
        operation: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let started = Instant::now();
        let result = operation.await;
        self.record_outcome(category, name, started, &result);
        result
    }

    fn record_outcome<T, E: Display>(
        &self,
        category: &str,
        name: &str,
        started: Instant,
        result: &Result<T, E>,
    ) {
        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(_) => self.info(
                category,
                &format!("Operation completed: {name}"),
                perf_metrics! {
                    "operation" => name,
                    "duration_ms" => duration_ms,
                    "status" => "success",
                },
            ),
            Err(err) => self.error(
                category,
                &format!("Operation failed: {name}"),
                perf_metrics! {
                    "operation" => name,
                    "duration_ms" => duration_ms,
                    "status" => "failed",
                },
                Some(err),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::logging::{LogLevel, LoggerConfig, MetricValue, PerfLogger};

    fn logger() -> PerfLogger {
        PerfLogger::new(LoggerConfig {
            console_enabled: false,
            ..LoggerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_measure_success_logs_info() {
        let logger = logger();
        let value: Result<u32, String> = logger.measure("CACHE", "compute", || Ok(7));
        assert_eq!(value, Ok(7));
        logger.flush().await;

        let entry = &logger.log_history(None, Some("CACHE"))[0];
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.metrics["status"], MetricValue::Str("success".into()));
        assert!(entry.metrics.contains_key("duration_ms"));
    }

    #[tokio::test]
    async fn test_measure_async_failure_is_returned_and_logged() {
        let logger = logger();
        let result: Result<(), String> = logger
            .measure_async("CACHE", "fetch", async { Err("backend down".to_string()) })
            .await;
        assert_eq!(result, Err("backend down".to_string()));
        logger.flush().await;

        let entry = &logger.log_history(Some(LogLevel::Error), None)[0];
        assert_eq!(entry.message, "Operation failed: fetch");
        assert_eq!(entry.stack_trace.as_deref(), Some("backend down"));
    }
}
