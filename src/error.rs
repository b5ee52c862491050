// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for perfcore
//!
//! Almost every failure inside the core degrades to a default or a retry, so
//! these variants mostly surface at the edges: settings I/O, override
//! documents, and cache factories whose failure belongs to the caller.

use thiserror::Error;

/// Boxed error produced by caller-supplied computations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for perfcore operations
#[derive(Error, Debug)]
pub enum PerfError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(String),

    /// A sensor backend failed in a way that is not simply "value unavailable"
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Cache bookkeeping errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// A value factory passed to the cache failed
    #[error("Value factory failed: {0}")]
    Factory(#[source] BoxError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation attempted on a component that was already shut down
    #[error("Component shut down: {0}")]
    Shutdown(String),
}

/// Result type alias for perfcore operations
pub type Result<T> = std::result::Result<T, PerfError>;

impl From<toml::de::Error> for PerfError {
    fn from(err: toml::de::Error) -> Self {
        PerfError::Toml(err.to_string())
    }
}

impl PerfError {
    /// Wrap an arbitrary failure coming out of a caller-provided factory.
    pub fn factory<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        PerfError::Factory(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_error_config() {
        let err = PerfError::Config("bad interval".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("bad interval"));
    }

    #[test]
    fn test_perf_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PerfError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_perf_error_from_toml() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("version = ");
        let err: PerfError = parsed.unwrap_err().into();
        assert!(err.to_string().contains("TOML error"));
    }

    #[test]
    fn test_factory_keeps_source() {
        let err = PerfError::factory("upstream timed out");
        assert!(err.to_string().contains("upstream timed out"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_shutdown_message() {
        let err = PerfError::Shutdown("logger".into());
        assert_eq!(err.to_string(), "Component shut down: logger");
    }
}
