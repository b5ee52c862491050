// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Asynchronous buffered performance logger.
//!
//! Producers enqueue onto an unbounded channel and return immediately. A
//! single processor task drains the channel in submission order, keeps the
//! most recent entries in a ring buffer, mirrors qualifying entries to the
//! console (through `tracing`) and optionally to a file, and rebroadcasts
//! every entry to live subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::entry::{LogEntry, LogLevel, Metrics};
use crate::perf_metrics;

/// Default ring buffer capacity.
pub const MAX_LOG_ENTRIES: usize = 1000;

const BROADCAST_CAPACITY: usize = 1024;
const CONSOLE_TARGET: &str = "perfcore::perf";

/// Logger configuration, usually taken from the `logging` settings section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Minimum level mirrored to the console sink
    pub min_level: LogLevel,
    /// Mirror entries to the console sink
    pub console_enabled: bool,
    /// Append entries to this file when set
    pub file_path: Option<PathBuf>,
    /// Number of entries kept in memory
    pub buffer_capacity: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            console_enabled: true,
            file_path: None,
            buffer_capacity: MAX_LOG_ENTRIES,
        }
    }
}

/// Aggregate view of the buffered entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub total_entries: usize,
    pub level_distribution: BTreeMap<LogLevel, usize>,
    pub category_distribution: BTreeMap<String, usize>,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct SinkSettings {
    min_level: LogLevel,
    console_enabled: bool,
    file_path: Option<PathBuf>,
}

/// State touched by both the producers' query API and the processor.
struct Shared {
    buffer: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    sinks: RwLock<SinkSettings>,
    events: broadcast::Sender<LogEntry>,
}

impl Shared {
    fn buffer(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.buffer.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Log buffer lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn sinks(&self) -> SinkSettings {
        match self.sinks.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update_sinks<F: FnOnce(&mut SinkSettings)>(&self, f: F) {
        let mut guard = self
            .sinks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }

    async fn process(&self, entry: &LogEntry, file: &mut FileSink) {
        {
            let mut buffer = self.buffer();
            buffer.push_back(entry.clone());
            while buffer.len() > self.capacity {
                buffer.pop_front();
            }
        }

        let sinks = self.sinks();

        if sinks.console_enabled && entry.level >= sinks.min_level {
            emit_console(entry);
        }

        file.write(sinks.file_path, &entry.format_line()).await;

        // No subscribers is not an error worth reporting.
        let _ = self.events.send(entry.clone());
    }
}

fn emit_console(entry: &LogEntry) {
    let line = entry.format_line();
    match entry.level {
        LogLevel::Debug => tracing::debug!(target: CONSOLE_TARGET, "{}", line),
        LogLevel::Info => tracing::info!(target: CONSOLE_TARGET, "{}", line),
        LogLevel::Warn => tracing::warn!(target: CONSOLE_TARGET, "{}", line),
        LogLevel::Error | LogLevel::Critical => {
            tracing::error!(target: CONSOLE_TARGET, "{}", line)
        }
    }
}

/// Open log file owned by the processor task. The handle is reopened only
/// when the configured path changes.
#[derive(Default)]
struct FileSink {
    path: Option<PathBuf>,
    file: Option<tokio::fs::File>,
}

impl FileSink {
    async fn write(&mut self, wanted: Option<PathBuf>, line: &str) {
        if self.path != wanted {
            self.file = None;
            self.path = wanted;
        }
        let Some(path) = self.path.clone() else {
            return;
        };
        if let Err(e) = self.append(&path, line).await {
            // reopen on the next entry
            self.file = None;
            tracing::error!("Error writing to perf log file {}: {}", path.display(), e);
        }
    }

    async fn append(&mut self, path: &Path, line: &str) -> std::io::Result<()> {
        if self.file.is_none() {
            let opened = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            self.file = Some(opened);
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

/// Channel end plus the sequence counter, locked together so that sequence
/// numbers follow channel order.
struct Enqueue {
    next_sequence: u64,
    tx: mpsc::UnboundedSender<LogEntry>,
}

/// Receiver side parked until a runtime is available to drive it.
struct Parked {
    rx: mpsc::UnboundedReceiver<LogEntry>,
    processed_tx: watch::Sender<u64>,
}

struct Inner {
    enqueue: Mutex<Enqueue>,
    shared: Arc<Shared>,
    processed_rx: watch::Receiver<u64>,
    parked: Mutex<Option<Parked>>,
    processor: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// Cloneable handle to the structured performance logger.
#[derive(Clone)]
pub struct PerfLogger {
    inner: Arc<Inner>,
}

impl fmt::Debug for PerfLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerfLogger")
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for PerfLogger {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

impl PerfLogger {
    /// Create a logger. The processor starts immediately when called inside
    /// a Tokio runtime; otherwise entries queue until [`PerfLogger::start`].
    pub fn new(config: LoggerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (processed_tx, processed_rx) = watch::channel(0u64);
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);

        let shared = Arc::new(Shared {
            buffer: Mutex::new(VecDeque::new()),
            capacity: config.buffer_capacity.max(1),
            sinks: RwLock::new(SinkSettings {
                min_level: config.min_level,
                console_enabled: config.console_enabled,
                file_path: config.file_path,
            }),
            events,
        });

        let logger = Self {
            inner: Arc::new(Inner {
                enqueue: Mutex::new(Enqueue {
                    next_sequence: 0,
                    tx,
                }),
                shared,
                processed_rx,
                parked: Mutex::new(Some(Parked { rx, processed_tx })),
                processor: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        };
        logger.start();
        logger
    }

    /// Spawn the processor task if it is not running yet.
    ///
    /// Returns false when no Tokio runtime is available.
    pub fn start(&self) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        let parked = match self.inner.parked.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(Parked {
            mut rx,
            processed_tx,
        }) = parked
        else {
            return true;
        };

        let shared = Arc::clone(&self.inner.shared);
        let task = handle.spawn(async move {
            let mut file = FileSink::default();
            while let Some(entry) = rx.recv().await {
                shared.process(&entry, &mut file).await;
                processed_tx.send_replace(entry.sequence + 1);
            }
        });

        let mut processor = self
            .inner
            .processor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *processor = Some(task);
        true
    }

    pub fn debug(&self, category: &str, message: &str, metrics: Metrics) {
        self.log(LogLevel::Debug, category, message, metrics, None);
    }

    pub fn info(&self, category: &str, message: &str, metrics: Metrics) {
        self.log(LogLevel::Info, category, message, metrics, None);
    }

    pub fn warn(&self, category: &str, message: &str, metrics: Metrics) {
        self.log(LogLevel::Warn, category, message, metrics, None);
    }

    pub fn error(
        &self,
        category: &str,
        message: &str,
        metrics: Metrics,
        cause: Option<&dyn fmt::Display>,
    ) {
        let trace = cause.map(|c| c.to_string());
        self.log(LogLevel::Error, category, message, metrics, trace);
    }

    pub fn critical(
        &self,
        category: &str,
        message: &str,
        metrics: Metrics,
        cause: Option<&dyn fmt::Display>,
    ) {
        let trace = cause.map(|c| c.to_string());
        self.log(LogLevel::Critical, category, message, metrics, trace);
    }

    /// Enqueue an entry. Never blocks on the processor.
    pub fn log(
        &self,
        level: LogLevel,
        category: &str,
        message: &str,
        metrics: Metrics,
        stack_trace: Option<String>,
    ) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }

        let mut enqueue = self
            .inner
            .enqueue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = LogEntry {
            sequence: enqueue.next_sequence,
            timestamp: Utc::now(),
            level,
            category: category.to_string(),
            message: message.to_string(),
            metrics,
            stack_trace,
        };
        if enqueue.tx.send(entry).is_ok() {
            enqueue.next_sequence += 1;
        }
    }

    /// Number of entries enqueued so far.
    pub fn submitted(&self) -> u64 {
        self.inner
            .enqueue
            .lock()
            .map(|e| e.next_sequence)
            .unwrap_or_else(|poisoned| poisoned.into_inner().next_sequence)
    }

    /// Wait until every entry enqueued before this call has been processed.
    pub async fn flush(&self) {
        if self.inner.closed.load(Ordering::Acquire) || !self.start() {
            return;
        }
        let target = self.submitted();
        let mut rx = self.inner.processed_rx.clone();
        let _ = rx.wait_for(|processed| *processed >= target).await;
    }

    /// Live feed of processed entries.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.inner.shared.events.subscribe()
    }

    // ===== Configuration =====

    pub fn set_min_level(&self, level: LogLevel) {
        self.inner.shared.update_sinks(|s| s.min_level = level);
        self.info(
            "LOGGER_CONFIG",
            &format!("Min log level changed to {}", level.tag()),
            Metrics::new(),
        );
    }

    pub fn min_level(&self) -> LogLevel {
        self.inner.shared.sinks().min_level
    }

    pub fn set_console_enabled(&self, enabled: bool) {
        self.inner.shared.update_sinks(|s| s.console_enabled = enabled);
    }

    pub fn enable_file_logging(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let shown = path.display().to_string();
        self.inner.shared.update_sinks(|s| s.file_path = Some(path));
        self.info(
            "LOGGER_CONFIG",
            &format!("File logging enabled: {shown}"),
            Metrics::new(),
        );
    }

    pub fn disable_file_logging(&self) {
        self.inner.shared.update_sinks(|s| s.file_path = None);
        self.info("LOGGER_CONFIG", "File logging disabled", Metrics::new());
    }

    pub fn file_logging_path(&self) -> Option<PathBuf> {
        self.inner.shared.sinks().file_path
    }

    // ===== Queries =====

    /// Buffered entries, optionally filtered by exact level and category.
    pub fn log_history(&self, level: Option<LogLevel>, category: Option<&str>) -> Vec<LogEntry> {
        self.inner
            .shared
            .buffer()
            .iter()
            .filter(|e| level.map_or(true, |l| e.level == l))
            .filter(|e| category.map_or(true, |c| e.category == c))
            .cloned()
            .collect()
    }

    pub fn log_summary(&self) -> LogSummary {
        let buffer = self.inner.shared.buffer();
        let mut level_distribution = BTreeMap::new();
        let mut category_distribution = BTreeMap::new();
        for entry in buffer.iter() {
            *level_distribution.entry(entry.level).or_insert(0) += 1;
            *category_distribution
                .entry(entry.category.clone())
                .or_insert(0) += 1;
        }
        LogSummary {
            total_entries: buffer.len(),
            level_distribution,
            category_distribution,
            oldest_entry: buffer.iter().map(|e| e.timestamp).min(),
            newest_entry: buffer.iter().map(|e| e.timestamp).max(),
        }
    }

    /// Buffered entries rendered one per line.
    pub fn export_logs(&self) -> String {
        self.inner
            .shared
            .buffer()
            .iter()
            .map(LogEntry::format_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.shared.buffer().len()
    }

    // ===== Domain helpers =====

    pub fn log_frame_metrics(&self, fps: f32, frame_time_ms: f32, jank_count: u32) {
        self.info(
            "FRAME_METRICS",
            "Frame performance update",
            perf_metrics! {
                "fps" => fps.round() as i64,
                "frame_time_ms" => frame_time_ms.round() as i64,
                "jank_count" => jank_count,
            },
        );
    }

    pub fn log_memory_metrics(&self, used_mb: u64, available_mb: u64, usage_percent: f32) {
        let level = if usage_percent >= 95.0 {
            LogLevel::Critical
        } else if usage_percent > 85.0 {
            LogLevel::Warn
        } else {
            LogLevel::Info
        };
        self.log(
            level,
            "MEMORY_METRICS",
            "Memory usage update",
            perf_metrics! {
                "used_mb" => used_mb,
                "available_mb" => available_mb,
                "usage_percent" => usage_percent.round() as i64,
            },
            None,
        );
    }

    pub fn log_performance_anomaly(&self, anomaly: &str, severity: &str, details: Metrics) {
        let level = match severity.to_ascii_lowercase().as_str() {
            "low" => LogLevel::Info,
            "medium" => LogLevel::Warn,
            "high" => LogLevel::Error,
            "critical" => LogLevel::Critical,
            _ => LogLevel::Warn,
        };
        self.log(
            level,
            "PERFORMANCE_ANOMALY",
            &format!("Performance anomaly detected: {anomaly}"),
            details,
            None,
        );
    }

    pub fn log_optimization_applied(&self, optimization: &str, device_tier: &str, impact: Metrics) {
        self.info(
            "OPTIMIZATION",
            &format!("Applied optimization: {optimization} for {device_tier}"),
            impact,
        );
    }

    /// Stop the processor and drop everything buffered.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        if let Some(task) = self
            .inner
            .processor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            task.abort();
        }
        self.inner.shared.buffer().clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}
