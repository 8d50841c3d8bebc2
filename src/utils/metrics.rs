//! Backend call metrics collector.
//!
//! Tracks per-operation attempt counts, error counts and latency. The
//! collector is an [`AttemptObserver`], so it plugs straight into the
//! request pipeline next to the tracing observer. Uses interior mutability
//! via `Mutex` so all recording methods take `&self`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::client::{AttemptEvent, AttemptObserver};
use crate::error::ErrorKind;

/// Per-operation backend statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationMetrics {
    /// Backend attempts made for this operation, retries included.
    pub attempts: u64,
    /// Attempts that failed.
    pub errors: u64,
    /// Attempts beyond the first within one call.
    pub retries: u64,
    #[serde(skip)]
    pub total_latency: Duration,
    #[serde(skip)]
    pub max_latency: Option<Duration>,
    /// Failures by error kind.
    pub errors_by_kind: HashMap<String, u64>,
}

impl OperationMetrics {
    /// Returns the average attempt latency, or `None` if nothing was recorded.
    pub fn average_latency(&self) -> Option<Duration> {
        if self.attempts == 0 {
            return None;
        }
        Some(self.total_latency / self.attempts as u32)
    }

    /// Returns the success rate as a value between 0.0 and 1.0.
    ///
    /// If no attempts have been recorded, returns 1.0 (100%).
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 1.0;
        }
        (self.attempts - self.errors) as f64 / self.attempts as f64
    }

    fn record(&mut self, latency: Duration, attempt: u32, error: Option<ErrorKind>) {
        self.attempts += 1;
        if attempt > 1 {
            self.retries += 1;
        }
        if let Some(kind) = error {
            self.errors += 1;
            *self.errors_by_kind.entry(kind.to_string()).or_default() += 1;
        }
        self.total_latency += latency;
        self.max_latency = Some(match self.max_latency {
            Some(current) => current.max(latency),
            None => latency,
        });
    }
}

/// Gateway-level metrics collector.
///
/// Thread-safe via interior `Mutex`; share it as `Arc<MetricsCollector>`.
#[derive(Debug)]
pub struct MetricsCollector {
    operations: Mutex<HashMap<String, OperationMetrics>>,
    started: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            operations: Mutex::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    /// Records one backend attempt.
    pub fn record_attempt(
        &self,
        operation: &str,
        latency: Duration,
        attempt: u32,
        error: Option<ErrorKind>,
    ) {
        let mut operations = self.operations.lock().unwrap_or_else(|e| e.into_inner());
        operations
            .entry(operation.to_string())
            .or_default()
            .record(latency, attempt, error);
    }

    /// Returns the metrics for one operation, if it was ever attempted.
    pub fn operation(&self, operation: &str) -> Option<OperationMetrics> {
        self.operations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(operation)
            .cloned()
    }

    /// Returns a snapshot of all per-operation metrics.
    pub fn snapshot(&self) -> HashMap<String, OperationMetrics> {
        self.operations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn total_attempts(&self) -> u64 {
        self.snapshot().values().map(|m| m.attempts).sum()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Produces a human-readable summary.
    ///
    /// Example output:
    /// ```text
    /// Uptime: 45s | Backend: 12 attempts (2 errors, 1 retries)
    ///   get_document: 5 attempts, avg 20ms, 100% success
    ///   search_documents: 4 attempts, avg 120ms, 75% success
    /// ```
    pub fn summary(&self) -> String {
        let operations = self.snapshot();
        let attempts: u64 = operations.values().map(|m| m.attempts).sum();
        let errors: u64 = operations.values().map(|m| m.errors).sum();
        let retries: u64 = operations.values().map(|m| m.retries).sum();

        let mut summary = format!(
            "Uptime: {}s | Backend: {} attempts ({} errors, {} retries)",
            self.uptime().as_secs(),
            attempts,
            errors,
            retries,
        );

        let mut entries: Vec<_> = operations.iter().collect();
        entries.sort_by(|a, b| b.1.attempts.cmp(&a.1.attempts).then(a.0.cmp(b.0)));

        for (name, metrics) in entries {
            let avg = match metrics.average_latency() {
                Some(d) => format_duration(d),
                None => "N/A".to_string(),
            };
            let success_pct = (metrics.success_rate() * 100.0).round() as u64;
            summary.push_str(&format!(
                "\n  {}: {} attempts, avg {}, {}% success",
                name, metrics.attempts, avg, success_pct,
            ));
        }

        summary
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptObserver for MetricsCollector {
    fn on_attempt(&self, event: &AttemptEvent) {
        self.record_attempt(&event.operation, event.latency, event.attempt, event.error_kind);
    }
}

/// Formats a duration in a human-friendly way.
fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{}us", micros)
    } else if micros < 1_000_000 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
