//! Per-attempt events emitted by the request pipeline.
//!
//! The pipeline holds no logging policy. It reports every attempt to an
//! [`AttemptObserver`]; what happens to the event (a log line, a metric, both)
//! is up to the observer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ErrorKind;

use super::types::Method;

/// One backend attempt, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptEvent {
    pub operation: String,
    pub method: Method,
    pub path: String,
    /// HTTP status, absent when no response was received.
    pub status: Option<u16>,
    pub latency: Duration,
    /// 1-indexed attempt number within one `execute` call.
    pub attempt: u32,
    pub error_kind: Option<ErrorKind>,
}

impl AttemptEvent {
    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }
}

/// Receives pipeline attempt events.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, event: &AttemptEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn on_attempt(&self, _event: &AttemptEvent) {}
}

/// Emits each attempt as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, event: &AttemptEvent) {
        let latency_ms = event.latency.as_millis() as u64;
        match event.error_kind {
            None => debug!(
                component = "pipeline",
                operation = %event.operation,
                method = %event.method,
                path = %event.path,
                status = event.status,
                latency_ms = latency_ms,
                attempt = event.attempt,
                "Backend attempt succeeded"
            ),
            Some(kind) => warn!(
                component = "pipeline",
                operation = %event.operation,
                method = %event.method,
                path = %event.path,
                status = event.status,
                latency_ms = latency_ms,
                attempt = event.attempt,
                error_kind = %kind,
                "Backend attempt failed"
            ),
        }
    }
}

/// Forwards each event to several observers in order.
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn AttemptObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for FanoutObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl AttemptObserver for FanoutObserver {
    fn on_attempt(&self, event: &AttemptEvent) {
        for observer in &self.observers {
            observer.on_attempt(event);
        }
    }
}

/// Records every event in memory. Used by tests to assert on attempts.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<AttemptEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AttemptEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Events recorded for `operation`.
    pub fn for_operation(&self, operation: &str) -> Vec<AttemptEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.operation == operation)
            .collect()
    }
}

impl AttemptObserver for RecordingObserver {
    fn on_attempt(&self, event: &AttemptEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
