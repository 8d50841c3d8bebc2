//! Utils module - logging setup and backend call metrics

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{MetricsCollector, OperationMetrics};
