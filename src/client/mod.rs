//! Resilient HTTP client layer.
//!
//! - [`types`]: request/response descriptions
//! - [`transport`]: the network seam and its `reqwest` implementation
//! - [`classify`]: status and transport failure classification
//! - [`retry`]: backoff policy
//! - [`rate_limit`]: token-bucket limiter
//! - [`events`]: per-attempt observability events
//! - [`pipeline`]: the composition of all of the above

pub mod classify;
pub mod events;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
pub mod transport;
pub mod types;

pub use events::{AttemptEvent, AttemptObserver, FanoutObserver, NoopObserver, RecordingObserver, TracingObserver};
pub use pipeline::RequestPipeline;
pub use rate_limit::RateLimiter;
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{OutboundRequest, RawResponse, ReqwestTransport, Transport, TransportError, TransportErrorKind};
pub use types::{Method, RequestBody, RequestSpec, ResponseEnvelope, StatusClass};
