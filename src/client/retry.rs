//! Retry policy: exponential backoff with jitter for transient failures.
//!
//! Only failures classified transient (transport errors, 429, 5xx) are
//! retried. A non-idempotent request is retried only when the backend gave no
//! response at all, or answered 429 (the request was rejected before it had
//! any effect). Everything else surfaces on the first failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// What the pipeline should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again.
    RetryAfter(Duration),
    /// Return the failure to the caller unchanged.
    Surface,
    /// The budget is spent; wrap the failure as `RetriesExhausted`.
    Exhausted,
}

/// Backoff parameters.
///
/// The delay before retry `n` (0-indexed) is
/// `min(base_delay_ms * 2^n + jitter, max_delay_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Default: 3.
    pub max_attempts: u32,
    /// Base delay in milliseconds. Default: 1000.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds. Default: 30000.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Decide what to do after attempt number `attempt` (1-indexed) failed with `err`.
    ///
    /// `retry_after` is the backend's `Retry-After` hint, if it sent one.
    pub fn decide(
        &self,
        err: &GatewayError,
        attempt: u32,
        idempotent: bool,
        retry_after: Option<Duration>,
    ) -> RetryDecision {
        if !err.is_transient() {
            return RetryDecision::Surface;
        }
        if !idempotent && !is_safe_to_repeat(err) {
            return RetryDecision::Surface;
        }
        if attempt >= self.max_attempts.max(1) {
            return RetryDecision::Exhausted;
        }

        let cap = Duration::from_millis(self.max_delay_ms);
        let delay = match retry_after {
            Some(hint) => hint.min(cap),
            None => Duration::from_millis(compute_delay(
                attempt - 1,
                self.base_delay_ms,
                self.max_delay_ms,
                jitter_ms(self.base_delay_ms),
            )),
        };
        RetryDecision::RetryAfter(delay)
    }

    /// Wrap the last failure once the budget is spent.
    pub fn exhausted(&self, attempts: u32, last: GatewayError) -> GatewayError {
        GatewayError::RetriesExhausted {
            attempts,
            last: Box::new(last),
        }
    }
}

/// Whether repeating a non-idempotent request cannot duplicate its effect.
///
/// True when no response was observed, or the backend throttled the call.
fn is_safe_to_repeat(err: &GatewayError) -> bool {
    match err.status() {
        None => true,
        Some(429) => true,
        Some(_) => false,
    }
}

/// Compute the backoff delay for a given attempt (without sleeping).
///
/// # Arguments
/// * `attempt` - The current retry attempt (0-indexed)
/// * `base_delay_ms` - Base delay in milliseconds
/// * `max_delay_ms` - Maximum delay cap in milliseconds
/// * `jitter_ms` - Jitter value to add
pub fn compute_delay(attempt: u32, base_delay_ms: u64, max_delay_ms: u64, jitter_ms: u64) -> u64 {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(16));
    exponential.saturating_add(jitter_ms).min(max_delay_ms)
}

/// Jitter in `[0, base_delay_ms)` taken from the clock's nanosecond component.
fn jitter_ms(base_delay_ms: u64) -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64 % base_delay_ms.max(1))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;

    fn transient(status: Option<u16>) -> GatewayError {
        let f = Failure::new("boom");
        GatewayError::Transient(match status {
            Some(s) => f.status(s),
            None => f,
        })
    }

    #[test]
    fn test_defaults() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.base_delay_ms, 1000);
        assert_eq!(p.max_delay_ms, 30_000);
    }

    #[test]
    fn test_compute_delay_exponential() {
        assert_eq!(compute_delay(0, 1000, 30_000, 0), 1000);
        assert_eq!(compute_delay(1, 1000, 30_000, 0), 2000);
        assert_eq!(compute_delay(2, 1000, 30_000, 0), 4000);
        assert_eq!(compute_delay(3, 1000, 30_000, 0), 8000);
    }

    #[test]
    fn test_compute_delay_capped() {
        assert_eq!(compute_delay(10, 1000, 30_000, 0), 30_000);
        assert_eq!(compute_delay(4, 1000, 30_000, 500), 16_500);
        assert_eq!(compute_delay(40, u64::MAX, 30_000, 0), 30_000);
    }

    #[test]
    fn test_jitter_below_base() {
        for _ in 0..20 {
            assert!(jitter_ms(100) < 100);
        }
        assert_eq!(jitter_ms(0), 0);
    }

    #[test]
    fn test_non_transient_surfaces() {
        let p = RetryPolicy::default();
        let err = GatewayError::NotFound(Failure::new("gone").status(404));
        assert_eq!(p.decide(&err, 1, true, None), RetryDecision::Surface);
        let err = GatewayError::BackendRejected(Failure::new("bad").status(400));
        assert_eq!(p.decide(&err, 1, true, None), RetryDecision::Surface);
    }

    #[test]
    fn test_idempotent_transient_retries_then_exhausts() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };
        let err = transient(Some(503));
        assert!(matches!(
            p.decide(&err, 1, true, None),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(&err, 2, true, None),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(&err, 3, true, None), RetryDecision::Exhausted);
    }

    #[test]
    fn test_non_idempotent_with_response_surfaces() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.decide(&transient(Some(502)), 1, false, None),
            RetryDecision::Surface
        );
    }

    #[test]
    fn test_non_idempotent_without_response_retries() {
        let p = RetryPolicy::default();
        assert!(matches!(
            p.decide(&transient(None), 1, false, None),
            RetryDecision::RetryAfter(_)
        ));
        let unreachable = GatewayError::Unreachable(Failure::new("refused"));
        assert!(matches!(
            p.decide(&unreachable, 1, false, None),
            RetryDecision::RetryAfter(_)
        ));
    }

    #[test]
    fn test_non_idempotent_throttled_retries() {
        let p = RetryPolicy::default();
        let err = GatewayError::RateLimited(Failure::new("slow down").status(429));
        assert!(matches!(
            p.decide(&err, 1, false, None),
            RetryDecision::RetryAfter(_)
        ));
    }

    #[test]
    fn test_retry_after_hint_honoured_and_capped() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 2000,
        };
        let err = GatewayError::RateLimited(Failure::new("slow down").status(429));
        assert_eq!(
            p.decide(&err, 1, true, Some(Duration::from_secs(1))),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            p.decide(&err, 1, true, Some(Duration::from_secs(60))),
            RetryDecision::RetryAfter(Duration::from_millis(2000))
        );
    }

    #[test]
    fn test_none_policy_exhausts_immediately() {
        let p = RetryPolicy::none();
        assert_eq!(
            p.decide(&transient(None), 1, true, None),
            RetryDecision::Exhausted
        );
    }

    #[test]
    fn test_exhausted_wraps_last_failure() {
        let p = RetryPolicy::default();
        let err = p.exhausted(3, transient(Some(503)));
        assert!(matches!(err, GatewayError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(err.status(), Some(503));
    }
}
