//! Token-bucket rate limiter for outbound backend calls.
//!
//! `acquire()` never rejects; it delays the caller until a token is
//! available. Waiters are admitted in FIFO order: the bucket sits behind a
//! `tokio::sync::Mutex`, whose lock queue is fair, and the waiter at the head
//! of the queue sleeps while holding it.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with capacity `C` and refill rate `R` tokens per second.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a full bucket.
    ///
    /// A capacity or refill rate of 0 means unlimited (`acquire` returns immediately).
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Bucket refilling `per_minute` tokens each minute.
    pub fn per_minute(capacity: u32, per_minute: u32) -> Self {
        Self::new(capacity, per_minute as f64 / 60.0)
    }

    pub fn unlimited() -> Self {
        Self::new(0, 0.0)
    }

    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0 || self.refill_per_sec <= 0.0
    }

    /// Wait for a token and consume it.
    pub async fn acquire(&self) {
        if self.is_unlimited() {
            return;
        }

        let mut bucket = self.bucket.lock().await;
        loop {
            self.refill(&mut bucket);
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                return;
            }
            let deficit = 1.0 - bucket.tokens;
            let wait = Duration::from_secs_f64(deficit / self.refill_per_sec);
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiter delaying request");
            tokio::time::sleep(wait).await;
        }
    }

    /// Consume a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        if self.is_unlimited() {
            return true;
        }
        match self.bucket.try_lock() {
            Ok(mut bucket) => {
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    true
                } else {
                    false
                }
            }
            // Someone is already queued; they go first.
            Err(_) => false,
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity as f64);
        bucket.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_zero_capacity_is_unlimited() {
        let limiter = RateLimiter::new(0, 1.0);
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_burst_up_to_capacity_is_immediate() {
        let limiter = RateLimiter::new(5, 1.0);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(200));
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_saturation_takes_at_least_c_over_r() {
        // 2C requests against C=5, R=50/s must take at least 5/50 = 100ms.
        let limiter = Arc::new(RateLimiter::new(5, 50.0));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_fifo_admission() {
        let limiter = Arc::new(RateLimiter::new(1, 100.0));
        limiter.acquire().await;

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..5 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Let each task reach the lock queue before spawning the next.
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_acquire_pends_on_empty_bucket() {
        let limiter = RateLimiter::new(1, 0.5);
        limiter.acquire().await;

        let mut waiting = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(waiting.poll());
        // The waiter holds the queue, so nobody can jump ahead.
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_per_minute_rate() {
        let limiter = RateLimiter::per_minute(100, 120);
        assert!((limiter.refill_per_sec - 2.0).abs() < f64::EPSILON);
        assert!(!limiter.is_unlimited());
    }
}
