//! Continuously-refilled token bucket.
//!
//! Allows bursts up to `max_calls` and refills at `max_calls / per_seconds`
//! tokens per second. When empty, [`TokenBucket::acquire`] blocks the caller
//! until a token frees up; it never fails fast. Callers needing fail-fast
//! wrap the whole envelope in a timeout instead.

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter shared by all in-flight calls of one adapter.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket with the given capacity and window.
    ///
    /// A non-positive window degenerates to an effectively unlimited refill
    /// rate rather than a division by zero.
    pub fn new(max_calls: u32, per_seconds: f64) -> Self {
        let capacity = f64::from(max_calls.max(1));
        let per_seconds = if per_seconds > 0.0 { per_seconds } else { f64::MIN_POSITIVE };
        Self {
            capacity,
            refill_per_sec: capacity / per_seconds,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, waiting for refill if none is available.
    ///
    /// The critical section only computes the wait; sleeping happens outside
    /// the lock so concurrent callers queue on time, not on the mutex.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available, for health snapshots.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn burst_up_to_capacity_is_immediate() {
        let bucket = TokenBucket::new(5, 1.0);
        let started = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn overflow_blocks_instead_of_erroring() {
        // 4 tokens per 200ms = one token per 50ms.
        let bucket = TokenBucket::new(4, 0.2);
        for _ in 0..4 {
            bucket.acquire().await;
        }
        let started = Instant::now();
        bucket.acquire().await;
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(30), "waited {waited:?}");
    }

    #[tokio::test]
    async fn refill_is_continuous_not_a_period_reset() {
        // 10 tokens per second = one every 100ms.
        let bucket = TokenBucket::new(10, 1.0);
        for _ in 0..10 {
            bucket.acquire().await;
        }
        // A single token should free up after ~100ms, well before the
        // full 1s window has elapsed.
        let started = Instant::now();
        bucket.acquire().await;
        let waited = started.elapsed();
        assert!(waited < Duration::from_millis(500), "waited {waited:?}");
    }

    #[tokio::test]
    async fn available_reports_refill() {
        let bucket = TokenBucket::new(2, 1.0);
        bucket.acquire().await;
        bucket.acquire().await;
        assert!(bucket.available() < 1.0);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(bucket.available() >= 1.0);
    }
}
