//! Circuit breaker state machine.
//!
//! Closed → (threshold consecutive failures) → Open → (recovery timeout)
//! → HalfOpen, which admits exactly one trial call: success closes the
//! circuit, failure reopens it and restarts the timer. While Open, calls are
//! rejected locally with `CircuitOpen` and nothing reaches the backing
//! store; this is what keeps retry storms from amplifying an outage.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use strata_core::AdapterError;

/// Observable breaker state, for health snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation; calls flow through.
    Closed,
    /// Failing; calls are rejected locally.
    Open,
    /// Recovery trial in flight.
    HalfOpen,
}

enum State {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen,
}

/// Per-adapter circuit breaker. Never shared across tiers.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: Mutex<State>,
}

impl CircuitBreaker {
    /// Create a closed breaker with the given thresholds.
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            state: Mutex::new(State::Closed { failures: 0 }),
        }
    }

    /// Ask permission for one attempt.
    ///
    /// Moves Open → HalfOpen once the recovery timeout has elapsed, granting
    /// the single trial; concurrent callers during the trial are rejected.
    pub fn try_acquire(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            State::Closed { .. } => Ok(()),
            State::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.recovery_timeout {
                    *state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(AdapterError::CircuitOpen {
                        retry_after: self.recovery_timeout - elapsed,
                    })
                }
            }
            State::HalfOpen => Err(AdapterError::CircuitOpen {
                retry_after: self.recovery_timeout,
            }),
        }
    }

    /// Record a successful attempt: resets the failure count, and closes
    /// the circuit if this was the HalfOpen trial.
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = State::Closed { failures: 0 };
    }

    /// Record a failed attempt: increments the consecutive-failure count in
    /// Closed, reopens from HalfOpen, and restarts the Open timer.
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *state {
            State::Closed { failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    *state = State::Open {
                        since: Instant::now(),
                    };
                }
            }
            State::HalfOpen => {
                *state = State::Open {
                    since: Instant::now(),
                };
            }
            State::Open { .. } => {}
        }
    }

    /// Current observable state.
    pub fn state(&self) -> BreakerState {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            State::Closed { .. } => BreakerState::Closed,
            State::Open { .. } => BreakerState::Open,
            State::HalfOpen => BreakerState::HalfOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(matches!(
            breaker.try_acquire(),
            Err(AdapterError::CircuitOpen { .. })
        ));
    }

    #[test]
    fn success_resets_the_consecutive_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_admits_exactly_one_trial() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(40));
        assert!(breaker.try_acquire().is_ok());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        // Concurrent caller during the trial is rejected.
        assert!(matches!(
            breaker.try_acquire(),
            Err(AdapterError::CircuitOpen { .. })
        ));
    }

    #[test]
    fn trial_success_closes_trial_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        assert!(breaker.try_acquire().is_ok());
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        // Timer restarted: still rejecting right away.
        assert!(matches!(
            breaker.try_acquire(),
            Err(AdapterError::CircuitOpen { .. })
        ));

        std::thread::sleep(Duration::from_millis(40));
        assert!(breaker.try_acquire().is_ok());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
