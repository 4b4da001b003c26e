use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Circuit breaker state (spec.md §4.9). Generalizes
/// `agentkern_arbiter`'s own antifragile circuit breaker pattern down to
/// the two deltas spec.md requires: a single success in half-open closes
/// the circuit (vs. a configurable `success_threshold`), and the failure
/// threshold / open-state timeout come from `Config` rather than being
/// hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    /// Set the moment a caller is admitted as the half-open trial call,
    /// cleared when that trial resolves (`record_success`/`record_failure`).
    /// Without this, every concurrent caller observing `HalfOpen` would be
    /// admitted, not just the one trial call.
    half_open_trial_in_flight: bool,
}

/// Per-orchestrator failure counter and open/half-open/closed state
/// machine. `allow` is the single gate every triage call passes through
/// before any agent runs; `record_success`/`record_failure` are the only
/// mutators, both called at most once per triage run.
pub struct CircuitBreaker {
    failure_threshold: u32,
    open_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            open_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                half_open_trial_in_flight: false,
            }),
        }
    }

    /// Returns whether a new triage call may proceed. `Closed` always
    /// allows; `Open` allows only once `open_timeout` has elapsed since the
    /// breaker tripped, at which point it transitions to `HalfOpen` and
    /// admits exactly this one trial call (spec.md §4.9, "half-opens: the
    /// next triage attempts to run"). While `HalfOpen`, only the first
    /// caller to observe it gets `true`; every concurrent caller after that
    /// gets `false` until the trial resolves via `record_success` or
    /// `record_failure`.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if inner.half_open_trial_in_flight {
                    false
                } else {
                    inner.half_open_trial_in_flight = true;
                    true
                }
            }
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.open_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_trial_in_flight = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// A successful triage run: resets `failure_count` to 0 and closes the
    /// circuit unconditionally (single-success-threshold in half-open).
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
        inner.half_open_trial_in_flight = false;
    }

    /// A failed triage run: increments `failure_count`. Opens the circuit
    /// when the count reaches `failure_threshold` from `Closed`, or
    /// immediately re-opens from `HalfOpen` (the trial call failed).
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_trial_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            assert!(breaker.allow());
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow());
    }

    #[test]
    fn half_opens_after_timeout_and_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow());
        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.allow());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_admits_only_one_concurrent_trial_call() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(20));

        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        // Further concurrent callers are turned away until the trial resolves.
        assert!(!breaker.allow());
        assert!(!breaker.allow());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow());
    }
}
