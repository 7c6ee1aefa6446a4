//! Circuit breaker state machine.
//!
//! # States
//! - Closed: calls pass through, outcomes are counted in a rolling window
//! - Open: calls are rejected without reaching the transport
//! - Half-Open: one trial call is let through to probe the upstream
//!
//! # State Transitions
//! ```text
//! Closed → Open: error percentage in the window exceeds the threshold
//! Open → Half-Open: reset timeout elapsed, next caller becomes the trial
//! Half-Open → Closed: trial succeeds (window is cleared)
//! Half-Open → Open: trial fails (reset timeout starts again)
//! ```
//!
//! Every transition happens under one mutex which is never held across an
//! await point. Time is read from [`tokio::time::Instant`] so paused test
//! clocks drive the reset timeout.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Breaker tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Error percentage (0–100) the window must exceed to open the circuit.
    pub error_threshold_percentage: f64,
    /// Time the circuit stays open before a trial call is allowed.
    pub reset_timeout: Duration,
    /// Length of the rolling statistics window.
    pub rolling_window: Duration,
    /// Number of buckets the window is split into.
    pub rolling_buckets: u32,
    /// Minimum number of calls in the window before the circuit may open.
    pub volume_threshold: u32,
}

impl CircuitBreakerConfig {
    /// Config with the given threshold and reset timeout, defaults elsewhere.
    pub fn new(error_threshold_percentage: f64, reset_timeout: Duration) -> Self {
        Self {
            error_threshold_percentage,
            reset_timeout,
            ..Self::default()
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold_percentage: 10.0,
            reset_timeout: Duration::from_secs(30),
            rolling_window: Duration::from_secs(10),
            rolling_buckets: 10,
            volume_threshold: 0,
        }
    }
}

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected.
    Open,
    /// A trial call is probing the upstream.
    HalfOpen,
}

impl CircuitState {
    /// Returns the state as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Returned by [`CircuitBreaker::try_acquire`] when the call must not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit breaker is open")]
pub struct CircuitOpen;

/// Success and failure counts currently in the rolling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    /// Successful calls.
    pub successes: u32,
    /// Failed calls.
    pub failures: u32,
}

impl WindowCounts {
    /// Total calls.
    pub fn total(&self) -> u32 {
        self.successes + self.failures
    }

    /// Failure percentage, `0.0` for an empty window.
    pub fn error_percentage(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => f64::from(self.failures) * 100.0 / f64::from(total),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    counts: WindowCounts,
}

#[derive(Debug)]
struct RollingWindow {
    buckets: VecDeque<Bucket>,
    span: Duration,
    capacity: usize,
}

impl RollingWindow {
    fn new(window: Duration, buckets: u32) -> Self {
        let capacity = buckets.max(1);
        Self {
            buckets: VecDeque::with_capacity(capacity as usize),
            span: window / capacity,
            capacity: capacity as usize,
        }
    }

    fn horizon(&self) -> Duration {
        self.span * self.capacity as u32
    }

    fn evict(&mut self, now: Instant) {
        let horizon = self.horizon();
        while self
            .buckets
            .front()
            .is_some_and(|bucket| now.duration_since(bucket.started) >= horizon)
        {
            self.buckets.pop_front();
        }
    }

    fn record(&mut self, now: Instant, failed: bool) {
        self.evict(now);
        let rotate = self
            .buckets
            .back()
            .is_none_or(|bucket| now.duration_since(bucket.started) >= self.span);
        if rotate {
            self.buckets.push_back(Bucket {
                started: now,
                counts: WindowCounts::default(),
            });
            if self.buckets.len() > self.capacity {
                self.buckets.pop_front();
            }
        }
        if let Some(bucket) = self.buckets.back_mut() {
            if failed {
                bucket.counts.failures += 1;
            } else {
                bucket.counts.successes += 1;
            }
        }
    }

    fn counts(&mut self, now: Instant) -> WindowCounts {
        self.evict(now);
        self.buckets
            .iter()
            .fold(WindowCounts::default(), |acc, bucket| WindowCounts {
                successes: acc.successes + bucket.counts.successes,
                failures: acc.failures + bucket.counts.failures,
            })
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    window: RollingWindow,
}

impl Inner {
    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.window.clear();
    }
}

/// Failure-rate circuit breaker shared by all calls of one client.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let window = RollingWindow::new(config.rolling_window, config.rolling_buckets);
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                opened_at: None,
                trial_in_flight: false,
                window,
            }),
        }
    }

    /// Breaker tuning.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state.
    ///
    /// An open circuit whose reset timeout elapsed still reports
    /// [`CircuitState::Open`] until a caller claims the trial.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Outcome counts in the rolling window.
    pub fn counts(&self) -> WindowCounts {
        self.lock().window.counts(Instant::now())
    }

    /// Asks permission to make a call.
    ///
    /// The returned permit must be settled with [`BreakerPermit::record`];
    /// dropping it unsettled frees a trial slot without an outcome.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, CircuitOpen> {
        let now = Instant::now();
        let mut inner = self.lock();
        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .is_none_or(|opened| now.duration_since(opened) >= self.config.reset_timeout);
                if !elapsed {
                    return Err(CircuitOpen);
                }
                inner.state = CircuitState::HalfOpen;
                inner.trial_in_flight = true;
                true
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(CircuitOpen);
                }
                inner.trial_in_flight = true;
                true
            }
        };
        Ok(BreakerPermit {
            breaker: self,
            trial,
            settled: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, trial: bool, failed: bool) -> Option<CircuitState> {
        let now = Instant::now();
        let mut inner = self.lock();

        if trial {
            inner.trial_in_flight = false;
            if failed {
                inner.open(now);
                return Some(CircuitState::Open);
            }
            inner.close();
            return Some(CircuitState::Closed);
        }

        inner.window.record(now, failed);
        if failed && inner.state == CircuitState::Closed {
            let counts = inner.window.counts(now);
            if counts.total() >= self.config.volume_threshold
                && counts.error_percentage() > self.config.error_threshold_percentage
            {
                inner.open(now);
                return Some(CircuitState::Open);
            }
        }
        None
    }

    fn abandon(&self, trial: bool) {
        if trial {
            self.lock().trial_in_flight = false;
        }
    }
}

/// Permission to make one call through a [`CircuitBreaker`].
#[derive(Debug)]
#[must_use = "a permit must be settled with `record`"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl BreakerPermit<'_> {
    /// Whether this call is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Settles the call, returning the new state if the circuit transitioned.
    pub fn record(mut self, failed: bool) -> Option<CircuitState> {
        self.settled = true;
        self.breaker.settle(self.trial, failed)
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.abandon(self.trial);
        }
    }
}
