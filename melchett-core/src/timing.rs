//! Request timing.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Timing of the transport leg of a call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingRecord {
    /// When the timer stage started.
    pub start: DateTime<Utc>,
    /// When the timer stage finished, unset while the call is in flight.
    pub end: Option<DateTime<Utc>>,
    /// Elapsed time, from the upstream timing header or the wall clock.
    pub elapsed: Option<Duration>,
}

impl TimingRecord {
    /// Starts timing now.
    pub fn start() -> Self {
        Self {
            start: Utc::now(),
            end: None,
            elapsed: None,
        }
    }

    /// Closes the record with the given elapsed time.
    pub fn finish(&mut self, elapsed: Duration) {
        self.end = Some(Utc::now());
        self.elapsed = Some(elapsed);
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_millis(&self) -> Option<f64> {
        self.elapsed.map(|elapsed| elapsed.as_secs_f64() * 1000.0)
    }
}
