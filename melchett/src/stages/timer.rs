//! Request deadline and timing capture.

use std::time::Duration;

use async_trait::async_trait;
use http::HeaderName;
use melchett_core::{Context, ErrorRecord, Next, ResponseRecord, Stage, StageResult, TimingRecord};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Times the inner chain and enforces the per-call deadline.
///
/// When the deadline passes the request's cancellation token fires; the
/// transport then fails with an abort error, which this stage reports as
/// `ETIMEDOUT`.
#[derive(Debug, Clone)]
pub struct TimerStage {
    timeout: Duration,
    timing_header: Option<HeaderName>,
}

impl TimerStage {
    /// Creates a timer with the given deadline and optional upstream timing
    /// header.
    pub fn new(timeout: Duration, timing_header: Option<HeaderName>) -> Self {
        Self {
            timeout,
            timing_header,
        }
    }

    /// Upstream-reported duration, from a header holding milliseconds.
    fn header_elapsed(&self, response: Option<&ResponseRecord>) -> Option<Duration> {
        let name = self.timing_header.as_ref()?;
        let value = response?.header(name.as_str())?;
        let ms = parse_leading_number(value)?;
        (ms.is_finite() && ms >= 0.0).then(|| Duration::from_secs_f64(ms / 1000.0))
    }
}

/// Parses the numeric prefix of `value`, so `"12.5ms"` reads as `12.5`.
fn parse_leading_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().ok()
}

/// Cancels a token once a deadline passes, unless dropped first.
struct Watchdog(JoinHandle<()>);

impl Watchdog {
    fn arm(token: CancellationToken, timeout: Duration) -> Self {
        Self(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            token.cancel();
        }))
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl Stage for TimerStage {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> StageResult {
        let mut timing = TimingRecord::start();
        let started = Instant::now();

        let watchdog = Watchdog::arm(ctx.request().cancellation().clone(), self.timeout);
        let result = next.run(ctx).await;
        drop(watchdog);

        let elapsed = self
            .header_elapsed(ctx.response.as_ref())
            .unwrap_or_else(|| started.elapsed());
        timing.finish(elapsed);
        ctx.timing = Some(timing);

        result?;

        if ctx
            .error
            .as_ref()
            .is_some_and(ErrorRecord::is_transport_timeout)
        {
            debug!(
                client = %ctx.client().name,
                url = ctx.request().url(),
                timeout_ms = self.timeout.as_millis() as u64,
                "deadline exceeded"
            );
            return ctx.reject(ErrorRecord::timed_out(self.timeout));
        }
        Ok(())
    }
}
