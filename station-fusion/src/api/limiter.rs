//! Sliding-window request limiter.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default window length: 60 seconds.
const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Allows at most `max_calls` request starts within any `period`.
///
/// Start instants are kept in a sliding window, so there are no bursts at
/// window boundaries. Waiters are served in FIFO order because the inner
/// tokio mutex is fair.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limit to `max_calls` per minute.
    pub fn per_minute(max_calls: usize) -> Self {
        Self::new(max_calls, DEFAULT_PERIOD)
    }

    /// Limit to `max_calls` per `period`. A ceiling of zero is treated as one.
    pub fn new(max_calls: usize, period: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            max_calls,
            period,
            starts: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Wait until a request may start, then record its start.
    pub async fn acquire(&self) {
        let mut starts = self.starts.lock().await;
        loop {
            let now = Instant::now();
            while starts
                .front()
                .is_some_and(|&start| now.duration_since(start) >= self.period)
            {
                starts.pop_front();
            }

            if starts.len() < self.max_calls {
                starts.push_back(now);
                return;
            }

            if let Some(&oldest) = starts.front() {
                let ready_at = oldest + self.period;
                debug!(
                    wait_ms = ready_at.duration_since(now).as_millis() as u64,
                    "rate limit reached, waiting"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }
}
