//! Minimum-spacing limiter for calls to one external provider.
//!
//! Single slot, no burst: two granted calls are always at least
//! `1 / rate` apart. Every caller sharing the provider's budget must go
//! through the same instance and acquire right before the request.
//!
//! # Example
//! ```ignore
//! let limiter = RateLimiter::new(2.0); // 500ms apart
//! limiter.acquire().await;             // immediate
//! limiter.acquire().await;             // ~500ms later
//! limiter.set_rate(10.0);              // later reservations 100ms apart
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug)]
struct LimiterState {
    min_delay: Duration,
    last_granted: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Limiter allowing `requests_per_second` calls per second.
    ///
    /// Rates that are not finite and positive fall back to one call per second.
    pub fn new(requests_per_second: f64) -> Self {
        let min_delay = min_delay_for(requests_per_second).unwrap_or_else(|| {
            warn!(requests_per_second, "invalid rate; using 1 request/second");
            Duration::from_secs(1)
        });
        Self {
            state: Mutex::new(LimiterState {
                min_delay,
                last_granted: None,
            }),
        }
    }

    /// Wait until the next slot is free. Never fails.
    ///
    /// The slot is reserved before sleeping, so concurrent callers queue up
    /// one `min_delay` apart in the order they arrived here.
    pub async fn acquire(&self) {
        let slot = {
            let mut state = self.state.lock();
            let now = Instant::now();
            let slot = match state.last_granted {
                Some(last) => (last + state.min_delay).max(now),
                None => now,
            };
            state.last_granted = Some(slot);
            slot
        };
        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Change the rate for calls that have not yet reserved a slot.
    pub fn set_rate(&self, requests_per_second: f64) {
        match min_delay_for(requests_per_second) {
            Some(min_delay) => self.state.lock().min_delay = min_delay,
            None => warn!(requests_per_second, "ignoring invalid rate"),
        }
    }

    /// Current rate in requests per second.
    pub fn rate(&self) -> f64 {
        1.0 / self.min_delay().as_secs_f64()
    }

    pub fn min_delay(&self) -> Duration {
        self.state.lock().min_delay
    }
}

fn min_delay_for(requests_per_second: f64) -> Option<Duration> {
    if !(requests_per_second.is_finite() && requests_per_second > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / requests_per_second)
        .ok()
        .filter(|d| !d.is_zero())
}
