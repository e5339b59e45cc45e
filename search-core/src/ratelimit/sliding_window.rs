//! Inbound per-caller rate limiting (spec C4).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::types::request::CallerFingerprint;

struct CallerWindow {
    /// Timestamps of requests within the current window, oldest first.
    hits: Vec<Instant>,
}

/// A sliding-window limiter keyed by caller fingerprint: at most
/// `limit` requests per `window` per caller.
pub struct SlidingWindowLimiter {
    limit: u32,
    window: Duration,
    callers: Mutex<HashMap<CallerFingerprint, CallerWindow>>,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            callers: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt for `caller` and decide whether it's admitted.
    pub fn check(&self, caller: &CallerFingerprint) -> Result<()> {
        let now = Instant::now();
        let mut callers = self.callers.lock();
        let entry = callers
            .entry(caller.clone())
            .or_insert_with(|| CallerWindow { hits: Vec::new() });

        entry.hits.retain(|t| now.saturating_duration_since(*t) < self.window);

        if entry.hits.len() as u32 >= self.limit {
            let oldest = entry.hits.first().copied().unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            return Err(Error::Throttled {
                reason: "inbound rate limit exceeded".into(),
                retry_after,
            });
        }

        entry.hits.push(now);
        Ok(())
    }

    /// Drop callers with no hits inside the window, to bound memory.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut callers = self.callers.lock();
        callers.retain(|_, w| {
            w.hits.retain(|t| now.saturating_duration_since(*t) < self.window);
            !w.hits.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: &str) -> CallerFingerprint {
        CallerFingerprint(id.to_string())
    }

    #[test]
    fn admits_up_to_limit_then_denies() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let c = caller("a");
        assert!(limiter.check(&c).is_ok());
        assert!(limiter.check(&c).is_ok());
        assert!(limiter.check(&c).is_err());
    }

    #[test]
    fn distinct_callers_have_independent_windows() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(&caller("a")).is_ok());
        assert!(limiter.check(&caller("b")).is_ok());
    }

    #[test]
    fn sweep_removes_stale_callers() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(1));
        limiter.check(&caller("a")).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        limiter.sweep();
        assert!(limiter.callers.lock().is_empty());
    }
}
