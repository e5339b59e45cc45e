//! Outbound rate limiting toward the embedding provider (spec C4, C1).

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Error, Result};

struct State {
    tokens: f64,
    last_refill: Instant,
}

/// A classic token bucket: refills continuously at `rate` tokens/sec up to
/// `burst`, consumed one token per outbound call.
pub struct TokenBucket {
    rate: f64,
    burst: f64,
    state: Mutex<State>,
}

impl TokenBucket {
    #[must_use]
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            burst: f64::from(burst),
            state: Mutex::new(State {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut State, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.last_refill = now;
    }

    /// Attempt to consume one token; returns the wait hint if denied.
    pub fn try_acquire(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }

        let deficit = 1.0 - state.tokens;
        let retry_after = Duration::from_secs_f64(deficit / self.rate.max(f64::EPSILON));
        Err(Error::Throttled {
            reason: "outbound rate limit exceeded".into(),
            retry_after,
        })
    }

    /// Block (cooperatively yielding) until a token is available or
    /// `deadline` elapses, whichever comes first (spec C4: callers must wait
    /// for a token rather than fail on first denial). On deadline, fails with
    /// [`Error::Throttled`].
    pub async fn acquire(&self, deadline: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let Error::Throttled { retry_after, .. } = &err else {
                        return Err(err);
                    };
                    let elapsed = started.elapsed();
                    if elapsed >= deadline {
                        return Err(err);
                    }
                    let remaining = deadline - elapsed;
                    tokio::time::sleep((*retry_after).min(remaining)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_capacity_is_immediately_available() {
        let bucket = TokenBucket::new(1.0, 3);
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_err());
    }

    #[test]
    fn denial_carries_a_retry_hint() {
        let bucket = TokenBucket::new(10.0, 1);
        bucket.try_acquire().unwrap();
        match bucket.try_acquire() {
            Err(Error::Throttled { retry_after, .. }) => assert!(retry_after > Duration::ZERO),
            other => panic!("expected Throttled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn acquire_waits_for_a_refilled_token() {
        let bucket = TokenBucket::new(1000.0, 1);
        bucket.try_acquire().unwrap();
        assert!(bucket.acquire(Duration::from_millis(50)).await.is_ok());
    }

    #[tokio::test]
    async fn acquire_fails_with_throttled_past_its_deadline() {
        let bucket = TokenBucket::new(0.001, 1);
        bucket.try_acquire().unwrap();
        match bucket.acquire(Duration::from_millis(20)).await {
            Err(Error::Throttled { .. }) => {}
            other => panic!("expected Throttled, got {other:?}"),
        }
    }
}
