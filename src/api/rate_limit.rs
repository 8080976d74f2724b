//! Fixed-window request budget shared by every clone of a client.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    started: Instant,
    calls: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    state: Arc<Mutex<Window>>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            state: Arc::new(Mutex::new(Window {
                started: Instant::now(),
                calls: 0,
            })),
        }
    }

    /// Take one call from the budget.
    pub fn acquire(&self) -> anyhow::Result<()> {
        self.acquire_at(Instant::now())
    }

    pub fn acquire_at(&self, now: Instant) -> anyhow::Result<()> {
        let mut w = self.state.lock();
        let elapsed = now.saturating_duration_since(w.started);
        if elapsed > self.window {
            w.calls = 0;
            w.started = now;
        }
        if w.calls >= self.max_calls {
            let remaining = self.window.saturating_sub(now.saturating_duration_since(w.started));
            let wait_secs = remaining.as_millis().div_ceil(1000);
            tracing::warn!(wait_secs, "api rate limit reached");
            anyhow::bail!("API rate limit reached, retry in {wait_secs}s");
        }
        w.calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exhausts() {
        let limiter = RateLimiter::new(3, Duration::from_secs(300));
        let now = Instant::now();
        for _ in 0..3 {
            limiter.acquire_at(now).unwrap();
        }
        let err = limiter.acquire_at(now).unwrap_err();
        assert!(err.to_string().contains("retry in"));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        limiter.acquire_at(start).unwrap();
        assert!(limiter.acquire_at(start + Duration::from_secs(5)).is_err());
        limiter.acquire_at(start + Duration::from_secs(11)).unwrap();
    }

    #[test]
    fn test_wait_rounds_up() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        limiter.acquire_at(start).unwrap();
        let err = limiter
            .acquire_at(start + Duration::from_millis(2500))
            .unwrap_err();
        assert!(err.to_string().contains("retry in 8s"));
    }

    #[test]
    fn test_clones_share_budget() {
        let a = RateLimiter::new(2, Duration::from_secs(60));
        let b = a.clone();
        let now = Instant::now();
        a.acquire_at(now).unwrap();
        b.acquire_at(now).unwrap();
        assert!(a.acquire_at(now).is_err());
    }
}
