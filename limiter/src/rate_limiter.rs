//! Fixed-window request counter keyed by client address.
//!
//! Each key owns a window `{count, started}`. The first request after the
//! window has elapsed starts a new one at the current instant. Check and
//! increment run under the shard lock of the key's entry, so bursts from one
//! address cannot undercount. Once per window length, entries whose window has
//! elapsed are evicted.
//!
//! The counters live in process memory. Several server processes behind one
//! load balancer each enforce their own limit.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed window per client key, kept as a `{count, started}` map so the reset
/// and eviction policy stay explicit. Process-local: several instances need a
/// shared counting store instead.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        self.sweep_if_due(now);

        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.window {
            window.count = 0;
            window.started = now;
        }

        if window.count >= self.max_requests {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(window.started));
            return RateLimitDecision::Limited { retry_after };
        }

        window.count += 1;
        RateLimitDecision::Allowed {
            remaining: self.max_requests - window.count,
        }
    }

    /// Number of tracked clients.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    fn sweep_if_due(&self, now: Instant) {
        {
            let mut last = match self.last_sweep.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if now.saturating_duration_since(*last) < self.window {
                return;
            }
            *last = now;
        }

        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        let evicted = before.saturating_sub(self.windows.len());
        if evicted > 0 {
            log::debug!("Rate limiter evicted {} stale client windows", evicted);
        }
    }
}
