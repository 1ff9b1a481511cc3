use std::sync::Arc;

use middleware::client::ClientLimiter;

pub mod rate_limiter;

pub mod middleware {
    pub mod client;
}

pub use rate_limiter::{RateLimitDecision, RateLimiter};

/// Per-client limiter middleware over a limiter shared by all workers.
pub fn middleware(limiter: Arc<RateLimiter>) -> ClientLimiter {
    ClientLimiter::new(limiter)
}
