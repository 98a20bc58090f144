//! Per-identity admission control for the earn path.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::backend::config::RateLimitConfig;
use crate::backend::domain::models::{PointsError, PointsResult};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// `requests` per `window_secs` for each uid, with the whole window
/// available as a burst
#[derive(Clone)]
pub struct AwardRateLimiter {
    limiter: Arc<KeyedLimiter>,
    clock: DefaultClock,
}

impl AwardRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        let burst = NonZeroU32::new(config.requests)
            .ok_or_else(|| anyhow!("rate_limit.requests must be positive"))?;
        let period = Duration::from_secs(config.window_secs) / config.requests;
        let quota = Quota::with_period(period)
            .ok_or_else(|| anyhow!("rate_limit.window_secs must be positive"))?
            .allow_burst(burst);
        let clock = DefaultClock::default();
        Ok(Self {
            limiter: Arc::new(RateLimiter::new(quota, DefaultKeyedStateStore::default(), &clock)),
            clock,
        })
    }

    pub fn check(&self, uid: &str) -> PointsResult<()> {
        self.limiter
            .check_key(&uid.to_string())
            .map_err(|not_until| PointsError::RateLimited {
                retry_after: not_until.wait_time_from(self.clock.now()),
            })
    }

    /// Drop state for identities whose quota has fully replenished
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}
