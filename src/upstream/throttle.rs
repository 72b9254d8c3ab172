//! Process-wide outbound token bucket.
//!
//! One throttle is shared by every caller of the upstream client — the
//! limit protects the provider, not individual users. Waiting is
//! cooperative: a caller parks on the limiter and wakes when a token
//! frees up or its deadline expires, in which case the call fails
//! before any network I/O.

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::{BifrostError, Result};

/// Token-bucket throttle over all outbound upstream calls.
pub struct Throttle {
    limiter: DefaultDirectRateLimiter,
}

impl Throttle {
    /// Create a throttle admitting `per_second` sustained calls with the
    /// given `burst` capacity. Both must be positive.
    pub fn new(per_second: u32, burst: u32) -> Result<Self> {
        let per_second = NonZeroU32::new(per_second).ok_or_else(|| {
            BifrostError::Configuration("outbound rate must be positive".to_string())
        })?;
        let burst = NonZeroU32::new(burst).ok_or_else(|| {
            BifrostError::Configuration("outbound burst must be positive".to_string())
        })?;

        Ok(Self {
            limiter: RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst)),
        })
    }

    /// Wait for a token, giving up at `deadline`.
    pub async fn acquire_until(&self, deadline: tokio::time::Instant) -> Result<()> {
        tokio::time::timeout_at(deadline, self.limiter.until_ready())
            .await
            .map_err(|_| BifrostError::ThrottleTimeout)
    }
}
