//! Registration budget: caps how fast new accounts are pushed to the homeserver.
//!
//! Only `POST /register` draws from the budget. Lookups and health checks are
//! local reads and stay unlimited.

use crate::error::GatewayError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared registration budget, refilled at a steady per-minute rate.
#[derive(Clone)]
pub struct RegistrationBudget {
    limiter: Arc<Limiter>,
    clock: DefaultClock,
}

impl RegistrationBudget {
    /// Allow `per_minute` registrations, with up to `burst` back to back.
    ///
    /// Zero in either position is treated as one. Without a burst the whole
    /// minute's budget may be spent at once.
    pub fn new(per_minute: u32, burst: Option<u32>) -> Self {
        let rate = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        let mut quota = Quota::per_minute(rate);
        if let Some(burst) = burst {
            quota = quota.allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN));
        }

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            clock: DefaultClock::default(),
        }
    }

    /// Budget large enough that tests never hit it.
    pub fn unlimited() -> Self {
        Self::new(u32::MAX, None)
    }

    /// Take one registration from the budget, or report how many whole
    /// seconds until the next one is available.
    pub fn take(&self) -> Result<(), u64> {
        self.limiter.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
        })
    }
}

/// Reject registrations once the budget is spent.
pub async fn registration_budget(
    State(budget): State<RegistrationBudget>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if let Err(retry_after) = budget.take() {
        warn!(retry_after, "Registration budget exhausted");
        return Err(GatewayError::RateLimitExceeded(retry_after.max(1)));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_without_burst_spends_whole_minute() {
        let budget = RegistrationBudget::new(3, None);

        for _ in 0..3 {
            assert!(budget.take().is_ok());
        }
        assert!(budget.take().is_err());
    }

    #[test]
    fn test_burst_caps_back_to_back_registrations() {
        let budget = RegistrationBudget::new(60, Some(2));

        assert!(budget.take().is_ok());
        assert!(budget.take().is_ok());

        // 60/min refills one per second
        let retry_after = budget.take().unwrap_err();
        assert!(retry_after <= 1, "retry_after = {}", retry_after);
    }

    #[test]
    fn test_retry_after_reflects_refill_rate() {
        let budget = RegistrationBudget::new(1, None);

        assert!(budget.take().is_ok());
        let retry_after = budget.take().unwrap_err();
        assert!((59..=60).contains(&retry_after), "retry_after = {}", retry_after);
    }

    #[test]
    fn test_zero_budget_allows_one() {
        let budget = RegistrationBudget::new(0, Some(0));

        assert!(budget.take().is_ok());
        assert!(budget.take().is_err());
    }

    #[test]
    fn test_unlimited_budget() {
        let budget = RegistrationBudget::unlimited();
        for _ in 0..1000 {
            assert!(budget.take().is_ok());
        }
    }
}
