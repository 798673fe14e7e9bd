//! Failed-login throttling keyed by lowercased username.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::config::LoginThrottleConfig;
use crate::db::{LoginAttempt, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { attempts_left: u32 },
    Locked { locked_until: DateTime<Utc> },
}

/// What `check` must persist besides returning a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    None,
    Reset,
    Lock(DateTime<Utc>),
}

fn evaluate(
    record: Option<&LoginAttempt>,
    policy: &LoginThrottleConfig,
    now: DateTime<Utc>,
) -> (RateDecision, Transition) {
    let fresh = RateDecision::Allowed {
        attempts_left: policy.max_attempts,
    };

    let Some(record) = record else {
        return (fresh, Transition::None);
    };

    if let Some(locked_until) = record.locked_until {
        if locked_until > now {
            return (RateDecision::Locked { locked_until }, Transition::None);
        }
        // An elapsed lockout starts a clean window.
        return (fresh, Transition::Reset);
    }

    if now - record.last_attempt > Duration::minutes(policy.reset_after_minutes) {
        return (fresh, Transition::Reset);
    }

    let used = u32::try_from(record.attempts.max(0)).unwrap_or(u32::MAX);
    let attempts_left = policy.max_attempts.saturating_sub(used);
    if attempts_left > 0 {
        return (RateDecision::Allowed { attempts_left }, Transition::None);
    }

    let locked_until = now + Duration::minutes(policy.lockout_minutes);
    (
        RateDecision::Locked { locked_until },
        Transition::Lock(locked_until),
    )
}

#[derive(Clone)]
pub struct LoginRateLimiter {
    store: Store,
    policy: LoginThrottleConfig,
}

impl LoginRateLimiter {
    #[must_use]
    pub const fn new(store: Store, policy: LoginThrottleConfig) -> Self {
        Self { store, policy }
    }

    pub async fn check(&self, identifier: &str) -> Result<RateDecision> {
        let now = Utc::now();
        let record = self.store.get_login_attempt(identifier).await?;
        let (decision, transition) = evaluate(record.as_ref(), &self.policy, now);

        match transition {
            Transition::None => {}
            Transition::Reset => self.store.reset_login_attempts(identifier).await?,
            Transition::Lock(until) => {
                warn!(identifier, locked_until = %until, "Login locked after repeated failures");
                self.store.lock_login(identifier, until, now).await?;
            }
        }

        Ok(decision)
    }

    /// Counts a failure and locks the identifier once the budget is spent.
    pub async fn record_failure(&self, identifier: &str) -> Result<()> {
        let now = Utc::now();
        let attempts = self.store.record_login_failure(identifier, now).await?;
        info!(identifier, attempts, "Failed login recorded");

        if u32::try_from(attempts).unwrap_or(0) >= self.policy.max_attempts {
            let until = now + Duration::minutes(self.policy.lockout_minutes);
            warn!(identifier, locked_until = %until, "Login locked after repeated failures");
            self.store.lock_login(identifier, until, now).await?;
        }
        Ok(())
    }

    pub async fn reset(&self, identifier: &str) -> Result<()> {
        self.store.reset_login_attempts(identifier).await
    }
}
