// src/notify/retry.rs
//! Bounded exponential backoff as a small state machine.
//!
//! `RetryState::on_failure` is the only transition. Attempt `n` (1-based) that
//! failed transiently waits `base * 2^(n-1)`, capped at `max`. A server-requested
//! wait can lengthen the delay up to that same cap.

use std::time::Duration;

use super::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            max: max.max(base),
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        self.base.saturating_mul(1u32 << shift).min(self.max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 1 }
    }

    /// 1-based number of the attempt about to be made.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn on_failure(&mut self, err: &TransportError) -> RetryStep {
        let TransportError::Transient { retry_after, .. } = err else {
            return RetryStep::GiveUp;
        };
        if self.attempt >= self.policy.max_attempts {
            return RetryStep::GiveUp;
        }
        let mut delay = self.policy.backoff(self.attempt);
        if let Some(hint) = retry_after {
            // Server hints may lengthen the wait, never past the policy cap.
            delay = delay.max((*hint).min(self.policy.max));
        }
        self.attempt += 1;
        RetryStep::Retry(delay)
    }
}
