//! The start-of-run quota decision.

use chrono::NaiveDate;

use super::types::{QuotaPolicy, QuotaState};

/// Decides whether a new generation may start.
#[derive(Debug, Clone, Default)]
pub struct QuotaGate {
    policy: QuotaPolicy,
}

impl QuotaGate {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Pure function of the quota state and the current day.
    ///
    /// A state recorded on another day is treated as count 0.
    pub fn can_start(&self, quota: &QuotaState, today: NaiveDate) -> bool {
        if !self.policy.enabled {
            return true;
        }
        let current = quota.normalized(today);
        current.count < self.policy.limit(current.tier)
    }

    /// Limit that applies to the given state's tier.
    pub fn limit_for(&self, quota: &QuotaState) -> u32 {
        self.policy.limit(quota.tier)
    }
}
