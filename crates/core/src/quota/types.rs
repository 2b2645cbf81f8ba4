//! Quota state and policy types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Subscription level controlling the daily generation limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaTier {
    #[default]
    Free,
    Premium,
}

impl QuotaTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaTier::Free => "free",
            QuotaTier::Premium => "premium",
        }
    }
}

/// Per-user, per-day generation counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Calendar day (local time zone) the counter belongs to.
    pub date: NaiveDate,
    /// Successful generations on `date`.
    pub count: u32,
    pub tier: QuotaTier,
}

impl QuotaState {
    /// A zeroed counter for `today`.
    pub fn fresh(today: NaiveDate, tier: QuotaTier) -> Self {
        Self {
            date: today,
            count: 0,
            tier,
        }
    }

    /// Returns the state as seen on `today`: a stale day resets to zero.
    pub fn normalized(&self, today: NaiveDate) -> Self {
        if self.date == today {
            self.clone()
        } else {
            Self::fresh(today, self.tier)
        }
    }

    /// Returns the state after one more successful generation on `today`.
    pub fn incremented(&self, today: NaiveDate) -> Self {
        let mut next = self.normalized(today);
        next.count = next.count.saturating_add(1);
        next
    }
}

/// Configurable daily limits.
///
/// Disabled by default: generations are unlimited until an integrator
/// turns enforcement on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_free_limit")]
    pub free_limit: u32,
    #[serde(default = "default_premium_limit")]
    pub premium_limit: u32,
}

fn default_free_limit() -> u32 {
    1
}

fn default_premium_limit() -> u32 {
    3
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            free_limit: default_free_limit(),
            premium_limit: default_premium_limit(),
        }
    }
}

impl QuotaPolicy {
    /// Enforcing policy with the standard limits.
    pub fn enforced() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Daily limit for a tier.
    pub fn limit(&self, tier: QuotaTier) -> u32 {
        match tier {
            QuotaTier::Free => self.free_limit,
            QuotaTier::Premium => self.premium_limit,
        }
    }
}
