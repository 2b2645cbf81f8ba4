//! Pipeline timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::composition::PollOptions;

/// Timing policy of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Delay between composition status polls (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Status polls before a composition job is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between presenting a ticket view and capturing it
    /// (milliseconds). When the presenter offers a painted signal this
    /// becomes the unit of the upper bound instead.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    30
}

fn default_settle_delay() -> u64 {
    1500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

impl PipelineConfig {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_attempts,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Longest wait for a painted signal.
    pub fn paint_timeout(&self) -> Duration {
        self.settle_delay() * 4
    }
}
