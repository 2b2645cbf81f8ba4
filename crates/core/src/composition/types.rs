//! Types for the composition module.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::ImageRef;

/// Identifier of a submitted remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Observed status of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Snapshot of one remote job.
///
/// `result_ref` is present iff `status` is [`JobStatus::Succeeded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompositionJob {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            result_ref: None,
            error: None,
        }
    }

    pub fn succeeded(id: impl Into<String>, result_ref: ImageRef) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Succeeded,
            result_ref: Some(result_ref),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Failed,
            result_ref: None,
            error: Some(reason.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Polling policy for [`CompositionClient::await_result`](super::CompositionClient::await_result).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

impl PollOptions {
    /// Upper bound on time spent sleeping between polls.
    pub fn ceiling(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

/// Which path produced the composed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompositionPath {
    /// The remote service composed the image.
    Remote { job_id: String },
    /// The original source photo stands in for the composition.
    Fallback { reason: String },
}

impl CompositionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionPath::Remote { .. } => "remote",
            CompositionPath::Fallback { .. } => "fallback",
        }
    }
}

/// Output of the composition stage. `image` is always a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionResult {
    pub image: ImageRef,
    pub path: CompositionPath,
}

impl CompositionResult {
    pub fn remote(image: ImageRef, job_id: impl Into<String>) -> Self {
        Self {
            image,
            path: CompositionPath::Remote {
                job_id: job_id.into(),
            },
        }
    }

    pub fn fallback(source: ImageRef, reason: impl Into<String>) -> Self {
        Self {
            image: source,
            path: CompositionPath::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.path, CompositionPath::Fallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_terminal_states() {
        assert!(!CompositionJob::pending("a").is_terminal());
        assert!(CompositionJob::succeeded("a", ImageRef::Remote("u".into())).is_terminal());
        assert!(CompositionJob::failed("a", "no face").is_terminal());
    }

    #[test]
    fn test_poll_ceiling() {
        assert_eq!(PollOptions::default().ceiling(), Duration::from_secs(30));
    }

    #[test]
    fn test_path_serialization() {
        let path = CompositionPath::Fallback {
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"{"type":"fallback","reason":"timeout"}"#);
    }
}
