//! Types for the pipeline module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::CaptureError;
use crate::composition::CompositionPath;
use crate::media::{GenerationRequest, MediaError, MediaOrigin};
use crate::quota::QuotaState;
use crate::store::StoreError;

/// Where a session is in the generation flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    MediaSelected,
    Gating,
    Composing,
    Composed,
    Capturing,
    Done,
    Failed { reason: String },
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::MediaSelected => "media_selected",
            PipelineState::Gating => "gating",
            PipelineState::Composing => "composing",
            PipelineState::Composed => "composed",
            PipelineState::Capturing => "capturing",
            PipelineState::Done => "done",
            PipelineState::Failed { .. } => "failed",
        }
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            PipelineState::Gating
                | PipelineState::Composing
                | PipelineState::Composed
                | PipelineState::Capturing
        )
    }
}

/// Errors surfaced by the pipeline.
///
/// Composition problems never appear here: they are absorbed into the
/// fallback path. Store write failures are logged, not surfaced.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Daily limit reached for the user's tier.
    #[error("daily quota exceeded: {count} of {limit} used")]
    QuotaExceeded { count: u32, limit: u32 },

    /// Access to the gallery or camera was refused.
    #[error("permission denied for {origin}")]
    PermissionDenied { origin: MediaOrigin },

    /// A run is already in flight for this session.
    #[error("a ticket is already being generated")]
    AlreadyInProgress,

    /// `generate_ticket` was called without selected media.
    #[error("no media selected")]
    NoMediaSelected,

    /// The selected media could not be used.
    #[error("media rejected: {0}")]
    Media(MediaError),

    /// Rasterizing the ticket failed; nothing was committed.
    #[error("capture failed: {0}")]
    CaptureFailed(#[from] CaptureError),

    /// The run was cleared before it committed.
    #[error("pipeline run cancelled")]
    Cancelled,

    /// No ticket with this id.
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    /// The profile store could not be read.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<MediaError> for PipelineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::PermissionDenied { origin } => PipelineError::PermissionDenied { origin },
            other => PipelineError::Media(other),
        }
    }
}

impl PipelineError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::AlreadyInProgress => "already_in_progress",
            Self::NoMediaSelected => "no_media_selected",
            Self::Media(_) => "media_rejected",
            Self::CaptureFailed(_) => "capture_failed",
            Self::Cancelled => "cancelled",
            Self::TicketNotFound(_) => "ticket_not_found",
            Self::Store(_) => "store",
        }
    }

    /// Errors the user can act on (wait, upgrade, grant access, pick again).
    pub fn is_user_recoverable(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } | Self::PermissionDenied { .. } | Self::NoMediaSelected => {
                true
            }
            Self::Media(e) => e.is_user_recoverable(),
            _ => false,
        }
    }
}

/// Quota as seen by the user today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    #[serde(flatten)]
    pub state: QuotaState,
    pub enforced: bool,
    pub limit: u32,
    /// Generations left today; `None` when the limit is not enforced.
    pub remaining: Option<u32>,
    pub can_start: bool,
}

/// Snapshot of a pipeline session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub user_id: String,
    pub state: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<GenerationRequest>,
    pub quota: QuotaStatus,
    pub ticket_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_composition: Option<CompositionPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ticket_id: Option<String>,
}
