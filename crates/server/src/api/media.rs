//! Media selection endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use luckyticket_core::media::{LocalFilePicker, LocalSelection};
use luckyticket_core::{GenerationRequest, MediaKind, MediaOrigin, PipelineState};

use super::error::{validate_user_id, ApiError};
use crate::state::AppState;

/// Request body for selecting media
#[derive(Debug, Deserialize)]
pub struct SelectMediaBody {
    /// File under the configured upload directory, relative to it.
    pub path: PathBuf,
    #[serde(default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub origin: MediaOrigin,
    /// Still frame, required for videos.
    pub thumbnail: Option<PathBuf>,
    pub duration_secs: Option<f64>,
}

/// Response for a successful selection
#[derive(Debug, Serialize)]
pub struct SelectMediaResponse {
    pub state: PipelineState,
    pub media: GenerationRequest,
}

/// Pick and normalize media for the user's next ticket
pub async fn select_media(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<SelectMediaBody>,
) -> Result<Json<SelectMediaResponse>, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;

    let mut picker = LocalFilePicker::new(LocalSelection {
        path: body.path,
        kind: body.kind,
        thumbnail: body.thumbnail,
        duration_secs: body.duration_secs,
    })
    .within(&state.config().media.upload_dir);
    if !state.config().media.camera_enabled {
        picker = picker.without_camera();
    }

    let media = session.acquire_media_from(&picker, body.origin).await?;
    Ok(Json(SelectMediaResponse {
        state: session.state(),
        media,
    }))
}
