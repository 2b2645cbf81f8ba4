//! Pipeline session endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use luckyticket_core::PipelineStatus;

use super::error::{validate_user_id, ApiError};
use crate::state::AppState;

/// Current session state, selected media and quota
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PipelineStatus>, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;
    Ok(Json(session.status().await))
}

/// Cancel any run in flight and return to idle
pub async fn clear(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PipelineStatus>, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;
    session.clear();
    Ok(Json(session.status().await))
}
