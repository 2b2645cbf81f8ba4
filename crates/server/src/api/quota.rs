//! Quota and subscription tier endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use luckyticket_core::{QuotaStatus, QuotaTier};

use super::error::{validate_user_id, ApiError};
use crate::state::AppState;

/// Request body for changing the tier
#[derive(Debug, Deserialize)]
pub struct SetTierBody {
    pub tier: QuotaTier,
}

/// Today's usage, limit and whether a run may start
pub async fn get_quota(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<QuotaStatus>, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;
    Ok(Json(session.quota().await))
}

/// Change the user's subscription tier
pub async fn set_tier(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<SetTierBody>,
) -> Result<Json<QuotaStatus>, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;
    Ok(Json(session.set_tier(body.tier).await))
}
