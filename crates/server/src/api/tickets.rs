//! Ticket API handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use luckyticket_core::{ImageRef, MediaKind, TicketRecord, TicketTemplate};

use super::error::{validate_user_id, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for ticket operations
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub lucky_number: String,
    pub message: String,
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TicketTemplate>,
    pub created_at: String,
    /// Where the rendered ticket can be downloaded.
    pub image_url: String,
}

impl TicketResponse {
    fn new(user_id: &str, ticket: TicketRecord) -> Self {
        Self {
            image_url: format!("/api/v1/users/{}/tickets/{}/image", user_id, ticket.id),
            id: ticket.id,
            lucky_number: ticket.lucky_number.to_string(),
            message: ticket.message,
            kind: ticket.kind,
            template: ticket.template,
            created_at: ticket.created_at.to_rfc3339(),
        }
    }
}

/// Response for listing tickets
#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Run the pipeline on the selected media
pub async fn generate_ticket(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;

    let ticket = session.generate_ticket().await?;
    Ok((StatusCode::CREATED, Json(TicketResponse::new(&user_id, ticket))))
}

/// List the user's tickets, most recent first
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;

    let tickets: Vec<_> = session
        .tickets()
        .await
        .into_iter()
        .map(|t| TicketResponse::new(&user_id, t))
        .collect();
    Ok(Json(ListTicketsResponse {
        total: tickets.len(),
        tickets,
    }))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<Json<TicketResponse>, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;

    match session.ticket(&id).await {
        Some(ticket) => Ok(Json(TicketResponse::new(&user_id, ticket))),
        None => Err(ApiError::not_found(format!("Ticket not found: {}", id))),
    }
}

/// Delete a ticket and its image
pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;

    session.remove_ticket(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The rendered ticket as PNG, for share and export
pub async fn get_ticket_image(
    State(state): State<Arc<AppState>>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    validate_user_id(&user_id)?;
    let session = state.sessions().session(&user_id).await?;

    let ticket = session
        .ticket(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Ticket not found: {}", id)))?;

    let path = match &ticket.image_ref {
        ImageRef::Local(path) => path.clone(),
        ImageRef::Remote(url) => {
            return Err(ApiError::not_found(format!(
                "Ticket image is not stored locally: {}",
                url
            )))
        }
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(user_id = %user_id, ticket_id = %id, path = %path.display(), "Ticket image missing");
            return Err(ApiError::not_found(format!("Ticket image missing: {}", id)));
        }
        Err(e) => return Err(ApiError::internal(e.to_string())),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"ticket-{}.png\"", ticket.lucky_number),
            ),
        ],
        bytes,
    ))
}
