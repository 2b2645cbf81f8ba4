use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, media, middleware::metrics_middleware, pipeline, quota, tickets};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Media
        .route("/users/{user_id}/media", post(media::select_media))
        // Pipeline session
        .route("/users/{user_id}/pipeline", get(pipeline::get_status))
        .route("/users/{user_id}/pipeline/clear", post(pipeline::clear))
        // Tickets
        .route("/users/{user_id}/tickets", get(tickets::list_tickets))
        .route(
            "/users/{user_id}/tickets/generate",
            post(tickets::generate_ticket),
        )
        .route(
            "/users/{user_id}/tickets/{id}",
            get(tickets::get_ticket).delete(tickets::delete_ticket),
        )
        .route(
            "/users/{user_id}/tickets/{id}/image",
            get(tickets::get_ticket_image),
        )
        // Quota
        .route("/users/{user_id}/quota", get(quota::get_quota))
        .route("/users/{user_id}/tier", put(quota::set_tier))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
