//! HTTP routes

mod chat;
mod search;

use crate::state::AppState;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use ladle_core::LadleError;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the axum router with all routes
pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health))
        .route("/chat/message", post(chat::post_message))
        .route("/chat/history", get(chat::get_history).delete(chat::delete_history))
        .route("/search", post(search::post_search))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Map core errors to HTTP responses.
///
/// Only edge validation surfaces as 4xx; anything else that escapes the
/// router's recovery boundary is a 500.
pub fn map_error(err: LadleError) -> (StatusCode, Json<ErrorBody>) {
    let status = match err {
        LadleError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LadleError::ConversationNotFound(_) | LadleError::RecipeNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        _ => {
            tracing::error!("internal error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
