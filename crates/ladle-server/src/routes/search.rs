//! Recipe search endpoint (internal, used by the retrieval engine's callers)

use super::{map_error, ErrorBody};
use crate::auth::AuthUser;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ladle_core::{search_recipes, LadleError, SearchOptions, SearchResult, SearchType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    query: String,
    user_id: Option<String>,
    limit: Option<usize>,
    #[serde(default = "default_search_type")]
    search_type: SearchType,
}

fn default_search_type() -> SearchType {
    SearchType::Hybrid
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    results: Vec<SearchResult>,
    total: usize,
    search_type: SearchType,
    query: String,
}

pub async fn post_search(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorBody>)> {
    if body.query.trim().is_empty() {
        return Err(map_error(LadleError::InvalidInput(
            "query must not be empty".to_string(),
        )));
    }

    // Results are strictly scoped to the authenticated identity; a body
    // userId is accepted only when it matches it.
    if let Some(ref user_id) = body.user_id {
        if user_id != &user.id {
            return Err(map_error(LadleError::InvalidInput(
                "userId does not match the authenticated user".to_string(),
            )));
        }
    }

    let options = SearchOptions {
        limit: body.limit.unwrap_or(SearchOptions::default().limit),
        ..SearchOptions::default()
    };

    let results = search_recipes(
        &state.db,
        &body.query,
        &user.id,
        state.embedder.as_ref(),
        body.search_type,
        &options,
    )
    .await
    .map_err(map_error)?;

    Ok(Json(SearchResponse {
        total: results.len(),
        search_type: body.search_type,
        query: body.query,
        results,
    }))
}
