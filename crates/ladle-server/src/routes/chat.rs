//! Chat endpoints: message routing and history

use super::{map_error, ErrorBody};
use crate::auth::AuthUser;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use ladle_core::llm::normalize_image_url;
use ladle_core::{
    ConversationSummary, IncomingMessage, Intent, IntentMetadata, LadleError, MessageRecord,
    Recipe,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_HISTORY_LIMIT: usize = 50;

// -- POST /chat/message --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    images: Vec<String>,
    session_id: Option<String>,
    intent: Option<String>,
    context: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    response: MessageView,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipe: Option<Recipe>,
    conversation_id: String,
    session_id: String,
    intent_metadata: IntentMetadata,
}

#[derive(Serialize)]
pub struct MessageView {
    id: String,
    content: String,
    sender: String,
    timestamp: String,
}

impl From<MessageRecord> for MessageView {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            sender: record.role,
            timestamp: record.created_at,
        }
    }
}

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<ChatMessageRequest>,
) -> Result<Json<ChatMessageResponse>, (StatusCode, Json<ErrorBody>)> {
    let manual_intent = match body.intent.as_deref() {
        None => None,
        Some(raw) => match Intent::parse(raw) {
            Some(intent) => Some(intent),
            None => {
                return Err(map_error(LadleError::InvalidInput(format!(
                    "unknown intent: {}",
                    raw
                ))))
            }
        },
    };

    let incoming = IncomingMessage {
        message: body.message,
        images: body.images.iter().map(|i| normalize_image_url(i)).collect(),
        session_id: body.session_id,
        manual_intent,
        context: body.context,
    };

    let result = state
        .router
        .handle_message(&state.db, &user, incoming)
        .await
        .map_err(map_error)?;

    Ok(Json(ChatMessageResponse {
        response: result.response.into(),
        recipe: result.recipe,
        conversation_id: result.conversation_id,
        session_id: result.session_id,
        intent_metadata: result.intent_metadata,
    }))
}

// -- GET /chat/history --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    conversation_id: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    #[serde(rename_all = "camelCase")]
    Messages {
        conversation_id: String,
        messages: Vec<MessageRecord>,
    },
    Conversations {
        conversations: Vec<ConversationSummary>,
    },
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ErrorBody>)> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    match params.conversation_id {
        Some(conversation_id) => {
            let conversation = state
                .db
                .get_conversation(&user.id, &conversation_id)
                .map_err(map_error)?
                .ok_or_else(|| {
                    map_error(LadleError::ConversationNotFound(conversation_id.clone()))
                })?;

            let messages = state
                .db
                .get_messages(&conversation.id, limit)
                .map_err(map_error)?;

            Ok(Json(HistoryResponse::Messages {
                conversation_id: conversation.id,
                messages,
            }))
        }
        None => {
            let conversations = state
                .db
                .list_conversation_summaries(&user.id, limit)
                .map_err(map_error)?;
            Ok(Json(HistoryResponse::Conversations { conversations }))
        }
    }
}

// -- DELETE /chat/history --

#[derive(Serialize)]
pub struct DeleteResponse {
    deleted: usize,
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(params): Query<HistoryParams>,
) -> Result<Json<DeleteResponse>, (StatusCode, Json<ErrorBody>)> {
    match params.conversation_id {
        Some(conversation_id) => {
            let deleted = state
                .db
                .delete_conversation(&user.id, &conversation_id)
                .map_err(map_error)?;
            if !deleted {
                return Err(map_error(LadleError::ConversationNotFound(conversation_id)));
            }
            Ok(Json(DeleteResponse { deleted: 1 }))
        }
        None => {
            let deleted = state
                .db
                .delete_all_conversations(&user.id)
                .map_err(map_error)?;
            Ok(Json(DeleteResponse { deleted }))
        }
    }
}
