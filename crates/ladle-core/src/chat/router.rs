//! Message routing
//!
//! Single entry point for chat messages: resolves the conversation,
//! persists the user's message before any AI call, resolves the routing
//! intent, dispatches to exactly one handler, and persists the reply.
//! Once a turn has begun the system always answers something: handler
//! failures become an apologetic assistant message, never a hard failure.

use super::extractor::RecipeExtractor;
use super::general::{ChatFallback, GeneralChatHandler};
use super::intent::{Intent, IntentClassifier, IntentResult, IntentSource};
use crate::config::{Config, RagBackend};
use crate::db::{generate_id, Database, MessageInsert, MessageRecord};
use crate::error::{LadleError, Result};
use crate::llm::{ChatModel, Embedder};
use crate::recipe::Recipe;
use crate::search::{hybrid_search, SearchOptions, SearchResult};
use crate::webhook::{WebhookData, WebhookGateway, WebhookUser};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Fixed reply when a handler fails outright
pub const HANDLER_APOLOGY: &str =
    "I'm sorry, something went wrong while handling your message. Please try again.";

/// Fixed reply when webhook-backed RAG is disabled
pub const RAG_UNAVAILABLE: &str =
    "Recipe search is currently unavailable. Please try again later.";

/// Fixed reply when the workflow engine is unreachable or slow
pub const RAG_WEBHOOK_APOLOGY: &str =
    "I'm sorry, I couldn't reach the recipe search service just now. Please try again in a moment.";

/// Caller identity, as established at the service boundary
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// An incoming chat message
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub message: String,
    pub images: Vec<String>,
    pub session_id: Option<String>,
    pub manual_intent: Option<Intent>,
    pub context: Option<Value>,
}

/// How the routing intent was resolved for one message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMetadata {
    pub intent: Intent,
    pub source: IntentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub duration_ms: u64,
}

/// Response envelope for one handled message
#[derive(Debug, Clone, Serialize)]
pub struct RouterResponse {
    pub response: MessageRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Recipe>,
    pub conversation_id: String,
    pub session_id: String,
    pub intent_metadata: IntentMetadata,
}

/// What a handler produced for the assistant message
struct HandlerReply {
    content: String,
    kind: &'static str,
    recipe: Option<Recipe>,
    detail: Map<String, Value>,
}

impl HandlerReply {
    fn text(content: String) -> Self {
        Self {
            content,
            kind: "text",
            recipe: None,
            detail: Map::new(),
        }
    }
}

/// The orchestrator: classification, dispatch, persistence
pub struct ChatRouter {
    classifier: IntentClassifier,
    extractor: RecipeExtractor,
    general: GeneralChatHandler,
    gateway: WebhookGateway,
    embedder: Arc<dyn Embedder>,
    rag_backend: RagBackend,
}

impl ChatRouter {
    pub fn new(
        chat_client: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            classifier: IntentClassifier::new(chat_client.clone()),
            extractor: RecipeExtractor::new(chat_client.clone()),
            general: GeneralChatHandler::new(chat_client),
            gateway: WebhookGateway::new(config.webhook.clone())?,
            embedder,
            rag_backend: config.rag.backend,
        })
    }

    /// Handle one chat message end to end.
    ///
    /// The only hard failure is an empty message with no images; everything
    /// past that point resolves to a persisted assistant reply.
    pub async fn handle_message(
        &self,
        db: &Database,
        user: &UserIdentity,
        incoming: IncomingMessage,
    ) -> Result<RouterResponse> {
        if incoming.message.trim().is_empty() && incoming.images.is_empty() {
            return Err(LadleError::InvalidInput(
                "message must contain text or at least one image".to_string(),
            ));
        }

        let session_key = incoming
            .session_id
            .clone()
            .unwrap_or_else(generate_id);

        let conversation = db.resolve_or_create_conversation(
            &user.id,
            &session_key,
            incoming.manual_intent.map(|i| i.as_str()),
        )?;

        // Persist the user's message before any AI call so a crash
        // mid-routing never loses their input.
        let mut user_metadata = Map::new();
        if !incoming.images.is_empty() {
            user_metadata.insert("image_count".to_string(), json!(incoming.images.len()));
        }
        let user_message = db.insert_message(&MessageInsert {
            conversation_id: &conversation.id,
            role: "user",
            content: &incoming.message,
            kind: "text",
            metadata: user_metadata,
        })?;

        let (intent, source, classification) = match incoming.manual_intent {
            Some(intent) => (intent, IntentSource::Manual, None),
            None => {
                let result = self
                    .classifier
                    .classify(&incoming.message, &incoming.images)
                    .await;
                (result.intent, IntentSource::Ai, Some(result))
            }
        };
        tracing::info!("routing message {} as {} ({:?})", user_message.id, intent, source);

        let started = Instant::now();
        let reply = match self
            .dispatch(db, user, &conversation.id, &user_message, &incoming, intent)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("handler for {} failed: {}", intent, e);
                let mut reply = HandlerReply::text(HANDLER_APOLOGY.to_string());
                reply
                    .detail
                    .insert("handler_error".to_string(), json!(e.to_string()));
                reply
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        let intent_metadata = IntentMetadata {
            intent,
            source,
            reason: classification.as_ref().map(|c: &IntentResult| c.reason.clone()),
            confidence: classification.as_ref().map(|c| c.confidence),
            duration_ms,
        };

        let mut assistant_metadata = reply.detail;
        assistant_metadata.insert("routing".to_string(), serde_json::to_value(&intent_metadata)?);
        if let Some(ref recipe) = reply.recipe {
            assistant_metadata.insert("recipe".to_string(), serde_json::to_value(recipe)?);
        }

        let assistant_message = db.insert_message(&MessageInsert {
            conversation_id: &conversation.id,
            role: "assistant",
            content: &reply.content,
            kind: reply.kind,
            metadata: assistant_metadata,
        })?;

        Ok(RouterResponse {
            response: assistant_message,
            recipe: reply.recipe,
            conversation_id: conversation.id,
            session_id: session_key,
            intent_metadata,
        })
    }

    async fn dispatch(
        &self,
        db: &Database,
        user: &UserIdentity,
        conversation_id: &str,
        user_message: &MessageRecord,
        incoming: &IncomingMessage,
        intent: Intent,
    ) -> Result<HandlerReply> {
        match intent {
            Intent::RecipeExtraction => {
                self.handle_extraction(&incoming.message, &incoming.images)
                    .await
            }
            Intent::RagSearch => {
                self.handle_rag(db, user, user_message, incoming).await
            }
            Intent::GeneralChat => {
                let outcome = self
                    .general
                    .respond(db, conversation_id, &incoming.message)
                    .await;
                let mut reply = HandlerReply::text(outcome.reply);
                if outcome.fallback != ChatFallback::None {
                    reply
                        .detail
                        .insert("chat_fallback".to_string(), json!(outcome.fallback));
                }
                Ok(reply)
            }
        }
    }

    async fn handle_extraction(&self, message: &str, images: &[String]) -> Result<HandlerReply> {
        match self.extractor.extract(message, images).await {
            Ok(recipe) => {
                let content = format_extraction_reply(&recipe);
                Ok(HandlerReply {
                    content,
                    kind: "recipe",
                    recipe: Some(recipe),
                    detail: Map::new(),
                })
            }
            Err(LadleError::Extraction(reason)) => {
                // Invalid extractions are reported specifically, not as a
                // generic apology.
                let mut reply = HandlerReply::text(format!(
                    "I couldn't extract a complete recipe from that: {}. \
                     Could you include the title, ingredients, and steps?",
                    reason
                ));
                reply
                    .detail
                    .insert("extraction_error".to_string(), json!(reason));
                Ok(reply)
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_rag(
        &self,
        db: &Database,
        user: &UserIdentity,
        user_message: &MessageRecord,
        incoming: &IncomingMessage,
    ) -> Result<HandlerReply> {
        match self.rag_backend {
            RagBackend::Webhook => {
                if !self.gateway.is_enabled() {
                    tracing::warn!("RAG routed to webhook but gateway is disabled");
                    let mut reply = HandlerReply::text(RAG_UNAVAILABLE.to_string());
                    reply
                        .detail
                        .insert("rag_backend".to_string(), json!("webhook_disabled"));
                    return Ok(reply);
                }

                let event = WebhookGateway::envelope(
                    "chat_message",
                    WebhookData {
                        id: user_message.id.clone(),
                        content: incoming.message.clone(),
                        kind: "text".to_string(),
                        intent: Some(Intent::RagSearch),
                        session_id: incoming.session_id.clone(),
                        context: incoming.context.clone(),
                    },
                    Some(WebhookUser {
                        id: user.id.clone(),
                        email: user.email.clone(),
                        name: user.name.clone(),
                    }),
                    Map::new(),
                );

                let content = self.gateway.dispatch(&event, RAG_WEBHOOK_APOLOGY).await;
                let mut reply = HandlerReply::text(content);
                reply
                    .detail
                    .insert("rag_backend".to_string(), json!("webhook"));
                Ok(reply)
            }
            RagBackend::Local => {
                let results = hybrid_search(
                    db,
                    &incoming.message,
                    &user.id,
                    self.embedder.as_ref(),
                    &SearchOptions::default(),
                )
                .await?;

                let mut reply = HandlerReply::text(format_search_reply(&results));
                reply.detail.insert("rag_backend".to_string(), json!("local"));
                reply
                    .detail
                    .insert("result_count".to_string(), json!(results.len()));
                Ok(reply)
            }
        }
    }
}

fn format_extraction_reply(recipe: &Recipe) -> String {
    format!(
        "I've extracted \"{}\" with {} ingredient(s) and {} step(s). Ready to save it?",
        recipe.title,
        recipe.ingredients.len(),
        recipe.instructions.len()
    )
}

fn format_search_reply(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "I couldn't find any saved recipes matching that. \
                Try different ingredients or a broader description."
            .to_string();
    }

    let mut lines = vec![format!(
        "I found {} recipe(s) in your collection:",
        results.len()
    )];
    for (i, result) in results.iter().enumerate() {
        match result.description {
            Some(ref description) => {
                lines.push(format!("{}. {} — {}", i + 1, result.title, description))
            }
            None => lines.push(format!("{}. {}", i + 1, result.title)),
        }
    }
    lines.join("\n")
}
