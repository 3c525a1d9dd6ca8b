//! General cooking conversation
//!
//! Replies with a bounded window of prior turns for context. History is a
//! quality enhancement, not a correctness requirement, so a failed
//! history-aware call retries once without history before apologizing.

use crate::db::Database;
use crate::llm::{ChatMessage, ChatModel, ModelKind};
use serde::Serialize;
use std::sync::Arc;

/// Maximum prior messages replayed as context
pub const HISTORY_WINDOW: usize = 10;

/// Fixed reply when both completion attempts fail
pub const GENERAL_CHAT_APOLOGY: &str =
    "I'm sorry, I'm having trouble answering right now. Please try again in a moment.";

const GENERAL_SYSTEM_PROMPT: &str = "\
You are a friendly cooking assistant. You can discuss recipes, techniques, \
ingredient substitutions, and meal ideas. You CANNOT search the user's \
saved recipes and you CANNOT save new recipes in this conversation mode - \
if asked, tell the user to rephrase their request so it can be routed \
appropriately. Keep answers concise and practical.";

/// Which fallback step fired while producing a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatFallback {
    /// History-aware call succeeded
    None,
    /// History-aware call failed; single-turn retry succeeded
    NoHistory,
    /// Both calls failed; fixed apology returned
    Apology,
}

/// General chat outcome with the fallback branch that produced it
#[derive(Debug, Clone)]
pub struct GeneralChatOutcome {
    pub reply: String,
    pub fallback: ChatFallback,
}

/// Handles general-conversation messages
pub struct GeneralChatHandler {
    client: Arc<dyn ChatModel>,
}

impl GeneralChatHandler {
    pub fn new(client: Arc<dyn ChatModel>) -> Self {
        Self { client }
    }

    /// Produce a conversational reply. Never fails: degraded paths return
    /// the fixed apology with the fired fallback recorded.
    pub async fn respond(
        &self,
        db: &Database,
        conversation_id: &str,
        message: &str,
    ) -> GeneralChatOutcome {
        let mut history = match db.recent_messages(conversation_id, HISTORY_WINDOW) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("history load failed, continuing without it: {}", e);
                Vec::new()
            }
        };

        // The current message is already persisted and so appears at the
        // tail of the window; drop it rather than replay it twice.
        if history
            .last()
            .is_some_and(|m| m.role == "user" && m.content == message)
        {
            history.pop();
        }

        let mut messages = vec![ChatMessage::system(GENERAL_SYSTEM_PROMPT)];
        for record in &history {
            match record.role.as_str() {
                "assistant" => messages.push(ChatMessage::assistant(record.content.clone())),
                _ => messages.push(ChatMessage::user(record.content.clone())),
            }
        }
        messages.push(ChatMessage::user(message));

        match self.client.chat_completion(messages, ModelKind::Text).await {
            Ok(reply) => GeneralChatOutcome {
                reply,
                fallback: ChatFallback::None,
            },
            Err(e) => {
                tracing::warn!("history-aware chat failed, retrying without history: {}", e);
                self.respond_without_history(message).await
            }
        }
    }

    async fn respond_without_history(&self, message: &str) -> GeneralChatOutcome {
        let messages = vec![
            ChatMessage::system(GENERAL_SYSTEM_PROMPT),
            ChatMessage::user(message),
        ];

        match self.client.chat_completion(messages, ModelKind::Text).await {
            Ok(reply) => GeneralChatOutcome {
                reply,
                fallback: ChatFallback::NoHistory,
            },
            Err(e) => {
                tracing::warn!("single-turn chat also failed, apologizing: {}", e);
                GeneralChatOutcome {
                    reply: GENERAL_CHAT_APOLOGY.to_string(),
                    fallback: ChatFallback::Apology,
                }
            }
        }
    }
}
