//! Conversational routing
//!
//! Provides:
//! - Intent classification with a fail-open degrade path
//! - Structured recipe extraction
//! - History-aware general chat with explicit fallbacks
//! - The router orchestrating all of it around message persistence

mod extractor;
mod general;
mod intent;
mod router;

pub use extractor::{coerce_number, parse_recipe_response, RecipeExtractor};
pub use general::{
    ChatFallback, GeneralChatHandler, GeneralChatOutcome, GENERAL_CHAT_APOLOGY, HISTORY_WINDOW,
};
pub use intent::{
    Intent, IntentClassifier, IntentResult, IntentSource, DEGRADED_CONFIDENCE,
};
pub use router::{
    ChatRouter, IncomingMessage, IntentMetadata, RouterResponse, UserIdentity, HANDLER_APOLOGY,
    RAG_UNAVAILABLE, RAG_WEBHOOK_APOLOGY,
};
