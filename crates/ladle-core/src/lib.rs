//! Ladle Core Library
//!
//! Core functionality for the ladle conversational recipe assistant.
//!
//! # Features
//! - Intent routing over three handlers (extraction, retrieval, chat)
//! - Hybrid recipe search: vector similarity + FTS5 lexical rank
//! - OpenAI-compatible chat and embedding clients
//! - Webhook gateway to an external workflow engine
//! - SQLite persistence for conversations, messages, and the recipe corpus

pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod recipe;
pub mod search;
pub mod webhook;

pub use chat::{
    ChatFallback, ChatRouter, IncomingMessage, Intent, IntentClassifier, IntentMetadata,
    IntentResult, IntentSource, RecipeExtractor, RouterResponse, UserIdentity,
};
pub use config::{AiServiceConfig, Config, RagBackend, RagConfig, WebhookConfig};
pub use db::{Conversation, ConversationSummary, Database, MessageInsert, MessageRecord, RecipeRow};
pub use error::{Error, LadleError, Result};
pub use llm::{ChatMessage, ChatModel, Embedder, MetricsSnapshot, OpenAiClient};
pub use recipe::{Difficulty, Ingredient, Recipe};
pub use search::{
    hybrid_search, search_recipes, SearchOptions, SearchResult, SearchType, DEFAULT_LIMIT,
    LEXICAL_WEIGHT, SIMILARITY_THRESHOLD, VECTOR_WEIGHT,
};
pub use webhook::{WebhookGateway, WebhookReply};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "ladle";

/// Default data directory name
pub const DATA_DIR_NAME: &str = "ladle";
