//! AI provider integration
//!
//! Provides traits and implementations for:
//! - Chat completions (single-turn, multi-turn, multimodal)
//! - Embedding generation via OpenAI-compatible services

mod client;
mod traits;

pub use client::{normalize_image_url, ApiMetrics, MetricsSnapshot, OpenAiClient};
pub use traits::{
    ChatMessage, ChatModel, ContentPart, Embedder, ImageUrl, MessageContent, ModelKind,
};
