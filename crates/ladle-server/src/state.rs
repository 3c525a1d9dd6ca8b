//! Shared application state

use ladle_core::llm::Embedder;
use ladle_core::{ChatRouter, Database};
use std::sync::Arc;

/// State shared by all request handlers
pub struct AppState {
    pub db: Database,
    pub router: ChatRouter,
    pub embedder: Arc<dyn Embedder>,
}
