//! Error types for ladle

use thiserror::Error;

/// Result type alias using LadleError
pub type Result<T> = std::result::Result<T, LadleError>;

/// Error type alias for convenience
pub type Error = LadleError;

/// Main error type for ladle
#[derive(Debug, Error)]
pub enum LadleError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Recipe extraction failed: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
