//! Database layer for ladle
//!
//! Provides SQLite-based storage with:
//! - Conversation and message persistence
//! - Recipe corpus rows with an FTS5 full-text index
//! - BLOB-encoded embedding vectors for similarity search

mod conversations;
mod ids;
mod messages;
mod recipes;
mod schema;
pub mod vectors;

pub use conversations::{Conversation, ConversationSummary};
pub use ids::generate_id;
pub use messages::{MessageInsert, MessageRecord};
pub use recipes::{RecipeRow, StoredRecipe};
pub use schema::Database;
pub use vectors::{bytes_to_embedding, cosine_similarity, embedding_to_bytes};

use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::DATA_DIR_NAME)
            .join("ladle.sqlite")
    }
}
