//! Hybrid recipe retrieval
//!
//! Provides:
//! - Vector similarity search over stored embeddings
//! - Lexical full-text search via FTS5 (with substring fallback)
//! - Hybrid search merging both branches into one ranked result set

mod hybrid;
mod lexical;
mod vector;

pub use hybrid::{hybrid_search, merge_results, search_recipes};

use crate::recipe::Ingredient;
use serde::{Deserialize, Serialize};

/// Minimum cosine similarity for a vector-branch candidate
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Weight applied to vector-branch similarity scores
pub const VECTOR_WEIGHT: f64 = 0.7;

/// Weight applied to lexical-branch rank scores
pub const LEXICAL_WEIGHT: f64 = 0.3;

/// Default result limit
pub const DEFAULT_LIMIT: usize = 10;

/// Which retrieval branches a search runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Vector branch only
    Semantic,
    /// Lexical branch only
    Text,
    /// Both branches, merged
    Hybrid,
}

/// Search options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Minimum vector similarity (0.0 - 1.0)
    pub similarity_threshold: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            similarity_threshold: SIMILARITY_THRESHOLD,
        }
    }
}

/// One ranked search hit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub recipe_id: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    /// Vector-branch cosine similarity (0 when only the lexical branch hit)
    pub similarity: f64,
    /// Lexical-branch rank score (0 when only the vector branch hit)
    pub rank: f64,
    /// Combined score used for ordering
    pub score: f64,
    /// Searchable-text projection, kept for debugging
    pub search_text: String,
}

/// Common English stop words removed from natural language queries
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "does", "do",
    "did", "can", "could", "should", "would", "what", "where", "when", "why", "how", "who",
    "which", "this", "these", "those", "there", "here",
];

/// Sanitize a query for FTS5 to prevent syntax errors.
///
/// Removes stop words and FTS5 operator characters; natural language queries
/// like "what can I make with chicken?" become "make chicken".
pub fn sanitize_fts_query(query: &str) -> String {
    if query.trim().is_empty() {
        return String::new();
    }

    let cleaned = query
        .replace('?', "")
        .replace('!', "")
        .replace('^', "")
        .replace('"', "")
        .replace(':', "")
        .replace('(', "")
        .replace(')', "")
        .replace('[', "")
        .replace(']', "")
        .replace('{', "")
        .replace('}', "");

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|word| {
            let lower = word.to_lowercase();
            !STOP_WORDS.contains(&lower.as_str())
        })
        .collect();

    words.join(" ")
}
