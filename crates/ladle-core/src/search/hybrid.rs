//! Hybrid search: concurrent vector + lexical branches, weighted merge

use super::{SearchOptions, SearchResult, SearchType, LEXICAL_WEIGHT, VECTOR_WEIGHT};
use crate::db::Database;
use crate::error::Result;
use crate::llm::Embedder;
use std::collections::HashMap;

/// Run a search of the requested type over a user's recipes
pub async fn search_recipes(
    db: &Database,
    query: &str,
    user_id: &str,
    embedder: &dyn Embedder,
    search_type: SearchType,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    match search_type {
        SearchType::Semantic => db.search_recipes_vector(query, user_id, embedder, options).await,
        SearchType::Text => db.search_recipes_lexical(query, user_id, options),
        SearchType::Hybrid => hybrid_search(db, query, user_id, embedder, options).await,
    }
}

/// Full hybrid search pipeline.
///
/// Both branches run concurrently; a failed branch degrades to an empty
/// result for that branch only and never aborts the search.
pub async fn hybrid_search(
    db: &Database,
    query: &str,
    user_id: &str,
    embedder: &dyn Embedder,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let (vector_branch, lexical_branch) = tokio::join!(
        db.search_recipes_vector(query, user_id, embedder, options),
        async { db.search_recipes_lexical(query, user_id, options) },
    );

    let vector_results = vector_branch.unwrap_or_else(|e| {
        tracing::warn!("vector branch unavailable, returning lexical only: {}", e);
        Vec::new()
    });
    let lexical_results = lexical_branch.unwrap_or_else(|e| {
        tracing::warn!("lexical branch unavailable, returning vector only: {}", e);
        Vec::new()
    });

    tracing::debug!(
        "hybrid search: {} vector hits, {} lexical hits",
        vector_results.len(),
        lexical_results.len()
    );

    Ok(merge_results(vector_results, lexical_results, options.limit))
}

/// Merge the two branches into one deduplicated, ranked result set.
///
/// Scores combine as `0.7 * similarity + 0.3 * rank`; a recipe hit by both
/// branches gets the sum of its weighted contributions, a single-branch hit
/// contributes zero for the missing component. Ties keep the merge order
/// (vector hits first), which the stable sort preserves.
pub fn merge_results(
    vector_results: Vec<SearchResult>,
    lexical_results: Vec<SearchResult>,
    limit: usize,
) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();

    for result in vector_results {
        match index_by_id.get(&result.recipe_id) {
            Some(&i) => {
                if result.similarity > merged[i].similarity {
                    merged[i].similarity = result.similarity;
                }
            }
            None => {
                index_by_id.insert(result.recipe_id.clone(), merged.len());
                merged.push(result);
            }
        }
    }

    for result in lexical_results {
        match index_by_id.get(&result.recipe_id) {
            Some(&i) => {
                if result.rank > merged[i].rank {
                    merged[i].rank = result.rank;
                }
            }
            None => {
                index_by_id.insert(result.recipe_id.clone(), merged.len());
                merged.push(result);
            }
        }
    }

    for result in &mut merged {
        result.score = VECTOR_WEIGHT * result.similarity + LEXICAL_WEIGHT * result.rank;
    }

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(limit);
    merged
}
