//! Vector similarity search
//!
//! Computes cosine similarity between the query embedding and each stored
//! recipe embedding, scoped to the requesting user.

use super::{SearchOptions, SearchResult};
use crate::db::{cosine_similarity, Database};
use crate::error::Result;
use crate::llm::Embedder;
use rusqlite::params;

impl Database {
    /// Perform vector similarity search over a user's recipes.
    ///
    /// The query embedding is computed inside the branch so hybrid search
    /// can overlap it with the lexical branch.
    pub async fn search_recipes_vector(
        &self,
        query: &str,
        user_id: &str,
        embedder: &dyn Embedder,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = embedder.embed(query).await?;

        let stored = self.get_user_embeddings(user_id)?;

        let mut similarities: Vec<(String, f32)> = stored
            .iter()
            .map(|(recipe_id, embedding)| {
                (recipe_id.clone(), cosine_similarity(&query_embedding, embedding))
            })
            .filter(|(_, sim)| *sim as f64 >= options.similarity_threshold)
            .collect();

        similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        similarities.truncate(options.limit);

        let mut results = Vec::with_capacity(similarities.len());
        for (recipe_id, similarity) in similarities {
            if let Some(result) = self.vector_result_for_recipe(&recipe_id, similarity as f64)? {
                results.push(result);
            }
        }

        Ok(results)
    }

    fn vector_result_for_recipe(
        &self,
        recipe_id: &str,
        similarity: f64,
    ) -> Result<Option<SearchResult>> {
        let result = self.conn().query_row(
            "SELECT id, title, description, ingredients, instructions, search_text
             FROM recipes WHERE id = ?1",
            params![recipe_id],
            |row| {
                let ingredients_json: String = row.get(3)?;
                let instructions_json: String = row.get(4)?;
                Ok(SearchResult {
                    recipe_id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    ingredients: serde_json::from_str(&ingredients_json).unwrap_or_default(),
                    instructions: serde_json::from_str(&instructions_json).unwrap_or_default(),
                    similarity,
                    rank: 0.0,
                    score: similarity,
                    search_text: row.get(5)?,
                })
            },
        );

        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
