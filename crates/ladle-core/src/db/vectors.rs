//! Vector storage operations
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.

use super::Database;
use crate::error::Result;
use chrono::Utc;
use rusqlite::params;

impl Database {
    /// Store (or replace) the embedding for a recipe
    pub fn set_recipe_embedding(
        &self,
        recipe_id: &str,
        model: &str,
        embedding: &[f32],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let embedding_bytes = embedding_to_bytes(embedding);
        self.conn().execute(
            "INSERT OR REPLACE INTO recipe_embeddings (recipe_id, model, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![recipe_id, model, embedding_bytes, now],
        )?;
        Ok(())
    }

    /// Check whether any embeddings exist at all
    pub fn has_embeddings(&self) -> bool {
        self.conn()
            .query_row("SELECT COUNT(*) FROM recipe_embeddings", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    /// Get all embeddings for a user's recipes
    pub fn get_user_embeddings(&self, user_id: &str) -> Result<Vec<(String, Vec<f32>)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.recipe_id, e.embedding
             FROM recipe_embeddings e
             JOIN recipes r ON r.id = e.recipe_id
             WHERE r.user_id = ?1",
        )?;

        let results = stmt
            .query_map(params![user_id], |row| {
                let recipe_id: String = row.get(0)?;
                let embedding_bytes: Vec<u8> = row.get(1)?;
                Ok((recipe_id, bytes_to_embedding(&embedding_bytes)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }
}

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![1.0f32, 2.0, 3.0, -1.5];
        let bytes = embedding_to_bytes(&original);
        let restored = bytes_to_embedding(&bytes);
        assert_eq!(original, restored);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 0.0001);
    }

    #[test]
    fn test_embeddings_scoped_by_user() {
        use crate::db::RecipeRow;
        use crate::recipe::{Ingredient, Recipe};

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let recipe = Recipe {
            title: "Salad".to_string(),
            description: None,
            ingredients: vec![Ingredient {
                name: "lettuce".to_string(),
                amount: 1.0,
                unit: "head".to_string(),
                category: None,
            }],
            instructions: vec!["chop".to_string()],
            prep_time_minutes: None,
            cook_time_minutes: None,
            servings: None,
            difficulty: None,
            tags: Vec::new(),
        };

        let id = db
            .insert_recipe(&RecipeRow {
                user_id: "u1",
                recipe: &recipe,
            })
            .unwrap();
        db.set_recipe_embedding(&id, "test-model", &[0.1, 0.2, 0.3])
            .unwrap();

        assert_eq!(db.get_user_embeddings("u1").unwrap().len(), 1);
        assert!(db.get_user_embeddings("u2").unwrap().is_empty());
    }
}
