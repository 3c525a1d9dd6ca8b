//! Lexical full-text search via FTS5
//!
//! Ranks by a normalized bm25 score; falls back to substring matching when
//! the index has no match for the sanitized query.

use super::{sanitize_fts_query, SearchOptions, SearchResult};
use crate::db::Database;
use crate::error::Result;
use rusqlite::params;

fn row_to_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchResult> {
    let ingredients_json: String = row.get(3)?;
    let instructions_json: String = row.get(4)?;
    let rank: f64 = row.get(6)?;
    Ok(SearchResult {
        recipe_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        ingredients: serde_json::from_str(&ingredients_json).unwrap_or_default(),
        instructions: serde_json::from_str(&instructions_json).unwrap_or_default(),
        similarity: 0.0,
        rank,
        score: rank,
        search_text: row.get(5)?,
    })
}

impl Database {
    /// Perform lexical search over a user's recipes
    pub fn search_recipes_lexical(
        &self,
        query: &str,
        user_id: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let sanitized = sanitize_fts_query(query);
        if !sanitized.is_empty() {
            let results = self.search_recipes_fts(&sanitized, user_id, options)?;
            if !results.is_empty() {
                return Ok(results);
            }
        }
        self.search_recipes_substring(query, user_id, options)
    }

    fn search_recipes_fts(
        &self,
        query: &str,
        user_id: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.title, r.description, r.ingredients, r.instructions, r.search_text,
                    1.0 / (1.0 + (-1.0 * bm25(recipes_fts, 5.0, 1.0, 2.0))) as rank
             FROM recipes_fts fts
             JOIN recipes r ON r.rowid = fts.rowid
             WHERE recipes_fts MATCH ?1 AND r.user_id = ?2
             ORDER BY rank DESC
             LIMIT ?3",
        )?;

        // A query that still trips FTS5 syntax degrades to the substring
        // path; syntax errors surface on iteration, not on prepare.
        let collected = stmt
            .query_map(
                params![query, user_id, options.limit as i64],
                row_to_result,
            )
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>());

        match collected {
            Ok(results) => Ok(results),
            Err(e) => {
                tracing::warn!("FTS query failed, using substring fallback: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Substring fallback: scores by the fraction of query terms present in
    /// the searchable text, scaled below typical FTS ranks.
    fn search_recipes_substring(
        &self,
        query: &str,
        user_id: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, description, ingredients, instructions, search_text, 0.0
             FROM recipes WHERE user_id = ?1",
        )?;

        let candidates = stmt
            .query_map(params![user_id], row_to_result)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut scored: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|mut result| {
                let matched = terms
                    .iter()
                    .filter(|t| result.search_text.contains(t.as_str()))
                    .count();
                if matched == 0 {
                    return None;
                }
                let rank = 0.5 * matched as f64 / terms.len() as f64;
                result.rank = rank;
                result.score = rank;
                Some(result)
            })
            .collect();

        scored.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(options.limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RecipeRow;
    use crate::recipe::{Ingredient, Recipe};

    fn seed(db: &Database, user_id: &str, title: &str, ingredient: &str) -> String {
        let recipe = Recipe {
            title: title.to_string(),
            description: None,
            ingredients: vec![Ingredient {
                name: ingredient.to_string(),
                amount: 1.0,
                unit: "unit".to_string(),
                category: None,
            }],
            instructions: vec![format!("cook the {}", ingredient)],
            prep_time_minutes: None,
            cook_time_minutes: None,
            servings: None,
            difficulty: None,
            tags: Vec::new(),
        };
        db.insert_recipe(&RecipeRow { user_id, recipe: &recipe }).unwrap()
    }

    #[test]
    fn test_fts_matches_ingredient_terms() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let id = seed(&db, "u1", "Garlic Chicken", "chicken");
        seed(&db, "u1", "Fruit Salad", "apple");

        let results = db
            .search_recipes_lexical("chicken", "u1", &SearchOptions::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].recipe_id, id);
        assert!(results[0].rank > 0.0);
    }

    #[test]
    fn test_scoped_to_user() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        seed(&db, "u1", "Garlic Chicken", "chicken");

        let results = db
            .search_recipes_lexical("chicken", "u2", &SearchOptions::default())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_substring_fallback_fires_when_fts_misses() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        seed(&db, "u1", "Bánh Mì", "baguette");

        // Partial token the porter tokenizer will not match; substring does.
        let results = db
            .search_recipes_lexical("baguet", "u1", &SearchOptions::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].rank > 0.0 && results[0].rank <= 0.5);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        seed(&db, "u1", "Toast", "bread");

        let results = db
            .search_recipes_lexical("zzzzz", "u1", &SearchOptions::default())
            .unwrap();
        assert!(results.is_empty());
    }
}
