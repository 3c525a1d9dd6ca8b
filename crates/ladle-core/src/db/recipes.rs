//! Recipe corpus rows
//!
//! The retrieval engine's read model. Rows are written by the ingestion
//! collaborator through these helpers; the FTS index stays in sync via
//! triggers on the base table.

use super::ids::generate_id;
use super::Database;
use crate::error::Result;
use crate::recipe::{Ingredient, Recipe};
use chrono::Utc;
use rusqlite::params;

/// Stored recipe read model
#[derive(Debug, Clone)]
pub struct StoredRecipe {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub search_text: String,
    pub created_at: String,
}

/// Insert parameters for a recipe row
#[derive(Debug, Clone)]
pub struct RecipeRow<'a> {
    pub user_id: &'a str,
    pub recipe: &'a Recipe,
}

fn row_to_stored(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecipe> {
    let ingredients_json: String = row.get(4)?;
    let instructions_json: String = row.get(5)?;
    Ok(StoredRecipe {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        ingredients: serde_json::from_str(&ingredients_json).unwrap_or_default(),
        instructions: serde_json::from_str(&instructions_json).unwrap_or_default(),
        search_text: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const SELECT_STORED: &str =
    "SELECT id, user_id, title, description, ingredients, instructions, search_text, created_at
     FROM recipes";

impl Database {
    /// Insert a recipe row, returning its generated id
    pub fn insert_recipe(&self, row: &RecipeRow<'_>) -> Result<String> {
        let id = generate_id();
        let now = Utc::now().to_rfc3339();
        let recipe = row.recipe;
        let ingredients_json = serde_json::to_string(&recipe.ingredients)?;
        let instructions_json = serde_json::to_string(&recipe.instructions)?;
        let tags_json = serde_json::to_string(&recipe.tags)?;
        let difficulty = recipe
            .difficulty
            .map(|d| serde_json::to_value(d).ok())
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string));

        self.conn().execute(
            "INSERT INTO recipes (id, user_id, title, description, ingredients, instructions,
                                  prep_time_minutes, cook_time_minutes, servings, difficulty,
                                  tags, search_text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                id,
                row.user_id,
                recipe.title,
                recipe.description,
                ingredients_json,
                instructions_json,
                recipe.prep_time_minutes,
                recipe.cook_time_minutes,
                recipe.servings,
                difficulty,
                tags_json,
                recipe.search_text(),
                now
            ],
        )?;

        Ok(id)
    }

    /// Get a stored recipe by id, scoped to its owner
    pub fn get_recipe(&self, user_id: &str, id: &str) -> Result<Option<StoredRecipe>> {
        let sql = format!("{} WHERE id = ?1 AND user_id = ?2", SELECT_STORED);
        let result = self
            .conn()
            .query_row(&sql, params![id, user_id], row_to_stored);
        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Count a user's recipes
    pub fn count_recipes(&self, user_id: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM recipes WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete a recipe row (embedding goes with it, via cascade)
    pub fn delete_recipe(&self, user_id: &str, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM recipes WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{Difficulty, Ingredient};

    fn sample_recipe(title: &str) -> Recipe {
        Recipe {
            title: title.to_string(),
            description: Some("A weeknight favorite".to_string()),
            ingredients: vec![Ingredient {
                name: "chicken breast".to_string(),
                amount: 2.0,
                unit: "pieces".to_string(),
                category: Some("meat".to_string()),
            }],
            instructions: vec!["season".to_string(), "sear".to_string()],
            prep_time_minutes: Some(10),
            cook_time_minutes: Some(20),
            servings: Some(2),
            difficulty: Some(Difficulty::Easy),
            tags: vec!["dinner".to_string()],
        }
    }

    #[test]
    fn test_insert_and_get_recipe() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let recipe = sample_recipe("Pan Chicken");
        let id = db
            .insert_recipe(&RecipeRow {
                user_id: "u1",
                recipe: &recipe,
            })
            .unwrap();

        let stored = db.get_recipe("u1", &id).unwrap().unwrap();
        assert_eq!(stored.title, "Pan Chicken");
        assert_eq!(stored.ingredients.len(), 1);
        assert_eq!(stored.ingredients[0].name, "chicken breast");
        assert!(stored.search_text.contains("chicken"));

        // Scoped to the owning user
        assert!(db.get_recipe("u2", &id).unwrap().is_none());
    }

    #[test]
    fn test_delete_recipe() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let recipe = sample_recipe("Soup");
        let id = db
            .insert_recipe(&RecipeRow {
                user_id: "u1",
                recipe: &recipe,
            })
            .unwrap();
        assert!(db.delete_recipe("u1", &id).unwrap());
        assert_eq!(db.count_recipes("u1").unwrap(), 0);
    }
}
