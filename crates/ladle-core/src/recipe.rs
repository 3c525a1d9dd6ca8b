//! Recipe domain model
//!
//! A record is valid only when title, ingredients, and instructions are all
//! present and non-empty; anything less is an extraction error, not a
//! partial success.

use serde::{Deserialize, Serialize};

/// One ingredient line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Recipe difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A structured recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Recipe {
    /// Check the mandatory-field invariant, returning a readable reason on
    /// the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("recipe is missing a title".to_string());
        }
        if self.ingredients.is_empty() {
            return Err(format!("recipe \"{}\" has no ingredients", self.title));
        }
        if self.instructions.is_empty() {
            return Err(format!("recipe \"{}\" has no instructions", self.title));
        }
        Ok(())
    }

    /// Searchable-text projection: title, description, ingredient names,
    /// and instruction steps joined into one lowercased document.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.title.as_str()];
        if let Some(ref description) = self.description {
            parts.push(description);
        }
        for ingredient in &self.ingredients {
            parts.push(&ingredient.name);
        }
        for step in &self.instructions {
            parts.push(step);
        }
        parts.join(" ").to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toast() -> Recipe {
        Recipe {
            title: "Toast".to_string(),
            description: None,
            ingredients: vec![Ingredient {
                name: "bread".to_string(),
                amount: 1.0,
                unit: "slice".to_string(),
                category: None,
            }],
            instructions: vec!["toast it".to_string()],
            prep_time_minutes: None,
            cook_time_minutes: None,
            servings: None,
            difficulty: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_validate_accepts_minimal_recipe() {
        assert!(toast().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut missing_title = toast();
        missing_title.title = "  ".to_string();
        assert!(missing_title.validate().is_err());

        let mut no_ingredients = toast();
        no_ingredients.ingredients.clear();
        assert!(no_ingredients.validate().unwrap_err().contains("ingredients"));

        let mut no_instructions = toast();
        no_instructions.instructions.clear();
        assert!(no_instructions
            .validate()
            .unwrap_err()
            .contains("instructions"));
    }

    #[test]
    fn test_search_text_projection() {
        let text = toast().search_text();
        assert!(text.contains("toast"));
        assert!(text.contains("bread"));
    }
}
