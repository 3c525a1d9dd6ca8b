//! Recipe extraction
//!
//! Turns unstructured recipe text/images into a validated structured recipe
//! record. Validation failures are readable errors, never a partially
//! filled recipe. Extraction does not persist anything.

use crate::error::{LadleError, Result};
use crate::llm::{ChatMessage, ChatModel, ModelKind};
use crate::recipe::{Difficulty, Ingredient, Recipe};
use serde_json::Value;
use std::sync::Arc;

const EXTRACT_SYSTEM_PROMPT: &str = "\
You are a recipe extraction engine. Extract a structured recipe from the \
user's text and images. Respond ONLY with strict JSON shaped as \
{\"recipe\": {\"title\": string, \"description\": string|null, \
\"ingredients\": [{\"name\": string, \"amount\": number, \"unit\": string, \
\"category\": string|null}], \"instructions\": [string], \
\"prep_time_minutes\": number|null, \"cook_time_minutes\": number|null, \
\"servings\": number|null, \"difficulty\": \"easy\"|\"medium\"|\"hard\"|null, \
\"tags\": [string]}}. \
All amounts and times MUST be plain numbers (convert fractions like 1/2 to 0.5).";

/// Extracts structured recipes via the chat-completion client
pub struct RecipeExtractor {
    client: Arc<dyn ChatModel>,
}

impl RecipeExtractor {
    pub fn new(client: Arc<dyn ChatModel>) -> Self {
        Self { client }
    }

    /// Extract and validate a recipe from message text and images.
    ///
    /// Selects the vision model when images are present. Returns
    /// `LadleError::Extraction` with a readable reason on any invariant
    /// violation.
    pub async fn extract(&self, message: &str, images: &[String]) -> Result<Recipe> {
        let (user_message, model) = if images.is_empty() {
            (ChatMessage::user(message), ModelKind::Text)
        } else {
            (
                ChatMessage::user_with_images(message, images),
                ModelKind::Vision,
            )
        };

        let messages = vec![ChatMessage::system(EXTRACT_SYSTEM_PROMPT), user_message];

        let response = self
            .client
            .chat_completion(messages, model)
            .await
            .map_err(|e| LadleError::Extraction(format!("extraction call failed: {}", e)))?;

        parse_recipe_response(&response)
    }
}

/// Parse the model's JSON reply into a validated recipe.
///
/// Accepts either `{"recipe": {...}}` or a bare recipe object.
pub fn parse_recipe_response(response: &str) -> Result<Recipe> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            return Err(LadleError::Extraction(
                "the model did not return a recipe object".to_string(),
            ))
        }
    };

    let parsed: Value = serde_json::from_str(json_str)
        .map_err(|e| LadleError::Extraction(format!("recipe JSON parse failed: {}", e)))?;

    let recipe_value = parsed.get("recipe").unwrap_or(&parsed);
    let recipe = recipe_from_value(recipe_value)?;

    recipe.validate().map_err(LadleError::Extraction)?;
    Ok(recipe)
}

fn recipe_from_value(value: &Value) -> Result<Recipe> {
    let title = value["title"].as_str().unwrap_or_default().trim().to_string();
    let description = value["description"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let ingredients = value["ingredients"]
        .as_array()
        .map(|items| items.iter().filter_map(ingredient_from_value).collect())
        .unwrap_or_default();

    let instructions = value["instructions"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|step| step.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let difficulty = value["difficulty"].as_str().and_then(|d| {
        match d.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    });

    let tags = value["tags"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|t| t.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Recipe {
        title,
        description,
        ingredients,
        instructions,
        prep_time_minutes: coerce_u32(&value["prep_time_minutes"]),
        cook_time_minutes: coerce_u32(&value["cook_time_minutes"]),
        servings: coerce_u32(&value["servings"]),
        difficulty,
        tags,
    })
}

fn ingredient_from_value(value: &Value) -> Option<Ingredient> {
    let name = value["name"].as_str()?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some(Ingredient {
        name,
        amount: coerce_number(&value["amount"]).unwrap_or(1.0),
        unit: value["unit"].as_str().unwrap_or("").trim().to_string(),
        category: value["category"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

/// Coerce a JSON value to a number.
///
/// Handles plain numbers, numeric strings, vulgar fractions ("1/2"), and
/// mixed fractions ("1 1/2") so amounts never survive as strings.
pub fn coerce_number(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<f64>() {
        return Some(n);
    }
    parse_fraction(text)
}

fn coerce_u32(value: &Value) -> Option<u32> {
    coerce_number(value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u32)
}

fn parse_fraction(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    match parts.as_slice() {
        [fraction] => simple_fraction(fraction),
        [whole, fraction] => {
            let whole: f64 = whole.parse().ok()?;
            Some(whole + simple_fraction(fraction)?)
        }
        _ => None,
    }
}

fn simple_fraction(text: &str) -> Option<f64> {
    let (numerator, denominator) = text.split_once('/')?;
    let numerator: f64 = numerator.trim().parse().ok()?;
    let denominator: f64 = denominator.trim().parse().ok()?;
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_recipe() {
        let response = r#"{"recipe": {"title": "Toast", "ingredients": [{"name": "bread", "amount": 1, "unit": "slice"}], "instructions": ["toast it"]}}"#;
        let recipe = parse_recipe_response(response).unwrap();
        assert_eq!(recipe.title, "Toast");
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.instructions, vec!["toast it"]);
    }

    #[test]
    fn test_parse_bare_recipe() {
        let response = r#"{"title": "Tea", "ingredients": [{"name": "tea bag", "amount": "1", "unit": ""}], "instructions": ["steep"]}"#;
        let recipe = parse_recipe_response(response).unwrap();
        assert_eq!(recipe.title, "Tea");
        assert_eq!(recipe.ingredients[0].amount, 1.0);
    }

    #[test]
    fn test_missing_title_is_error() {
        let response = r#"{"recipe": {"title": "", "ingredients": [{"name": "x", "amount": 1, "unit": ""}], "instructions": ["y"]}}"#;
        let err = parse_recipe_response(response).unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_empty_ingredients_is_error() {
        let response =
            r#"{"recipe": {"title": "Soup", "ingredients": [], "instructions": ["boil"]}}"#;
        assert!(parse_recipe_response(response).is_err());
    }

    #[test]
    fn test_empty_instructions_is_error() {
        let response = r#"{"recipe": {"title": "Soup", "ingredients": [{"name": "water", "amount": 1, "unit": "l"}], "instructions": []}}"#;
        assert!(parse_recipe_response(response).is_err());
    }

    #[test]
    fn test_non_json_is_error() {
        assert!(parse_recipe_response("Sure! Here is your recipe...").is_err());
    }

    #[test]
    fn test_coerce_number_variants() {
        assert_eq!(coerce_number(&serde_json::json!(2.5)), Some(2.5));
        assert_eq!(coerce_number(&serde_json::json!("2.5")), Some(2.5));
        assert_eq!(coerce_number(&serde_json::json!("1/2")), Some(0.5));
        assert_eq!(coerce_number(&serde_json::json!("1 1/2")), Some(1.5));
        assert_eq!(coerce_number(&serde_json::json!("3/0")), None);
        assert_eq!(coerce_number(&serde_json::json!("a pinch")), None);
        assert_eq!(coerce_number(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_times_coerced_from_strings() {
        let response = r#"{"recipe": {"title": "Stew", "ingredients": [{"name": "beef", "amount": "1 1/2", "unit": "lb"}], "instructions": ["simmer"], "prep_time_minutes": "15", "cook_time_minutes": 90, "servings": "4"}}"#;
        let recipe = parse_recipe_response(response).unwrap();
        assert_eq!(recipe.ingredients[0].amount, 1.5);
        assert_eq!(recipe.prep_time_minutes, Some(15));
        assert_eq!(recipe.cook_time_minutes, Some(90));
        assert_eq!(recipe.servings, Some(4));
    }

    #[test]
    fn test_difficulty_parsed_case_insensitive() {
        let response = r#"{"recipe": {"title": "Bread", "ingredients": [{"name": "flour", "amount": 500, "unit": "g"}], "instructions": ["bake"], "difficulty": "Medium"}}"#;
        let recipe = parse_recipe_response(response).unwrap();
        assert_eq!(recipe.difficulty, Some(Difficulty::Medium));
    }
}
