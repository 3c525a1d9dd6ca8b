//! Intent classification
//!
//! Maps a free-text (optionally multimodal) message to one of three routing
//! intents. Classification is fail-open: an assistant that cannot classify
//! still answers, so every failure degrades to general chat instead of
//! surfacing an error.

use crate::llm::{ChatMessage, ChatModel, ModelKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Confidence reported when classification degrades
pub const DEGRADED_CONFIDENCE: f64 = 0.5;

/// The closed set of routing intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    RecipeExtraction,
    RagSearch,
    GeneralChat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::RecipeExtraction => "recipe_extraction",
            Intent::RagSearch => "rag_search",
            Intent::GeneralChat => "general_chat",
        }
    }

    /// Parse an intent name, rejecting anything outside the closed set
    pub fn parse(value: &str) -> Option<Intent> {
        match value {
            "recipe_extraction" => Some(Intent::RecipeExtraction),
            "rag_search" => Some(Intent::RagSearch),
            "general_chat" => Some(Intent::GeneralChat),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the routing intent was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentSource {
    Manual,
    Ai,
}

/// Classification outcome
#[derive(Debug, Clone, Serialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub reason: String,
    pub confidence: f64,
}

const CLASSIFY_SYSTEM_PROMPT: &str = "\
You are an intent classifier for a cooking assistant. Classify the user's \
message into exactly one of three intents:\n\
- recipe_extraction: the user wants to SAVE a recipe they are providing \
(explicit save/add language, pasted recipe text, or a recipe photo)\n\
- rag_search: the user wants to FIND something in their own saved recipe \
collection (search/find/lookup language about their recipes)\n\
- general_chat: everything else (cooking questions, techniques, small talk)\n\
Respond ONLY with a JSON object: \
{\"intent\": \"...\", \"reason\": \"...\", \"confidence\": 0.0-1.0}";

/// Classifies messages with a constrained chat-completion prompt
pub struct IntentClassifier {
    client: Arc<dyn ChatModel>,
}

impl IntentClassifier {
    pub fn new(client: Arc<dyn ChatModel>) -> Self {
        Self { client }
    }

    /// Classify a message. Never fails: any upstream or parse failure
    /// degrades to `general_chat` with confidence 0.5.
    pub async fn classify(&self, message: &str, images: &[String]) -> IntentResult {
        let (user_message, model) = if images.is_empty() {
            (ChatMessage::user(message), ModelKind::Text)
        } else {
            (
                ChatMessage::user_with_images(message, images),
                ModelKind::Vision,
            )
        };

        let messages = vec![ChatMessage::system(CLASSIFY_SYSTEM_PROMPT), user_message];

        match self.client.chat_completion(messages, model).await {
            Ok(response) => parse_intent_response(&response),
            Err(e) => {
                tracing::warn!("intent classification failed, degrading to general_chat: {}", e);
                degraded(format!("classifier call failed: {}", e))
            }
        }
    }
}

fn degraded(reason: String) -> IntentResult {
    IntentResult {
        intent: Intent::GeneralChat,
        reason,
        confidence: DEGRADED_CONFIDENCE,
    }
}

/// Parse the classifier's JSON reply, degrading on anything malformed
fn parse_intent_response(response: &str) -> IntentResult {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            tracing::warn!("classifier returned no JSON, degrading to general_chat");
            return degraded("classifier returned no JSON object".to_string());
        }
    };

    let parsed: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("classifier JSON parse failed, degrading: {}", e);
            return degraded(format!("classifier JSON parse failed: {}", e));
        }
    };

    let intent = match parsed["intent"].as_str().and_then(Intent::parse) {
        Some(intent) => intent,
        None => {
            tracing::warn!("classifier returned unknown intent, degrading");
            return degraded(format!(
                "classifier returned unknown intent: {}",
                parsed["intent"]
            ));
        }
    };

    let reason = parsed["reason"]
        .as_str()
        .unwrap_or("no reason given")
        .to_string();
    let confidence = parsed["confidence"].as_f64().unwrap_or(0.8).clamp(0.0, 1.0);

    IntentResult {
        intent,
        reason,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let result = parse_intent_response(
            r#"{"intent": "recipe_extraction", "reason": "save language", "confidence": 0.93}"#,
        );
        assert_eq!(result.intent, Intent::RecipeExtraction);
        assert_eq!(result.reason, "save language");
        assert!((result.confidence - 0.93).abs() < 1e-9);
    }

    #[test]
    fn test_parse_response_in_code_fence() {
        let result = parse_intent_response(
            "```json\n{\"intent\": \"rag_search\", \"reason\": \"find\", \"confidence\": 0.8}\n```",
        );
        assert_eq!(result.intent, Intent::RagSearch);
    }

    #[test]
    fn test_unknown_intent_degrades() {
        let result = parse_intent_response(
            r#"{"intent": "meal_planning", "reason": "?", "confidence": 0.9}"#,
        );
        assert_eq!(result.intent, Intent::GeneralChat);
        assert_eq!(result.confidence, DEGRADED_CONFIDENCE);
    }

    #[test]
    fn test_garbage_degrades() {
        let result = parse_intent_response("I think this is about recipes");
        assert_eq!(result.intent, Intent::GeneralChat);
        assert_eq!(result.confidence, DEGRADED_CONFIDENCE);
    }

    #[test]
    fn test_confidence_clamped() {
        let result = parse_intent_response(
            r#"{"intent": "general_chat", "reason": "x", "confidence": 3.2}"#,
        );
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_intent_round_trip() {
        for intent in [Intent::RecipeExtraction, Intent::RagSearch, Intent::GeneralChat] {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
        }
        assert_eq!(Intent::parse("recipe"), None);
    }
}
