//! Webhook gateway to the external workflow engine
//!
//! Dispatches event envelopes and parses replies defensively. A webhook
//! failure never raises past the router boundary: `dispatch` always returns
//! text, falling back to the caller-supplied apology.

use crate::chat::Intent;
use crate::config::WebhookConfig;
use crate::error::{LadleError, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Event envelope sent to the workflow engine
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    pub event: String,
    pub timestamp: String,
    pub data: WebhookData,
    pub user: Option<WebhookUser>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookData {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Parsed webhook reply
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookReply {
    /// Reply text recovered from a recognized key or plain-text body
    Text(String),
    /// JSON body with none of the recognized keys; raw body kept
    Unparseable(String),
}

impl WebhookReply {
    /// Reply text, falling back to the raw body for unparseable replies
    pub fn into_text(self) -> String {
        match self {
            WebhookReply::Text(text) => text,
            WebhookReply::Unparseable(raw) => raw,
        }
    }
}

/// Recognized reply keys, probed in order
const REPLY_KEYS: &[&str] = &["content", "message", "output", "response"];

/// Parse a webhook response body.
///
/// Probes `content`, `message`, `output`, `response` in order on a JSON
/// body; a non-JSON body is taken as the reply text itself.
pub fn parse_reply(body: &str) -> WebhookReply {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            for key in REPLY_KEYS {
                if let Some(text) = json.get(key).and_then(Value::as_str) {
                    return WebhookReply::Text(text.to_string());
                }
            }
            WebhookReply::Unparseable(body.to_string())
        }
        Err(_) => WebhookReply::Text(body.to_string()),
    }
}

/// Dispatches events to the configured workflow engine
pub struct WebhookGateway {
    http_client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookGateway {
    /// Create from configuration (loaded once at startup, immutable)
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(LadleError::Http)?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.config.url.is_some()
    }

    /// Timeout for an event: extraction-class events get the long one
    fn timeout_for(&self, intent: Option<Intent>) -> Duration {
        match intent {
            Some(Intent::RecipeExtraction) => {
                Duration::from_secs(self.config.extraction_timeout_secs)
            }
            _ => Duration::from_secs(self.config.timeout_secs),
        }
    }

    /// Build an envelope with the current timestamp
    pub fn envelope(
        event: impl Into<String>,
        data: WebhookData,
        user: Option<WebhookUser>,
        metadata: Map<String, Value>,
    ) -> WebhookEvent {
        WebhookEvent {
            event: event.into(),
            timestamp: Utc::now().to_rfc3339(),
            data,
            user,
            metadata,
        }
    }

    /// Dispatch an event and await the reply text.
    ///
    /// Transport failures and timeouts return `apology`; they are logged
    /// but never propagated.
    pub async fn dispatch(&self, event: &WebhookEvent, apology: &str) -> String {
        let url = match self.config.url.as_deref() {
            Some(url) if self.config.enabled => url,
            _ => {
                tracing::warn!("webhook dispatch requested while gateway is disabled");
                return apology.to_string();
            }
        };

        let timeout = self.timeout_for(event.data.intent);

        let response = self
            .http_client
            .post(url)
            .timeout(timeout)
            .json(event)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("webhook call failed: {}", e);
                return apology.to_string();
            }
        };

        if !response.status().is_success() {
            tracing::warn!("webhook returned HTTP {}", response.status());
            return apology.to_string();
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("webhook body read failed: {}", e);
                return apology.to_string();
            }
        };

        match parse_reply(&body) {
            WebhookReply::Text(text) => text,
            WebhookReply::Unparseable(raw) => {
                tracing::warn!("webhook reply had no recognized key, using raw body");
                raw
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_probes_keys_in_order() {
        assert_eq!(
            parse_reply(r#"{"content": "a", "message": "b"}"#),
            WebhookReply::Text("a".to_string())
        );
        assert_eq!(
            parse_reply(r#"{"message": "b"}"#),
            WebhookReply::Text("b".to_string())
        );
        assert_eq!(
            parse_reply(r#"{"output": "c"}"#),
            WebhookReply::Text("c".to_string())
        );
        assert_eq!(
            parse_reply(r#"{"response": "d"}"#),
            WebhookReply::Text("d".to_string())
        );
    }

    #[test]
    fn test_parse_reply_plain_text_body() {
        assert_eq!(
            parse_reply("just some text"),
            WebhookReply::Text("just some text".to_string())
        );
    }

    #[test]
    fn test_parse_reply_unrecognized_json() {
        let body = r#"{"status": "ok"}"#;
        assert_eq!(parse_reply(body), WebhookReply::Unparseable(body.to_string()));
    }

    #[test]
    fn test_envelope_serializes_expected_shape() {
        let event = WebhookGateway::envelope(
            "chat_message",
            WebhookData {
                id: "m1".to_string(),
                content: "find chicken recipes".to_string(),
                kind: "text".to_string(),
                intent: Some(Intent::RagSearch),
                session_id: Some("s1".to_string()),
                context: None,
            },
            Some(WebhookUser {
                id: "u1".to_string(),
                email: None,
                name: Some("Sam".to_string()),
            }),
            Map::new(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "chat_message");
        assert_eq!(json["data"]["type"], "text");
        assert_eq!(json["data"]["intent"], "rag_search");
        assert_eq!(json["data"]["sessionId"], "s1");
        assert_eq!(json["user"]["id"], "u1");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_disabled_gateway_returns_apology() {
        let gateway = WebhookGateway::new(WebhookConfig {
            enabled: false,
            url: None,
            timeout_secs: 30,
            extraction_timeout_secs: 120,
        })
        .unwrap();
        assert!(!gateway.is_enabled());

        let event = WebhookGateway::envelope(
            "chat_message",
            WebhookData {
                id: "m1".to_string(),
                content: "hello".to_string(),
                kind: "text".to_string(),
                intent: None,
                session_id: None,
                context: None,
            },
            None,
            Map::new(),
        );

        let reply = gateway.dispatch(&event, "sorry").await;
        assert_eq!(reply, "sorry");
    }

    #[test]
    fn test_timeout_selection_by_intent() {
        let gateway = WebhookGateway::new(WebhookConfig {
            enabled: true,
            url: Some("http://localhost:1".to_string()),
            timeout_secs: 30,
            extraction_timeout_secs: 120,
        })
        .unwrap();

        assert_eq!(
            gateway.timeout_for(Some(Intent::RecipeExtraction)),
            Duration::from_secs(120)
        );
        assert_eq!(
            gateway.timeout_for(Some(Intent::RagSearch)),
            Duration::from_secs(30)
        );
        assert_eq!(gateway.timeout_for(None), Duration::from_secs(30));
    }
}
