//! HTTP client for OpenAI-compatible inference services

use super::{ChatMessage, ChatModel, Embedder, ModelKind};
use crate::config::AiServiceConfig;
use crate::error::{LadleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{atomic::AtomicU64, Arc};
use std::time::{Duration, Instant};

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct ApiMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub avg_latency_ms: f64,
}

/// OpenAI-compatible chat + embeddings client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    config: AiServiceConfig,
    embedding_dimensions: usize,
    metrics: Arc<ApiMetrics>,
}

impl OpenAiClient {
    /// Create new client from configuration
    pub fn new(config: AiServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LadleError::Http)?;

        let embedding_dimensions = config.embedding_dimensions.unwrap_or(1536);

        Ok(Self {
            http_client,
            config,
            embedding_dimensions,
            metrics: Arc::new(ApiMetrics::default()),
        })
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        use std::sync::atomic::Ordering;

        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn record_error(&self) {
        use std::sync::atomic::Ordering;
        self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, start: Instant) {
        use std::sync::atomic::Ordering;
        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: ModelKind,
    ) -> Result<String> {
        use std::sync::atomic::Ordering;

        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: AssistantMessage,
        }

        #[derive(Deserialize)]
        struct AssistantMessage {
            content: String,
        }

        let request = ChatRequest {
            model: ChatModel::model_name(self, model).to_string(),
            messages,
            temperature: 0.7,
            max_tokens: 1024,
        };

        let url = format!("{}/v1/chat/completions", self.config.url);

        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(|e| {
            self.record_error();
            LadleError::Http(e)
        })?;

        if !response.status().is_success() {
            self.record_error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LadleError::ExternalService(format!(
                "chat completion error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            self.record_error();
            LadleError::Http(e)
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                self.record_error();
                LadleError::Llm("no response from model".to_string())
            })?
            .message
            .content;

        self.record_latency(start);
        Ok(content)
    }

    fn model_name(&self, model: ModelKind) -> &str {
        match model {
            ModelKind::Text => &self.config.model,
            ModelKind::Vision => &self.config.vision_model,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| LadleError::Llm("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::sync::atomic::Ordering;

        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct EmbedRequest {
            model: String,
            input: Vec<String>,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        let request = EmbedRequest {
            model: self.config.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let url = format!("{}/v1/embeddings", self.config.embeddings_url());

        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(|e| {
            self.record_error();
            LadleError::Http(e)
        })?;

        if !response.status().is_success() {
            self.record_error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LadleError::ExternalService(format!(
                "embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            self.record_error();
            LadleError::Http(e)
        })?;

        self.record_latency(start);
        Ok(embed_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.embedding_model
    }
}

/// Normalize an image attachment into a URL the provider accepts.
///
/// Data URLs and http(s) URLs pass through; a bare base64 payload is wrapped
/// as a JPEG data URL.
pub fn normalize_image_url(image: &str) -> String {
    use base64::Engine;

    let trimmed = image.trim();
    if trimmed.starts_with("data:") || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }
    if base64::engine::general_purpose::STANDARD
        .decode(trimmed)
        .is_ok()
    {
        return format!("data:image/jpeg;base64,{}", trimmed);
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_image_url_passthrough() {
        assert_eq!(
            normalize_image_url("https://example.com/pic.jpg"),
            "https://example.com/pic.jpg"
        );
        assert_eq!(
            normalize_image_url("data:image/png;base64,AAAA"),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_normalize_image_url_wraps_base64() {
        let wrapped = normalize_image_url("aGVsbG8=");
        assert!(wrapped.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_metrics_snapshot_starts_at_zero() {
        use crate::config::AiServiceConfig;

        let client = OpenAiClient::new(AiServiceConfig {
            api_key: Some("test-key".to_string()),
            ..AiServiceConfig::default()
        })
        .unwrap();
        let snapshot = client.metrics();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.total_errors, 0);
        assert_eq!(snapshot.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_multimodal_message_serializes_as_parts() {
        let message = ChatMessage::user_with_images("what is this?", &["data:image/png;base64,AA".to_string()]);
        let json = serde_json::to_value(&message).unwrap();
        assert!(json["content"].is_array());
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
    }
}
