//! OpenAI Collaborator Backend
//!
//! Implements `AnalysisProvider`, `EmbeddingProvider`, and
//! `GenerationProvider` against the OpenAI HTTP API using reqwest.
//!
//! ## API Details
//!
//! - Chat: `POST {base_url}/chat/completions` with
//!   `response_format: {"type": "json_object"}` so the model returns a JSON
//!   document; the content is parsed after stripping any stray code fences.
//! - Embeddings: `POST {base_url}/embeddings` with
//!   `{ model, input, dimensions }`; results are re-sorted by `index` to
//!   preserve input order.
//!
//! Works with any OpenAI-compatible API (Azure, vLLM, LiteLLM) via the
//! `base_url` configuration option.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scopecast_core::ProjectRequirement;

use crate::provider::{
    AnalysisProvider, EmbeddingProvider, GenerationContext, GenerationProvider, ProviderError,
    ProviderResult, RawAnalysis,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default OpenAI API base URL.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Default chat model for analysis and generation.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension for text-embedding-3-small.
const DEFAULT_DIMENSION: usize = 1536;

const ANALYSIS_SYSTEM_MESSAGE: &str = "\
You are an experienced software architect. Analyze project requirements \
thoroughly and extract structured information.

Platform selection rules:
1. Mobile App / Android / iOS -> \"Mobile\"
2. Web application for end users -> \"Web\"
3. Admin dashboard / admin panel / management console -> \"Admin\" \
(never \"Web\" for admin surfaces)
4. Backend / web service -> \"API\"

Return only valid JSON with keys: domain, features, tech_stack, platforms, \
initial_epics, epic_categories, user_types, special_requirements.";

const GENERATION_SYSTEM_MESSAGE: &str = "\
You are an experienced delivery estimator. Your task has two parts:
1. Adapt the provided retrieved epics to the current project. Keep epic \
names and task descriptions exactly as they are; only adapt platforms \
and hours.
2. Generate new epics for features the retrieved set does not cover. \
User-specific epics are named \"Feature - UserType\".

Rules:
- Only use the platforms listed in the request.
- Hours are positive integers; omit a platform instead of writing 0.
- Do not repeat any epic name from the existing list.

Return only valid JSON: {\"modified_epics\": [...], \"custom_epics\": \
[...]} where each epic is {\"name\", \"description\", \"tasks\": \
[{\"description\", \"efforts\": {platform: hours}}]}.";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key. Required against the real API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Chat model used for analysis and generation.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// API base URL (no trailing slash). Override for compatible APIs.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Embedding dimension.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_base_url() -> String {
    OPENAI_API_BASE.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            base_url: default_base_url(),
            dimension: default_dimension(),
        }
    }
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// OpenAI-backed collaborator implementing analysis, embedding, and
/// generation.
///
/// # Thread Safety
///
/// `Send + Sync`: the reqwest `Client` is internally arc'd and all other
/// fields are immutable after construction.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn api_key(&self) -> ProviderResult<&str> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ProviderError::AuthenticationFailed {
                message: "OpenAI API key is not configured".to_string(),
            }),
        }
    }

    /// Send an authenticated POST and return the raw response body on 200.
    async fn post_json(&self, endpoint: &str, body: &serde_json::Value) -> ProviderResult<String> {
        let key = self.api_key()?;
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        if status == 200 {
            response.text().await.map_err(|e| ProviderError::NetworkError {
                message: format!("failed to read response body: {}", e),
            })
        } else {
            let body_text = response.text().await.unwrap_or_default();
            Err(self.map_http_error(status, &body_text))
        }
    }

    /// Run a chat completion and parse the returned content as JSON.
    async fn chat_json(
        &self,
        system_message: &str,
        prompt: &str,
    ) -> ProviderResult<serde_json::Value> {
        let body = serde_json::json!({
            "model": self.config.chat_model,
            "messages": [
                {"role": "system", "content": system_message},
                {"role": "user", "content": prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        let text = self.post_json("chat/completions", &body).await?;
        let response: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::ParseError {
                message: format!("failed to parse chat completion response: {}", e),
            })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::parse("chat completion returned no content"))?;

        parse_json_content(&content)
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> ProviderError {
        let msg = err.to_string();
        if err.is_connect() {
            ProviderError::ProviderUnavailable {
                message: format!(
                    "cannot connect to OpenAI API at {}: {}",
                    self.config.base_url, msg
                ),
            }
        } else if err.is_timeout() {
            ProviderError::NetworkError {
                message: format!("request to OpenAI API timed out: {}", msg),
            }
        } else {
            ProviderError::NetworkError { message: msg }
        }
    }

    fn map_http_error(&self, status: u16, body_text: &str) -> ProviderError {
        let detail = serde_json::from_str::<ApiErrorResponse>(body_text)
            .ok()
            .and_then(|r| r.error);
        let message = detail
            .as_ref()
            .and_then(|d| d.message.as_deref())
            .unwrap_or(body_text);

        match status {
            401 => ProviderError::AuthenticationFailed {
                message: format!("OpenAI authentication failed: {}", message),
            },
            429 => ProviderError::RateLimited {
                message: format!("OpenAI rate limit exceeded: {}", message),
                retry_after: None,
            },
            400..=499 => ProviderError::InvalidConfig {
                message: format!("OpenAI bad request (HTTP {}): {}", status, message),
            },
            _ => ProviderError::ServerError {
                message: format!("OpenAI server error (HTTP {}): {}", status, message),
                status: Some(status),
            },
        }
    }
}

/// Parse a chat-completion content string as a JSON document.
///
/// Models occasionally wrap JSON in markdown code fences even when asked
/// not to; strip them before parsing.
fn parse_json_content(content: &str) -> ProviderResult<serde_json::Value> {
    let trimmed = content.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(stripped).map_err(|e| ProviderError::ParseError {
        message: format!("collaborator returned invalid JSON: {}", e),
    })
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl AnalysisProvider for OpenAiClient {
    async fn analyze(&self, requirement: &ProjectRequirement) -> ProviderResult<RawAnalysis> {
        let prompt = format!(
            "Analyze this project requirement:\n\n{}",
            requirement.combined_text()
        );

        debug!(model = %self.config.chat_model, "requesting requirement analysis");
        let value = self.chat_json(ANALYSIS_SYSTEM_MESSAGE, &prompt).await?;

        serde_json::from_value(value).map_err(|e| ProviderError::ParseError {
            message: format!("analysis response did not match expected shape: {}", e),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiClient {
    async fn generate_epics(
        &self,
        context: &GenerationContext,
    ) -> ProviderResult<serde_json::Value> {
        let prompt = serde_json::to_string_pretty(context).map_err(|e| {
            ProviderError::other(format!("failed to serialize generation context: {}", e))
        })?;

        debug!(
            model = %self.config.chat_model,
            target = context.target_count,
            "requesting epic generation"
        );
        self.chat_json(GENERATION_SYSTEM_MESSAGE, &prompt).await
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed_documents(&self, documents: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.config.embedding_model,
            "input": documents,
            "dimensions": self.config.dimension,
        });

        let text = self.post_json("embeddings", &body).await?;
        let response: EmbeddingResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::ParseError {
                message: format!("failed to parse embedding response: {}", e),
            })?;

        if response.data.len() != documents.len() {
            warn!(
                expected = documents.len(),
                got = response.data.len(),
                "embedding count mismatch"
            );
            return Err(ProviderError::ParseError {
                message: format!(
                    "expected {} embeddings but OpenAI returned {}",
                    documents.len(),
                    response.data.len()
                ),
            });
        }

        // Sort by index to preserve input order.
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_key() -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig {
            api_key: Some("sk-test-key".to_string()),
            ..OpenAiConfig::default()
        })
    }

    fn client_without_key() -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig::default())
    }

    // =====================================================================
    // Configuration tests
    // =====================================================================

    #[test]
    fn config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.dimension, 1536);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let config: OpenAiConfig =
            serde_json::from_str(r#"{"api_key": "sk-abc", "dimension": 512}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-abc"));
        assert_eq!(config.dimension, 512);
        assert_eq!(config.chat_model, "gpt-4o-mini");
    }

    // =====================================================================
    // Content parsing tests
    // =====================================================================

    #[test]
    fn parse_json_content_plain() {
        let value = parse_json_content(r#"{"domain": "e-commerce"}"#).unwrap();
        assert_eq!(value["domain"], "e-commerce");
    }

    #[test]
    fn parse_json_content_strips_code_fences() {
        let value = parse_json_content("```json\n{\"domain\": \"logistics\"}\n```").unwrap();
        assert_eq!(value["domain"], "logistics");

        let value = parse_json_content("```\n{\"epics\": []}\n```").unwrap();
        assert!(value["epics"].as_array().unwrap().is_empty());
    }

    #[test]
    fn parse_json_content_rejects_garbage() {
        let result = parse_json_content("I cannot produce JSON today");
        assert!(matches!(
            result.unwrap_err(),
            ProviderError::ParseError { .. }
        ));
    }

    // =====================================================================
    // Error mapping tests
    // =====================================================================

    #[test]
    fn map_http_error_401_auth_failed() {
        let client = client_with_key();
        let err = client.map_http_error(401, r#"{"error":{"message":"Invalid API key"}}"#);
        assert!(matches!(err, ProviderError::AuthenticationFailed { .. }));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn map_http_error_429_rate_limited() {
        let client = client_with_key();
        let err = client.map_http_error(429, r#"{"error":{"message":"Rate limit exceeded"}}"#);
        assert!(matches!(err, ProviderError::RateLimited { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn map_http_error_500_is_retryable() {
        let client = client_with_key();
        let err = client.map_http_error(500, "internal");
        assert!(matches!(
            err,
            ProviderError::ServerError {
                status: Some(500),
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn map_http_error_unparseable_body_uses_raw_text() {
        let client = client_with_key();
        let err = client.map_http_error(400, "not json at all");
        assert!(err.to_string().contains("not json at all"));
    }

    // =====================================================================
    // Async operation tests (no real HTTP calls)
    // =====================================================================

    #[tokio::test]
    async fn embed_documents_empty_returns_empty() {
        let client = client_with_key();
        let result = client.embed_documents(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn analyze_without_api_key_fails() {
        let client = client_without_key();
        let requirement = ProjectRequirement::new("Shop", "marketplace");
        let result = client.analyze(&requirement).await;
        assert!(matches!(
            result.unwrap_err(),
            ProviderError::AuthenticationFailed { .. }
        ));
    }

    #[tokio::test]
    async fn embed_query_without_api_key_fails() {
        let client = client_without_key();
        let result = client.embed_query("checkout flow").await;
        assert!(matches!(
            result.unwrap_err(),
            ProviderError::AuthenticationFailed { .. }
        ));
    }

    // =====================================================================
    // Trait object tests
    // =====================================================================

    #[test]
    fn client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OpenAiClient>();
    }

    #[test]
    fn client_usable_as_trait_objects() {
        let client = client_with_key();
        let _analysis: &dyn AnalysisProvider = &client;
        let _embedding: &dyn EmbeddingProvider = &client;
        let _generation: &dyn GenerationProvider = &client;
    }
}
