// llm-client-rs/src/client.rs
// HTTP client for OpenAI-compatible chat-completion backends.
//
// This module provides:
// - The `LlmBackend` trait the orchestrator programs against (and tests
//   substitute with scripted fakes)
// - `HttpLlmBackend`, a reqwest implementation carrying the internal
//   gateway's credential/correlation header set
// - Classification of HTTP failures into the `LlmError` taxonomy

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::ChatMessage;
use crate::config::BackendConfig;
use crate::error::LlmError;
use crate::usage::TokenUsage;

/// Content plus whatever usage metadata the backend chose to report.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// One chat-completion backend. Implementations must be stateless with
/// respect to conversations - the caller supplies the full message list
/// on every invocation.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Human-readable label used in logs ("LLM A", "LLM B").
    fn label(&self) -> &str;

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<LlmResponse, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    // f64 so the serialized value is exactly what the config holds; an
    // f32 would widen 0.1 into a long mantissa on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Real HTTP backend. Each instance binds one endpoint + model + header
/// set; the engine builds one for the primary and optionally one for the
/// reviewer.
pub struct HttpLlmBackend {
    label: String,
    client: Client,
    config: BackendConfig,
}

impl HttpLlmBackend {
    pub fn new(label: impl Into<String>, config: BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            label: label.into(),
            client,
            config,
        }
    }

    async fn execute_request(&self, messages: &[ChatMessage]) -> Result<LlmResponse, LlmError> {
        let request_body = ChatCompletionRequest {
            model: &self.config.model_name,
            messages,
            temperature: Some(self.config.temperature),
        };

        log::debug!(
            "{}: sending {} message(s) to {} (model: {})",
            self.label,
            messages.len(),
            self.config.api_base_url,
            self.config.model_name
        );

        // Fresh correlation IDs for every prompt/completion pair.
        let response = self
            .client
            .post(&self.config.api_base_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("x-dep-ticket", &self.config.credential_key)
            .header("Send-System-Name", &self.config.system_name)
            .header("User-ID", &self.config.user_id)
            .header("User-Type", "AD")
            .header("Prompt-Msg-Id", Uuid::new_v4().to_string())
            .header("Completion-Msg-Id", Uuid::new_v4().to_string())
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Network(format!("request timed out: {}", err))
                } else if err.is_connect() {
                    LlmError::Network(format!("connection failed: {}", err))
                } else {
                    LlmError::Network(format!("network error: {}", err))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 => LlmError::InvalidRequest(format!("bad request: {}", text)),
                401 => LlmError::InvalidRequest(format!("unauthorized: {}", text)),
                403 => LlmError::InvalidRequest(format!("forbidden: {}", text)),
                404 => LlmError::InvalidRequest(format!("not found: {}", text)),
                429 => LlmError::RateLimited(text),
                500 | 502 | 503 | 504 => {
                    LlmError::ServerError(format!("{}: {}", status, text))
                }
                _ => LlmError::ServerError(format!("unexpected status {}: {}", status, text)),
            });
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Parse(format!("failed to decode response body: {}", err)))?;

        let choice = data.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;

        let usage = data.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
            api_calls: 1,
        });

        if let Some(usage) = &usage {
            log::debug!(
                "{}: completed, {} total tokens",
                self.label,
                usage.total_tokens
            );
        }

        Ok(LlmResponse {
            content: choice.message.content,
            usage,
        })
    }
}

#[async_trait]
impl LlmBackend for HttpLlmBackend {
    fn label(&self) -> &str {
        &self.label
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<LlmResponse, LlmError> {
        self.execute_request(messages).await
    }
}
