//! HTTP client for OpenAI-compatible chat completion endpoints.
//!
//! Defaults target Groq (`https://api.groq.com/openai/v1`), but any
//! provider that speaks `/chat/completions` works. Structured calls use
//! JSON-object mode with the schema spelled out in a system message, then
//! check the reply against the schema locally.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::trait_def::GenerationClient;
use super::types::{ErrorKind, Generation, SchemaDescriptor};
use super::wire::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection and sampling settings for a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Settings with the default provider, model and sampling.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Errors constructing an [`OpenAiCompatClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("missing API key")]
    MissingApiKey,

    #[error("failed to build HTTP client")]
    Http(#[from] reqwest::Error),
}

/// [`GenerationClient`] backed by an OpenAI-compatible HTTP API.
pub struct OpenAiCompatClient {
    http: Client,
    config: ProviderConfig,
}

impl std::fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OpenAiCompatClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ClientBuildError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientBuildError::MissingApiKey);
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Send one chat completion and return the first choice's content.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, ErrorKind> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(self.config.temperature),
            max_tokens: self.config.max_tokens,
            response_format,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ErrorKind::RateLimited { retry_after });
        }

        if status >= 400 {
            let body = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(ErrorKind::Api {
                status,
                message: body,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ErrorKind::Transport(format!("failed to parse response: {e}")))?;

        if let Some(usage) = body.usage {
            debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion finished"
            );
        }

        if body.truncated() {
            warn!(model = %self.config.model, "completion stopped at the token limit");
        }

        body.text()
            .map(str::to_string)
            .ok_or(ErrorKind::EmptyResponse)
    }
}

#[async_trait]
impl GenerationClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn invoke(&self, prompt: &str) -> Generation<Value> {
        match self.complete(vec![ChatMessage::user(prompt)], None).await {
            Ok(text) => Generation::PlainText(text),
            Err(kind) => Generation::Error(kind),
        }
    }

    async fn invoke_structured(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Generation<Value> {
        let messages = vec![
            ChatMessage::system(structured_instructions(schema)),
            ChatMessage::user(prompt),
        ];
        let text = match self
            .complete(messages, Some(ResponseFormat::json_object()))
            .await
        {
            Ok(text) => text,
            Err(kind) => return Generation::Error(kind),
        };
        parse_structured(&text, schema).into()
    }
}

/// System message pinning the reply to `schema`.
fn structured_instructions(schema: &SchemaDescriptor) -> String {
    let rendered =
        serde_json::to_string_pretty(&schema.schema).unwrap_or_else(|_| schema.schema.to_string());
    format!(
        "Reply with exactly one JSON object that conforms to the JSON schema `{}` below. \
         Do not wrap it in markdown fences and do not add any other text.\n\n{}",
        schema.name, rendered
    )
}

/// Parse a model reply as JSON and check it against `schema`.
fn parse_structured(text: &str, schema: &SchemaDescriptor) -> Result<Value, ErrorKind> {
    let value: Value = serde_json::from_str(strip_json_fence(text))
        .map_err(|e| schema.violation(format!("reply is not valid JSON: {e}")))?;
    schema.check(&value)?;
    Ok(value)
}

/// Drop a surrounding ```` ```json ```` fence if the model added one anyway.
fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
