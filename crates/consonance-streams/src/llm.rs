//! Generative backend implementations.
//!
//! Defines an enum-based dispatch for LLM backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible APIs (`OpenAI`, Venice,
//! `DeepSeek`, Ollama) and the Anthropic Messages API. All backends
//! communicate over HTTP via `reqwest`.
//!
//! Status mapping: HTTP 429 becomes [`StreamError::RateLimited`]; transport
//! failures, other non-2xx statuses, unparseable bodies and blank replies
//! become [`StreamError::Upstream`].

use consonance_core::config::{BackendKind, StreamBackendConfig};
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::StatusCode;

use crate::backend::GenerativeBackend;
use crate::error::StreamError;
use crate::prompt::RenderedPrompt;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// A generative backend reachable over HTTP.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Send a prompt and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::RateLimited`] on HTTP 429 and
    /// [`StreamError::Upstream`] for every other failure.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, StreamError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

impl GenerativeBackend for LlmBackend {
    fn name(&self) -> &str {
        Self::name(self)
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a RenderedPrompt,
    ) -> BoxFuture<'a, Result<String, StreamError>> {
        self.complete(prompt).boxed()
    }
}

/// Shared request parameters of both backends.
struct Endpoint {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl Endpoint {
    fn new(config: &StreamBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Map a non-success status to the matching stream error.
fn status_error(provider: &str, status: StatusCode, body: &str) -> StreamError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        StreamError::RateLimited(format!("{provider} returned {status}"))
    } else {
        StreamError::Upstream(format!("{provider} returned {status}: {body}"))
    }
}

/// Send a JSON request and return the parsed body of a 2xx reply.
async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, StreamError> {
    let response = request
        .send()
        .await
        .map_err(|e| StreamError::Upstream(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(status_error(provider, status, &error_body));
    }

    response
        .json()
        .await
        .map_err(|e| StreamError::Upstream(format!("{provider} response parse failed: {e}")))
}

/// Reject blank replies.
fn non_blank(provider: &str, text: String) -> Result<String, StreamError> {
    if text.trim().is_empty() {
        Err(StreamError::Upstream(format!("{provider} returned an empty reply")))
    } else {
        Ok(text)
    }
}

/// Chat messages for the conversation so far plus this turn.
fn chat_messages(prompt: &RenderedPrompt) -> Vec<serde_json::Value> {
    prompt
        .history
        .iter()
        .flat_map(|turn| {
            [
                serde_json::json!({"role": "user", "content": turn.user}),
                serde_json::json!({"role": "assistant", "content": turn.reply}),
            ]
        })
        .chain(std::iter::once(
            serde_json::json!({"role": "user", "content": prompt.user}),
        ))
        .collect()
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    endpoint: Endpoint,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &StreamBackendConfig) -> Self {
        Self {
            endpoint: Endpoint::new(config),
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, StreamError> {
        let ep = &self.endpoint;
        let url = format!("{}/chat/completions", ep.api_url);

        let mut messages = vec![serde_json::json!({"role": "system", "content": prompt.system})];
        messages.extend(chat_messages(prompt));

        let body = serde_json::json!({
            "model": ep.model,
            "messages": messages,
            "temperature": ep.temperature,
            "max_tokens": ep.max_tokens,
        });

        let request = ep
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", ep.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        let json = post_json("OpenAI", request).await?;
        non_blank("OpenAI", extract_openai_content(&json)?)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, StreamError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            StreamError::Upstream("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`:
/// - Uses `x-api-key` header instead of `Authorization: Bearer`
/// - Messages array does not include system (system is a top-level field)
/// - Response structure differs: `content[0].text`
pub struct AnthropicBackend {
    endpoint: Endpoint,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &StreamBackendConfig) -> Self {
        Self {
            endpoint: Endpoint::new(config),
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, StreamError> {
        let ep = &self.endpoint;
        let url = format!("{}/messages", ep.api_url);

        let body = serde_json::json!({
            "model": ep.model,
            "max_tokens": ep.max_tokens,
            "temperature": ep.temperature,
            "system": prompt.system,
            "messages": chat_messages(prompt),
        });

        let request = ep
            .client
            .post(&url)
            .header("x-api-key", &ep.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body);

        let json = post_json("Anthropic", request).await?;
        non_blank("Anthropic", extract_anthropic_content(&json)?)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, StreamError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            StreamError::Upstream("Anthropic response missing content[0].text".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a backend from one stream's configuration.
pub fn create_backend(config: &StreamBackendConfig) -> LlmBackend {
    match config.backend {
        BackendKind::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendKind::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
    }
}
