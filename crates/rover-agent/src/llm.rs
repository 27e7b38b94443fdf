//! OpenAI-compatible chat-completion client.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

const MAX_RETRIES: u32 = 3;

/// Connection and sampling settings for the model.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    /// Base URL without trailing slash, e.g. "https://api.openai.com/v1".
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Token counts reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Text of the first choice plus usage.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

/// Chat model bound to one endpoint and model name.
#[derive(Clone)]
pub struct ChatModel {
    http: Client,
    config: LlmConfig,
}

impl ChatModel {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Llm("API key is empty".into()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Request body asking for a single JSON object answer.
    pub fn request_body(&self, messages: &[Value]) -> Value {
        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "response_format": { "type": "json_object" },
        })
    }

    /// Send `messages` and return the first choice.
    pub async fn complete(&self, messages: &[Value]) -> Result<Completion> {
        let body = self.request_body(messages);
        let resp = self.post_with_retry(&body).await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("{} from {}: {}", status, self.config.endpoint(), text)));
        }
        let json: Value = resp.json().await?;
        parse_completion(&json)
    }

    /// Retries network errors, 429 and 5xx with exponential backoff (1s, 2s, 4s).
    async fn post_with_retry(&self, body: &Value) -> Result<reqwest::Response> {
        let url = self.config.endpoint();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let sent = self
                .http
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(body)
                .send()
                .await;

            let retryable = match &sent {
                Ok(resp) => is_retryable(resp.status()),
                Err(_) => true,
            };
            let delay = match retry_delay(attempt) {
                Some(delay) if retryable => delay,
                _ => return Ok(sent?),
            };
            match &sent {
                Ok(resp) => warn!(
                    "LLM returned {} (attempt {}/{}), retrying in {:?}",
                    resp.status(),
                    attempt,
                    MAX_RETRIES,
                    delay
                ),
                Err(e) => warn!(
                    "LLM network error (attempt {}/{}): {}, retrying in {:?}",
                    attempt, MAX_RETRIES, e, delay
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }
}

/// Pause before the next try after failed attempt number `attempt` (1-based),
/// or `None` once the retries are used up.
fn retry_delay(attempt: u32) -> Option<Duration> {
    if attempt == 0 || attempt > MAX_RETRIES {
        return None;
    }
    Some(Duration::from_secs(1) * 2u32.pow(attempt - 1))
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Extract the first choice from a chat-completion response.
pub fn parse_completion(json: &Value) -> Result<Completion> {
    if let Some(err) = json.get("error") {
        return Err(Error::Llm(format!("API error: {}", err)));
    }
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::Llm("completion has no content".into()))?
        .to_string();
    let usage = Usage {
        prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0),
    };
    debug!(
        "completion: {} chars, {} prompt / {} completion tokens",
        content.len(),
        usage.prompt_tokens,
        usage.completion_tokens
    );
    Ok(Completion { content, usage })
}
