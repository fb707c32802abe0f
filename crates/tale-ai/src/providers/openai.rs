//! OpenAI Chat Completions teller
//!
//! Works against any server speaking the `/chat/completions` streaming
//! protocol. Token counts use the chars/4 estimate.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use super::{RetryConfig, get_api_key};
use crate::{
    error::{Error, Result},
    overflow::is_context_overflow,
    prompt::Prompt,
    teller::{Teller, estimate_tokens},
    types::RoleNames,
};

/// The model a teller talks to and its size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatModel {
    /// Model identifier (e.g., "gpt-4o")
    pub id: String,
    /// Base URL for API calls
    pub base_url: String,
    /// Context window size in tokens
    pub context_window: usize,
    /// Tokens reserved for the completion
    pub max_output_tokens: usize,
}

impl ChatModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            context_window: 8192,
            max_output_tokens: 1024,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = tokens;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: usize) -> Self {
        self.max_output_tokens = tokens;
        self
    }
}

/// Teller backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiTeller {
    client: reqwest::Client,
    api_key: String,
    model: ChatModel,
    retry_config: RetryConfig,
}

impl OpenAiTeller {
    /// Create a teller with an API key
    pub fn new(api_key: impl Into<String>, model: ChatModel) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model,
            retry_config: RetryConfig::default(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable
    pub fn from_env(model: ChatModel) -> Result<Self> {
        let api_key = get_api_key(None, "OPENAI_API_KEY")?;
        Ok(Self::new(api_key, model))
    }

    /// Set retry configuration
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn model(&self) -> &ChatModel {
        &self.model
    }

    /// Reject prompts that cannot fit alongside the reserved completion
    fn check_fits(&self, prompt: &Prompt) -> Result<()> {
        let needed = self.size_of_prompt(prompt) + self.model.max_output_tokens;
        if needed > self.model.context_window {
            return Err(Error::ContextTooLarge(format!(
                "prompt needs {} tokens including {} for the reply, {} allows {}",
                needed, self.model.max_output_tokens, self.model.id, self.model.context_window
            )));
        }
        Ok(())
    }

    fn build_request(&self, prompt: &Prompt) -> ChatRequest {
        let roles = prompt.roles();
        ChatRequest {
            model: self.model.id.clone(),
            messages: prompt
                .iter()
                .map(|m| ChatMessage {
                    role: roles.name(m.role).to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: true,
            max_tokens: Some(self.model.max_output_tokens),
        }
    }

    async fn stream_once(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.model.base_url);
        let builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request);

        let mut source = EventSource::new(builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        let mut text = String::new();
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }
                    text.push_str(&chunk_text(&msg.data)?);
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    source.close();
                    let body = response.text().await.unwrap_or_default();
                    return Err(classify_status(status.as_u16(), &body));
                }
                Err(reqwest_eventsource::Error::Transport(e)) => {
                    source.close();
                    return Err(Error::Http(e));
                }
                Err(e) => {
                    source.close();
                    return Err(Error::Sse(e.to_string()));
                }
            }
        }
        source.close();

        Ok(text)
    }
}

#[async_trait]
impl Teller for OpenAiTeller {
    fn name(&self) -> &str {
        "openai"
    }

    fn roles(&self) -> RoleNames {
        RoleNames::default()
    }

    fn size_of(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.check_fits(prompt)?;
        let request = self.build_request(prompt);

        let mut attempt = 0u32;
        loop {
            match self.stream_once(&request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.retry_config.max_retries => {
                    let delay = self.retry_config.delay_for_attempt(attempt);
                    tracing::warn!(
                        "Request to {} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        self.model.id,
                        attempt + 1,
                        self.retry_config.max_retries + 1,
                        e,
                        delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Concatenate the text deltas of one streamed chunk
fn chunk_text(data: &str) -> Result<String> {
    if let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) {
        return Ok(chunk
            .choices
            .into_iter()
            .filter_map(|c| c.delta.content)
            .collect());
    }

    // Some compatible servers report failures in-band after a 200
    match serde_json::from_str::<ApiErrorBody>(data) {
        Ok(body) if is_context_overflow(&body.error.message) => {
            Err(Error::ContextTooLarge(body.error.message))
        }
        Ok(body) => Err(Error::Api {
            error_type: body
                .error
                .error_type
                .unwrap_or_else(|| "stream_error".to_string()),
            message: body.error.message,
        }),
        Err(_) => Err(Error::UnexpectedResponse(format!(
            "unrecognized stream chunk: {}",
            data
        ))),
    }
}

/// Map a non-success HTTP status and its body to an error
fn classify_status(status: u16, body: &str) -> Error {
    let (error_type, message) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => (
            parsed.error.error_type.unwrap_or_else(|| format!("http_{}", status)),
            parsed.error.message,
        ),
        Err(_) => (format!("http_{}", status), body.to_string()),
    };

    match status {
        429 if !is_context_overflow(&message) => Error::RateLimited { retry_after: None },
        401 | 403 => Error::Auth(message),
        413 => Error::ContextTooLarge(message),
        _ if is_context_overflow(&message) => Error::ContextTooLarge(message),
        _ => Error::Api {
            error_type,
            message,
        },
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}
