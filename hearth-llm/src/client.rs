//! LLM Client — OpenAI-compatible chat completion with retry.
//!
//! [`ChatBackend`] makes exactly one attempt; [`LlmClient`] layers the retry
//! policy and the two calling conventions (plain text and the structured
//! emotion protocol) on top of any backend.

use std::future::Future;
use std::time::{Duration, Instant};

use hearth_core::emotion::EmotionVector;
use hearth_core::types::Role;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::protocol::{self, ReplyDecode};
use crate::types::{ChatMessage, LlmClientConfig, StructuredReply};

/// Shortest wait between attempts.
pub const BACKOFF_MIN: Duration = Duration::from_millis(500);
/// Longest wait between attempts.
pub const BACKOFF_MAX: Duration = Duration::from_secs(4);

/// A chat-completion endpoint. One call is one attempt.
pub trait ChatBackend {
    /// Send `messages` and return the assistant text.
    fn complete(
        &self,
        messages: &[ChatMessage],
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Wait after the `attempt`-th failure (1-based): `0.5s × 2^(attempt-1)`,
/// clamped to [[`BACKOFF_MIN`], [`BACKOFF_MAX`]].
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    BACKOFF_MIN
        .saturating_mul(1u32 << exp)
        .clamp(BACKOFF_MIN, BACKOFF_MAX)
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// `POST <base_url>/chat/completions` against an OpenAI-compatible server
/// (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Debug, Clone)]
pub struct OpenAiChatBackend {
    http: Client,
    endpoint: String,
    config: LlmClientConfig,
}

impl OpenAiChatBackend {
    /// Build a backend with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the HTTP client cannot be built.
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    /// Full completion URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// JSON body for `messages`.
    #[must_use]
    pub fn request_body(&self, messages: &[ChatMessage]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "presence_penalty": self.config.presence_penalty,
            "frequency_penalty": self.config.frequency_penalty,
        });
        if self.config.max_tokens > 0 {
            body["max_tokens"] = json!(self.config.max_tokens);
        }
        body
    }

    fn classify(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.config.timeout.as_secs())
        } else {
            LlmError::from(err)
        }
    }
}

impl ChatBackend for OpenAiChatBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let start = Instant::now();
        let body = self.request_body(messages);

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, endpoint = %self.endpoint, "Chat completion returned an error status");
            return Err(LlmError::RequestFailed(format!("HTTP {status}: {detail}")));
        }

        let envelope: Value = resp.json().await.map_err(|e| self.classify(e))?;
        let message = &envelope["choices"][0]["message"];
        if !message.is_object() {
            return Err(LlmError::ParseError(
                "response has no choices[0].message".to_string(),
            ));
        }
        let content = message["content"].as_str().unwrap_or_default().trim().to_string();

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            chars = content.chars().count(),
            latency_ms = start.elapsed().as_millis(),
            "Chat completion finished"
        );
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Retrying chat client over a [`ChatBackend`].
#[derive(Debug, Clone)]
pub struct LlmClient<B> {
    backend: B,
    config: LlmClientConfig,
}

impl LlmClient<OpenAiChatBackend> {
    /// Client talking to an OpenAI-compatible server.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the HTTP client cannot be built.
    pub fn openai(config: LlmClientConfig) -> Result<Self, LlmError> {
        let backend = OpenAiChatBackend::new(config.clone())?;
        Ok(Self::new(backend, config))
    }
}

impl<B: ChatBackend> LlmClient<B> {
    /// Wrap `backend` with the retry policy from `config`.
    #[must_use]
    pub fn new(backend: B, config: LlmClientConfig) -> Self {
        Self { backend, config }
    }

    /// The wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    /// Send `messages`, retrying every error with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::RetriesExhausted`] wrapping the final attempt's
    /// error once all attempts have failed.
    pub async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let attempts = self.config.attempts();
        let mut attempt = 1;
        loop {
            match self.backend.complete(messages).await {
                Ok(text) => return Ok(text.trim().to_string()),
                Err(err) if attempt >= attempts => {
                    warn!(attempts, error = %err, "LLM call failed, giving up");
                    return Err(LlmError::RetriesExhausted {
                        attempts,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = backoff_delay(attempt);
                    debug!(
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "Retrying LLM call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Plain mode: the system prompt followed by the dialogue pairs.
    ///
    /// # Errors
    ///
    /// See [`LlmClient::invoke`].
    pub async fn chat(&self, system_prompt: &str, pairs: &[(Role, String)]) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(pairs.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(
            pairs
                .iter()
                .filter(|(role, _)| role.is_dialogue())
                .map(|(role, content)| ChatMessage::from_pair(*role, content.as_str())),
        );
        self.invoke(&messages).await
    }

    /// Structured mode, returning the raw decode so callers can tell a
    /// schema-conforming reply from a fallback.
    ///
    /// # Errors
    ///
    /// See [`LlmClient::invoke`]. A malformed reply is not an error.
    pub async fn chat_structured(
        &self,
        system_prompt: &str,
        pairs: &[(Role, String)],
        emotion: &EmotionVector,
    ) -> Result<ReplyDecode, LlmError> {
        let payload = protocol::input_payload(emotion, pairs);
        let messages = [
            ChatMessage::system(protocol::structured_system_prompt(system_prompt)),
            ChatMessage::user(payload.to_string()),
        ];
        let raw = self.invoke(&messages).await?;
        Ok(protocol::decode_reply(&raw))
    }

    /// Structured mode: persona prompt + emotion protocol, conversation and
    /// current emotion as a JSON payload.
    ///
    /// # Errors
    ///
    /// See [`LlmClient::invoke`]. A malformed reply falls back to the raw
    /// text with `emotion` unchanged.
    pub async fn chat_with_emotion(
        &self,
        system_prompt: &str,
        pairs: &[(Role, String)],
        emotion: &EmotionVector,
    ) -> Result<StructuredReply, LlmError> {
        let decoded = self.chat_structured(system_prompt, pairs, emotion).await?;
        Ok(decoded.into_reply(*emotion))
    }
}
