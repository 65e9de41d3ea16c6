//! Core types for chat requests and replies.

use std::time::Duration;

use hearth_core::config::LlmSettings;
use hearth_core::emotion::EmotionVector;
use hearth_core::types::Role;
use serde::{Deserialize, Serialize};

/// Author of a chat-completion message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions.
    System,
    /// Human turn.
    User,
    /// Character turn.
    Assistant,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
            Role::System => Self::System,
        }
    }
}

/// One message of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// A message for a stored dialogue pair.
    #[must_use]
    pub fn from_pair(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// The model's reply under the emotion protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredReply {
    /// What the character says.
    pub utterance: String,
    /// The character's emotion after this turn.
    pub emotion: EmotionVector,
    /// Opaque action descriptors for downstream sinks.
    pub actions: Vec<serde_json::Value>,
}

impl StructuredReply {
    /// A reply carrying only text; used for plain mode and fallbacks.
    #[must_use]
    pub fn plain(utterance: impl Into<String>, emotion: EmotionVector) -> Self {
        Self {
            utterance: utterance.into(),
            emotion,
            actions: Vec::new(),
        }
    }
}

/// Endpoint, sampling, and retry settings for the client.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmClientConfig {
    /// API root, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per call (a value of 0 still makes one attempt).
    pub retry_max: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling.
    pub top_p: f32,
    /// Completion cap; 0 omits it from the request.
    pub max_tokens: u32,
    /// Presence penalty.
    pub presence_penalty: f32,
    /// Frequency penalty.
    pub frequency_penalty: f32,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for LlmClientConfig {
    fn from(s: &LlmSettings) -> Self {
        Self {
            base_url: s.base_url.trim_end_matches('/').to_string(),
            model: s.model.clone(),
            api_key: s.api_key.clone(),
            timeout: Duration::from_secs(s.timeout_sec.max(1)),
            retry_max: s.retry_max,
            temperature: s.temperature,
            top_p: s.top_p,
            max_tokens: s.max_tokens,
            presence_penalty: s.presence_penalty,
            frequency_penalty: s.frequency_penalty,
        }
    }
}

impl LlmClientConfig {
    /// Attempts actually made per call.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retry_max.max(1)
    }
}
