//! # hearth-llm — language model access for Hearth
//!
//! Talks to any OpenAI-compatible chat completion server (LM Studio,
//! llama.cpp server, vLLM, ...) and implements the structured emotion
//! protocol on top of it:
//!
//! ```text
//! persona prompt ─┐
//!                 ├─ system: persona + [Emotion Engine] rules
//! emotion + pairs ┴─ user:   {"emotion":{..},"conversation":[..],"instruction":"character_roleplay"}
//!                           │
//!                           ▼
//!        {"utterance":"..","emotion":{..},"actions":[..]}  →  ReplyDecode
//! ```
//!
//! Every call is retried with exponential backoff; replies that ignore the
//! schema degrade to plain text instead of failing.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{ChatBackend, LlmClient, OpenAiChatBackend, backoff_delay};
pub use error::LlmError;
pub use protocol::{ReplyDecode, decode_reply};
pub use types::{ChatMessage, ChatRole, LlmClientConfig, StructuredReply};
