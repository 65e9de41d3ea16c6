//! # Hearth Core Library
//!
//! The network-free half of a character-grounded chat pipeline:
//!
//! - **Emotion** — the 8-dimension emotion vector carried between turns
//! - **Memory** — session-scoped short-term dialogue memory with budgets
//! - **Retrieval** — lexical recall over character lore and chat logs
//! - **Prompt** — deterministic persona prompt assembly
//! - **Character** — loading persona documents from disk
//! - **Store** — SQLite persistence for sessions and messages
//! - **Config** — typed `hearth.toml` configuration
//!
//! Everything here is synchronous; the model client lives in `hearth-llm`
//! and the turn pipeline that ties both together in `hearth-chat`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod character;
pub mod config;
mod doc;
pub mod emotion;
pub mod error;
pub mod memory;
pub mod prompt;
pub mod retrieval;
pub mod store;
pub mod types;

pub use character::{CharacterBundle, CharacterLibrary};
pub use config::{HearthConfig, SettingKey};
pub use emotion::EmotionVector;
pub use error::HearthError;
pub use memory::{MemoryBudget, ShortTermMemory};
pub use prompt::{PromptMode, build_system_prompt};
pub use retrieval::RetrievalHit;
pub use store::{MessageStore, SqliteStore};
pub use types::*;
