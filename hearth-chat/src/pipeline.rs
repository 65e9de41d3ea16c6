//! Turn Orchestrator — one user utterance in, one persisted reply out.
//!
//! ```text
//! user text ─► store + memory ─► character bundle ─► retrieval (lore, logs)
//!           ─► persona prompt ─► LLM (structured | plain) ─► store + memory
//!           ─► carried emotion ─► reply
//! ```
//!
//! Retrieval is best-effort: a failing log read is logged and skipped. Every
//! other failure aborts the turn, leaving the user message persisted and no
//! assistant message.

use hearth_core::character::{CharacterBundle, CharacterLibrary};
use hearth_core::config::HearthConfig;
use hearth_core::emotion::{EmotionVector, normalize};
use hearth_core::memory::{MemoryBudget, ShortTermMemory};
use hearth_core::prompt::{PromptMode, build_system_prompt};
use hearth_core::retrieval::{self, RetrievalHit};
use hearth_core::store::MessageStore;
use hearth_core::types::{Message, Role, Session, SessionId};
use hearth_llm::{ChatBackend, LlmClient, StructuredReply};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::TurnError;

/// Per-turn knobs taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSettings {
    /// Lore entries injected per turn.
    pub top_k_episodes: usize,
    /// Historical log lines injected per turn.
    pub top_k_log_messages: usize,
    /// How many stored messages the log retriever scans.
    pub log_scan_limit: usize,
    /// Use the JSON emotion protocol.
    pub structured_output: bool,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from(&HearthConfig::default())
    }
}

impl From<&HearthConfig> for TurnSettings {
    fn from(config: &HearthConfig) -> Self {
        Self {
            top_k_episodes: config.retrieval.top_k_episodes,
            top_k_log_messages: config.retrieval.top_k_log_messages,
            log_scan_limit: config.retrieval.log_scan_limit,
            structured_output: config.llm.structured_output,
        }
    }
}

/// A completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    /// Display name of the character who replied.
    pub speaker: String,
    /// What was said and felt.
    pub reply: StructuredReply,
}

/// Owns everything a turn touches.
#[derive(Debug)]
pub struct TurnPipeline<S, B> {
    store: S,
    llm: LlmClient<B>,
    characters: CharacterLibrary,
    memory: ShortTermMemory,
    settings: TurnSettings,
    emotion: EmotionVector,
}

impl<S: MessageStore, B: ChatBackend> TurnPipeline<S, B> {
    /// Assemble a pipeline with neutral emotion and empty memory.
    #[must_use]
    pub fn new(
        store: S,
        llm: LlmClient<B>,
        characters: CharacterLibrary,
        budget: MemoryBudget,
        settings: TurnSettings,
    ) -> Self {
        Self {
            store,
            llm,
            characters,
            memory: ShortTermMemory::new(budget),
            settings,
            emotion: EmotionVector::neutral(),
        }
    }

    /// The message store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The character library.
    #[must_use]
    pub fn characters(&self) -> &CharacterLibrary {
        &self.characters
    }

    /// The LLM client.
    #[must_use]
    pub fn llm(&self) -> &LlmClient<B> {
        &self.llm
    }

    /// Short-term memory.
    #[must_use]
    pub fn memory(&self) -> &ShortTermMemory {
        &self.memory
    }

    /// Emotion carried into the next turn.
    #[must_use]
    pub fn emotion(&self) -> EmotionVector {
        self.emotion
    }

    /// Current turn settings.
    #[must_use]
    pub fn settings(&self) -> TurnSettings {
        self.settings
    }

    /// Re-read budgets and turn settings after a configuration change.
    pub fn apply_config(&mut self, config: &HearthConfig) {
        self.memory.set_budget(config.memory.budget());
        self.settings = TurnSettings::from(config);
    }

    /// Hydrate memory and the carried emotion for `session` from the store.
    ///
    /// The emotion comes from the newest assistant message's metadata, or is
    /// neutral if there is none.
    ///
    /// # Errors
    ///
    /// Storage failures while reading history.
    pub fn restore(&mut self, session: &Session) -> hearth_core::error::Result<()> {
        let limit = self.memory.budget().max_messages().unwrap_or(usize::MAX);
        let history = self.store.fetch_recent_messages(session.id, limit)?;

        self.emotion = history
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .and_then(|m| m.meta.get("emotion"))
            .map_or_else(EmotionVector::neutral, normalize);

        info!(
            session = %session.id,
            character = %session.character_id,
            messages = history.len(),
            dominant = self.emotion.dominant(),
            "Session restored"
        );
        self.memory.load(session.id, history);
        Ok(())
    }

    /// Forget the session's short-term memory and return to neutral emotion.
    /// Stored messages are untouched.
    pub fn reset(&mut self, session_id: SessionId) {
        self.memory.clear(session_id);
        self.emotion = EmotionVector::neutral();
        info!(session = %session_id, "Short-term memory reset");
    }

    /// Run one turn for `user_text` in `session`.
    ///
    /// # Errors
    ///
    /// [`TurnError::Store`] if a message cannot be persisted,
    /// [`TurnError::Character`] if the bundle cannot be loaded,
    /// [`TurnError::Llm`] if the model call fails after retries.
    pub async fn run_turn(&mut self, session: &Session, user_text: &str) -> Result<TurnOutput, TurnError> {
        let user_message = Message::new(session.id, Role::User, user_text);
        self.store.add_message(&user_message).map_err(TurnError::Store)?;
        self.memory.add(user_message);

        let bundle = self
            .characters
            .load(&session.character_id)
            .map_err(TurnError::Character)?;

        let hits = self.retrieve(session.id, user_text, &bundle);
        let system_prompt = build_system_prompt(&bundle, &hits, PromptMode::Default);
        let pairs = self.memory.pairs(session.id);

        debug!(
            session = %session.id,
            hits = hits.len(),
            history = pairs.len(),
            prompt_chars = system_prompt.chars().count(),
            structured = self.settings.structured_output,
            "Invoking model"
        );

        let reply = if self.settings.structured_output {
            self.llm
                .chat_with_emotion(&system_prompt, &pairs, &self.emotion)
                .await?
        } else {
            let text = self.llm.chat(&system_prompt, &pairs).await?;
            StructuredReply::plain(text, self.emotion)
        };

        let mut meta = Map::new();
        meta.insert("emotion".into(), reply.emotion.to_value());
        meta.insert("actions".into(), Value::Array(reply.actions.clone()));
        let assistant_message =
            Message::new(session.id, Role::Assistant, reply.utterance.clone()).with_meta(meta);
        self.store
            .add_message(&assistant_message)
            .map_err(TurnError::Store)?;
        self.memory.add(assistant_message);
        self.emotion = reply.emotion;

        let speaker = bundle.name().unwrap_or_else(|| session.character_id.clone());
        Ok(TurnOutput { speaker, reply })
    }

    fn retrieve(&self, session_id: SessionId, query: &str, bundle: &CharacterBundle) -> Vec<RetrievalHit> {
        let mut hits = retrieval::retrieve_episodes(query, &bundle.episodes, self.settings.top_k_episodes);

        if self.settings.top_k_log_messages == 0 {
            return hits;
        }

        // The newest stored message is the one this turn just wrote.
        match self
            .store
            .fetch_recent_message_texts(session_id, self.settings.log_scan_limit.saturating_add(1))
        {
            Ok(texts) => {
                let older = texts.get(1..).unwrap_or_default();
                hits.extend(retrieval::retrieve_logs(query, older, self.settings.top_k_log_messages));
            }
            Err(err) => {
                warn!(session = %session_id, error = %err, "Log retrieval failed, continuing without it");
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = HearthConfig::default();
        config.retrieval.top_k_episodes = 9;
        config.llm.structured_output = false;
        let settings = TurnSettings::from(&config);
        assert_eq!(settings.top_k_episodes, 9);
        assert_eq!(settings.top_k_log_messages, 6);
        assert_eq!(settings.log_scan_limit, 200);
        assert!(!settings.structured_output);
    }
}
