//! Turn-level error type.

use hearth_core::HearthError;
use hearth_llm::LlmError;
use thiserror::Error;

/// Why a turn could not complete.
///
/// A failed turn never leaves a partial assistant message behind; the user
/// message may already be persisted.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The message store rejected a read or write.
    #[error("Store error: {0}")]
    Store(#[source] HearthError),

    /// The character bundle could not be loaded.
    #[error("Character error: {0}")]
    Character(#[source] HearthError),

    /// The language model call failed after retries.
    #[error("Model error: {0}")]
    Llm(#[from] LlmError),
}

impl TurnError {
    /// Whether the turn failed because the model did not answer in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_timeout())
    }
}
