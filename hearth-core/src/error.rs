//! Error types for the Hearth core library.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Hearth core operations.
#[derive(Error, Debug)]
pub enum HearthError {
    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be parsed or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required character document does not exist.
    #[error("Character document missing: {}", path.display())]
    CharacterMissing {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// A character document exists but cannot be used.
    #[error("Character document malformed: {} ({reason})", path.display())]
    CharacterMalformed {
        /// Offending document.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// `/config set` named a key outside the known setting set.
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// A setting value failed validation.
    #[error("Invalid value for {key}: {reason}")]
    InvalidSetting {
        /// Setting that was being updated.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, HearthError>;
