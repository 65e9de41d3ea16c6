//! Core type definitions for the Hearth conversation pipeline.
//!
//! Sessions and messages are plain serializable records; persistence lives in
//! [`crate::store`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Create a new random message ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The character.
    Assistant,
    /// Out-of-band notes; never sent to the model as history.
    System,
}

impl Role {
    /// Wire/storage name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Whether this role takes part in the dialogue history.
    #[must_use]
    pub fn is_dialogue(self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("unknown role: '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Session / Message
// ---------------------------------------------------------------------------

/// A conversation with one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Directory name of the character this session talks to.
    pub character_id: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When a message was last appended.
    pub updated_at: DateTime<Utc>,
    /// Optional human-readable title.
    pub title: Option<String>,
}

impl Session {
    /// Start a fresh session for `character_id`.
    #[must_use]
    pub fn new(character_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            character_id: character_id.into(),
            created_at: now,
            updated_at: now,
            title: None,
        }
    }
}

/// One immutable entry in a session's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Owning session.
    pub session_id: SessionId,
    /// Author role.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Free-form metadata (`emotion` and `actions` for assistant replies).
    pub meta: serde_json::Map<String, serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message with empty metadata.
    #[must_use]
    pub fn new(session_id: SessionId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            role,
            content: content.into(),
            meta: serde_json::Map::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: serde_json::Map<String, serde_json::Value>) -> Self {
        self.meta = meta;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Assistant, Role::System] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("tool".parse::<Role>().is_err());
    }

    #[test]
    fn role_feeds_log_retrieval_directly() {
        let logs = vec![(Role::Assistant, "I drink green tea".to_string())];
        let hits = crate::retrieval::retrieve_logs("which tea", &logs, 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "log:assistant");
        assert_eq!(Role::User.as_ref(), "user");
    }

    #[test]
    fn only_user_and_assistant_are_dialogue() {
        assert!(Role::User.is_dialogue());
        assert!(Role::Assistant.is_dialogue());
        assert!(!Role::System.is_dialogue());
    }

    #[test]
    fn new_session_has_matching_timestamps() {
        let s = Session::new("tokina");
        assert_eq!(s.created_at, s.updated_at);
        assert_eq!(s.character_id, "tokina");
        assert!(s.title.is_none());
    }
}
