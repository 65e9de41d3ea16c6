//! SQLite message/session store.
//!
//! Two tables, one row per session and one per message:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS sessions (
//!     session_id   TEXT PRIMARY KEY,
//!     character_id TEXT NOT NULL,
//!     title        TEXT,
//!     created_at   TEXT NOT NULL,
//!     updated_at   TEXT NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS messages (
//!     message_id TEXT PRIMARY KEY,
//!     session_id TEXT NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
//!     role       TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
//!     content    TEXT NOT NULL,
//!     meta_json  TEXT NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//! ```
//!
//! Timestamps are fixed-width RFC 3339 (microseconds, `Z`), so lexical
//! order is chronological. Ties fall back to `rowid`, i.e. insertion order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{HearthError, Result};
use crate::types::{Message, MessageId, Role, Session, SessionId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    session_id   TEXT PRIMARY KEY,
    character_id TEXT NOT NULL,
    title        TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    message_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
    role       TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
    content    TEXT NOT NULL,
    meta_json  TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at);
";

/// Durable storage for sessions and their messages.
///
/// The turn pipeline is generic over this trait so tests can substitute an
/// in-memory database or a failing store.
pub trait MessageStore {
    /// Insert or update a session row.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn upsert_session(&self, session: &Session) -> Result<()>;

    /// The most recently updated session, if any.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn get_latest_session(&self) -> Result<Option<Session>>;

    /// Append a message and bump its session's `updated_at`.
    ///
    /// # Errors
    ///
    /// Storage failures, including a missing owning session.
    fn add_message(&self, message: &Message) -> Result<()>;

    /// Up to `limit` newest messages of a session, returned oldest-first.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn fetch_recent_messages(&self, session_id: SessionId, limit: usize) -> Result<Vec<Message>>;

    /// Up to `limit` newest `(role, content)` pairs, returned newest-first.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn fetch_recent_message_texts(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<(Role, String)>>;

    /// Delete a session and, by cascade, its messages.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn delete_session(&self, session_id: SessionId) -> Result<bool>;

    /// Evict the oldest-created sessions until at most `max` remain.
    /// `max == 0` disables eviction. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn enforce_max_sessions(&self, max: usize) -> Result<usize>;
}

/// [`MessageStore`] backed by a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories
    /// and the schema as needed.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Io`] if the parent directory cannot be created
    /// and [`HearthError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        Self::init(&conn)?;

        info!(path = %db_path.display(), "Message store opened");
        Ok(Self { conn, db_path })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Path of the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Number of stored sessions.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on SQLite failures.
    pub fn session_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Number of stored messages in `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on SQLite failures.
    pub fn message_count(&self, session_id: SessionId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Load a single session by id.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Database`] on SQLite failures and
    /// [`HearthError::Serialization`] on a corrupt row.
    pub fn get_session(&self, session_id: SessionId) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT session_id, character_id, title, created_at, updated_at
             FROM sessions WHERE session_id = ?1",
        )?;
        let row = stmt
            .query_row(params![session_id.to_string()], SessionRow::from_row)
            .optional()?;
        row.map(SessionRow::into_session).transpose()
    }
}

impl MessageStore for SqliteStore {
    fn upsert_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (session_id, character_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(session_id) DO UPDATE SET
                character_id = excluded.character_id,
                title = excluded.title,
                updated_at = excluded.updated_at",
            params![
                session.id.to_string(),
                session.character_id,
                session.title,
                timestamp(&session.created_at),
                timestamp(&session.updated_at),
            ],
        )?;
        debug!(session = %session.id, character = %session.character_id, "Upserted session");
        Ok(())
    }

    fn get_latest_session(&self) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT session_id, character_id, title, created_at, updated_at
             FROM sessions ORDER BY updated_at DESC, rowid DESC LIMIT 1",
        )?;
        let row = stmt.query_row([], SessionRow::from_row).optional()?;
        row.map(SessionRow::into_session).transpose()
    }

    fn add_message(&self, message: &Message) -> Result<()> {
        let meta = serde_json::to_string(&message.meta)
            .map_err(|e| HearthError::Serialization(e.to_string()))?;
        let created = timestamp(&message.created_at);
        let session = message.session_id.to_string();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO messages (message_id, session_id, role, content, meta_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                session,
                message.role.as_str(),
                message.content,
                meta,
                created,
            ],
        )?;
        tx.execute(
            "UPDATE sessions SET updated_at = ?2 WHERE session_id = ?1",
            params![session, created],
        )?;
        tx.commit()?;

        debug!(
            session = %message.session_id,
            role = %message.role,
            chars = message.content.chars().count(),
            "Stored message"
        );
        Ok(())
    }

    fn fetch_recent_messages(&self, session_id: SessionId, limit: usize) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT message_id, session_id, role, content, meta_json, created_at
             FROM messages WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![session_id.to_string(), sql_limit(limit)], MessageRow::from_row)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?.into_message()?);
        }
        messages.reverse();
        Ok(messages)
    }

    fn fetch_recent_message_texts(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<(Role, String)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT role, content FROM messages WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![session_id.to_string(), sql_limit(limit)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (role, content) = row?;
            out.push((parse_role(&role)?, content));
        }
        Ok(out)
    }

    fn delete_session(&self, session_id: SessionId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM sessions WHERE session_id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn enforce_max_sessions(&self, max: usize) -> Result<usize> {
        if max == 0 {
            return Ok(0);
        }
        let tx = self.conn.unchecked_transaction()?;
        let excess = self.session_count()?.saturating_sub(max);
        if excess == 0 {
            return Ok(0);
        }

        let victims: Vec<String> = {
            let mut stmt = tx.prepare_cached(
                "SELECT session_id FROM sessions ORDER BY created_at ASC, rowid ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![sql_limit(excess)], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        for id in &victims {
            tx.execute("DELETE FROM sessions WHERE session_id = ?1", params![id])?;
        }
        tx.commit()?;

        info!(evicted = victims.len(), max, "Evicted oldest sessions");
        Ok(victims.len())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: String,
    character_id: String,
    title: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            character_id: row.get(1)?,
            title: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_session(self) -> Result<Session> {
        Ok(Session {
            id: SessionId(parse_uuid(&self.id)?),
            character_id: self.character_id,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            title: self.title,
        })
    }
}

struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    meta_json: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            meta_json: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_message(self) -> Result<Message> {
        let meta = match serde_json::from_str::<serde_json::Value>(&self.meta_json) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(message = %self.id, "Ignoring unreadable message metadata");
                serde_json::Map::new()
            }
        };
        Ok(Message {
            id: MessageId(parse_uuid(&self.id)?),
            session_id: SessionId(parse_uuid(&self.session_id)?),
            role: parse_role(&self.role)?,
            content: self.content,
            meta,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HearthError::Serialization(format!("bad timestamp '{raw}': {e}")))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| HearthError::Serialization(format!("bad id '{raw}': {e}")))
}

fn parse_role(raw: &str) -> Result<Role> {
    raw.parse().map_err(HearthError::Serialization)
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Adds `.optional()` to `rusqlite::Result`, turning `QueryReturnedNoRows`
/// into `Ok(None)`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
