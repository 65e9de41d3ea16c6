//! Character bundles — the three persona documents behind every prompt.
//!
//! A character lives in `<characters_dir>/<character_id>/` as
//!
//! ```text
//! profile.toml        identity, traits, relationships (+ talk policies)
//! speech_style.toml   baseline tone, alternate modes, humor policy
//! episodes.toml       lore entries, each gated by `tellable.allow`
//! ```
//!
//! Documents are kept as generic JSON trees so that the prompt builder and
//! retriever can read whatever subset an author filled in.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::doc;
use crate::error::{HearthError, Result};

/// File name of the profile document.
pub const PROFILE_FILE: &str = "profile.toml";
/// File name of the speech style document.
pub const SPEECH_STYLE_FILE: &str = "speech_style.toml";
/// File name of the episodes document.
pub const EPISODES_FILE: &str = "episodes.toml";

/// The persona documents for one character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterBundle {
    /// Identity, traits, relationships.
    pub profile: Value,
    /// Tone rules, modes, humor.
    pub speech_style: Value,
    /// Lore entries.
    pub episodes: Value,
}

impl CharacterBundle {
    /// A bundle whose three documents are empty tables.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            profile: Value::Object(serde_json::Map::new()),
            speech_style: Value::Object(serde_json::Map::new()),
            episodes: Value::Object(serde_json::Map::new()),
        }
    }

    /// `character.name`, if the profile sets one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        let name = doc::text_at(doc::node(&self.profile, "character"), "name");
        let name = if name.is_empty() { doc::text_at(&self.profile, "name") } else { name };
        (!name.is_empty()).then_some(name)
    }
}

/// A directory of character bundles.
#[derive(Debug, Clone)]
pub struct CharacterLibrary {
    root: PathBuf,
}

impl CharacterLibrary {
    /// Library rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a character's bundle from disk.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::CharacterMissing`] if any of the three documents
    /// is absent and [`HearthError::CharacterMalformed`] if one cannot be
    /// parsed as a TOML table.
    pub fn load(&self, character_id: &str) -> Result<CharacterBundle> {
        let base = self.root.join(character_id);
        let paths = [
            base.join(PROFILE_FILE),
            base.join(SPEECH_STYLE_FILE),
            base.join(EPISODES_FILE),
        ];

        for path in &paths {
            if !path.is_file() {
                return Err(HearthError::CharacterMissing { path: path.clone() });
            }
        }

        let [profile, speech_style, episodes] = paths;
        let bundle = CharacterBundle {
            profile: read_document(&profile)?,
            speech_style: read_document(&speech_style)?,
            episodes: read_document(&episodes)?,
        };

        debug!(character = character_id, "Loaded character bundle");
        Ok(bundle)
    }

    /// Sorted ids of the subdirectories under the root.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Io`] if the root exists but cannot be read.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Display name for `character_id`, falling back to the id itself when
    /// the bundle cannot be loaded or is unnamed.
    #[must_use]
    pub fn display_name(&self, character_id: &str) -> String {
        self.load(character_id)
            .ok()
            .and_then(|b| b.name())
            .unwrap_or_else(|| character_id.to_string())
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| HearthError::CharacterMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::to_value(table).map_err(|e| HearthError::CharacterMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
