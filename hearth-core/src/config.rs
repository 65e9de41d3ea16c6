//! Configuration for Hearth.
//!
//! Maps directly to `hearth.toml`. Every field has a serde default, so a
//! partial file (or none at all) yields a working configuration. Runtime
//! changes go through [`HearthConfig::set`], which only accepts the closed
//! set of [`SettingKey`]s and validates before mutating; nothing is written
//! back to disk until [`HearthConfig::save`] is called.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::{HearthError, Result};
use crate::memory::MemoryBudget;

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "HEARTH_";

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    /// Character selection, paths, logging.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Short-term memory budgets.
    #[serde(default)]
    pub memory: MemorySettings,
    /// Session retention.
    #[serde(default)]
    pub sessions: SessionConfig,
    /// Retrieval sizes.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Language model endpoint and sampling.
    #[serde(default)]
    pub llm: LlmSettings,
}

/// General settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Character used when no session exists yet.
    #[serde(default = "default_character")]
    pub default_character_id: String,
    /// Directory holding one subdirectory per character.
    #[serde(default = "default_characters_dir")]
    pub characters_dir: PathBuf,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// File the binary writes its log to.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_character_id: default_character(),
            characters_dir: default_characters_dir(),
            log_level: default_log_level(),
            log_path: default_log_path(),
        }
    }
}

/// Short-term memory budgets. Zero disables a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Turns (user+assistant pairs) kept in memory.
    #[serde(default = "default_100", deserialize_with = "non_negative")]
    pub short_memory_turns: usize,
    /// Character budget for the history sent to the model.
    #[serde(default = "default_12000", deserialize_with = "non_negative")]
    pub short_memory_max_chars: usize,
    /// Approximate token budget for the history sent to the model.
    #[serde(default, deserialize_with = "non_negative")]
    pub short_memory_max_tokens: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            short_memory_turns: 100,
            short_memory_max_chars: 12_000,
            short_memory_max_tokens: 0,
        }
    }
}

impl MemorySettings {
    /// The budget these settings describe.
    #[must_use]
    pub fn budget(&self) -> MemoryBudget {
        MemoryBudget {
            turns: self.short_memory_turns,
            max_chars: self.short_memory_max_chars,
            max_tokens: self.short_memory_max_tokens,
        }
    }
}

/// Session retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions kept before the oldest are evicted (0 keeps all).
    #[serde(default = "default_200", deserialize_with = "non_negative")]
    pub max_session_count: usize,
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_session_count: 200,
            db_path: default_db_path(),
        }
    }
}

/// Retrieval sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Lore entries injected per turn.
    #[serde(default = "default_3", deserialize_with = "non_negative")]
    pub top_k_episodes: usize,
    /// Historical log lines injected per turn.
    #[serde(default = "default_6", deserialize_with = "non_negative")]
    pub top_k_log_messages: usize,
    /// How many stored messages the log retriever scans.
    #[serde(default = "default_200", deserialize_with = "non_negative")]
    pub log_scan_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_episodes: 3,
            top_k_log_messages: 6,
            log_scan_limit: 200,
        }
    }
}

/// Language model endpoint and sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible API root, e.g. `http://127.0.0.1:1234/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_60")]
    pub timeout_sec: u64,
    /// Attempts per call (at least one is always made).
    #[serde(default = "default_2_u32")]
    pub retry_max: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Completion cap; 0 leaves it to the server.
    #[serde(default, deserialize_with = "non_negative_u32")]
    pub max_tokens: u32,
    /// Presence penalty.
    #[serde(default)]
    pub presence_penalty: f32,
    /// Frequency penalty.
    #[serde(default)]
    pub frequency_penalty: f32,
    /// Use the JSON emotion protocol instead of plain text.
    #[serde(default = "default_true")]
    pub structured_output: bool,
    /// Bearer token; local servers accept any placeholder.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_sec: 60,
            retry_max: 2,
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: 0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            structured_output: true,
            api_key: default_api_key(),
        }
    }
}

// ---------------------------------------------------------------------------
// Setting keys
// ---------------------------------------------------------------------------

/// The closed set of settings that may be changed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SettingKey {
    DefaultCharacterId,
    CharactersDir,
    LogLevel,
    LogPath,
    ShortMemoryTurns,
    ShortMemoryMaxChars,
    ShortMemoryMaxTokens,
    MaxSessionCount,
    DbPath,
    TopKEpisodes,
    TopKLogMessages,
    LogScanLimit,
    BaseUrl,
    Model,
    TimeoutSec,
    RetryMax,
    Temperature,
    TopP,
    MaxTokens,
    PresencePenalty,
    FrequencyPenalty,
    StructuredOutput,
    ApiKey,
}

impl SettingKey {
    /// Every key, in file order.
    pub const ALL: [Self; 23] = [
        Self::DefaultCharacterId,
        Self::CharactersDir,
        Self::LogLevel,
        Self::LogPath,
        Self::ShortMemoryTurns,
        Self::ShortMemoryMaxChars,
        Self::ShortMemoryMaxTokens,
        Self::MaxSessionCount,
        Self::DbPath,
        Self::TopKEpisodes,
        Self::TopKLogMessages,
        Self::LogScanLimit,
        Self::BaseUrl,
        Self::Model,
        Self::TimeoutSec,
        Self::RetryMax,
        Self::Temperature,
        Self::TopP,
        Self::MaxTokens,
        Self::PresencePenalty,
        Self::FrequencyPenalty,
        Self::StructuredOutput,
        Self::ApiKey,
    ];

    /// Field name, as written in `hearth.toml`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DefaultCharacterId => "default_character_id",
            Self::CharactersDir => "characters_dir",
            Self::LogLevel => "log_level",
            Self::LogPath => "log_path",
            Self::ShortMemoryTurns => "short_memory_turns",
            Self::ShortMemoryMaxChars => "short_memory_max_chars",
            Self::ShortMemoryMaxTokens => "short_memory_max_tokens",
            Self::MaxSessionCount => "max_session_count",
            Self::DbPath => "db_path",
            Self::TopKEpisodes => "top_k_episodes",
            Self::TopKLogMessages => "top_k_log_messages",
            Self::LogScanLimit => "log_scan_limit",
            Self::BaseUrl => "base_url",
            Self::Model => "model",
            Self::TimeoutSec => "timeout_sec",
            Self::RetryMax => "retry_max",
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::MaxTokens => "max_tokens",
            Self::PresencePenalty => "presence_penalty",
            Self::FrequencyPenalty => "frequency_penalty",
            Self::StructuredOutput => "structured_output",
            Self::ApiKey => "api_key",
        }
    }

    /// Section the field lives in.
    #[must_use]
    pub fn section(self) -> &'static str {
        match self {
            Self::DefaultCharacterId | Self::CharactersDir | Self::LogLevel | Self::LogPath => {
                "general"
            }
            Self::ShortMemoryTurns | Self::ShortMemoryMaxChars | Self::ShortMemoryMaxTokens => {
                "memory"
            }
            Self::MaxSessionCount | Self::DbPath => "sessions",
            Self::TopKEpisodes | Self::TopKLogMessages | Self::LogScanLimit => "retrieval",
            _ => "llm",
        }
    }

    /// Environment variable that overrides this key.
    #[must_use]
    pub fn env_var(self) -> String {
        format!("{ENV_PREFIX}{}", self.name().to_ascii_uppercase())
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.name())
    }
}

impl FromStr for SettingKey {
    type Err = HearthError;

    /// Accepts `name` or `section.name`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (section, name) = match s.split_once('.') {
            Some((section, name)) => (Some(section), name),
            None => (None, s),
        };
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name && section.is_none_or(|sec| sec == k.section()))
            .ok_or_else(|| HearthError::UnknownSetting(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Loading, updating, saving
// ---------------------------------------------------------------------------

impl HearthConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`HearthError::Config`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| HearthError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            info!(path = %path.display(), "Loading configuration");
            Self::from_file(path)
        } else {
            info!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write the configuration to `path` as TOML.
    ///
    /// # Errors
    /// Returns [`HearthError::Config`] on encoding failure and
    /// [`HearthError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| HearthError::Config(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Current value of `key`, rendered as text.
    #[must_use]
    pub fn get(&self, key: SettingKey) -> String {
        use SettingKey as K;
        match key {
            K::DefaultCharacterId => self.general.default_character_id.clone(),
            K::CharactersDir => self.general.characters_dir.display().to_string(),
            K::LogLevel => self.general.log_level.clone(),
            K::LogPath => self.general.log_path.display().to_string(),
            K::ShortMemoryTurns => self.memory.short_memory_turns.to_string(),
            K::ShortMemoryMaxChars => self.memory.short_memory_max_chars.to_string(),
            K::ShortMemoryMaxTokens => self.memory.short_memory_max_tokens.to_string(),
            K::MaxSessionCount => self.sessions.max_session_count.to_string(),
            K::DbPath => self.sessions.db_path.display().to_string(),
            K::TopKEpisodes => self.retrieval.top_k_episodes.to_string(),
            K::TopKLogMessages => self.retrieval.top_k_log_messages.to_string(),
            K::LogScanLimit => self.retrieval.log_scan_limit.to_string(),
            K::BaseUrl => self.llm.base_url.clone(),
            K::Model => self.llm.model.clone(),
            K::TimeoutSec => self.llm.timeout_sec.to_string(),
            K::RetryMax => self.llm.retry_max.to_string(),
            K::Temperature => self.llm.temperature.to_string(),
            K::TopP => self.llm.top_p.to_string(),
            K::MaxTokens => self.llm.max_tokens.to_string(),
            K::PresencePenalty => self.llm.presence_penalty.to_string(),
            K::FrequencyPenalty => self.llm.frequency_penalty.to_string(),
            K::StructuredOutput => self.llm.structured_output.to_string(),
            K::ApiKey => self.llm.api_key.clone(),
        }
    }

    /// Validate `raw` for `key` and apply it.
    ///
    /// Negative integer budgets are coerced to 0 (disabled).
    ///
    /// # Errors
    /// Returns [`HearthError::InvalidSetting`] and leaves the configuration
    /// untouched if `raw` does not parse or is out of range.
    pub fn set(&mut self, key: SettingKey, raw: &str) -> Result<()> {
        use SettingKey as K;
        let raw = raw.trim();
        match key {
            K::DefaultCharacterId => self.general.default_character_id = non_empty(key, raw)?,
            K::CharactersDir => self.general.characters_dir = PathBuf::from(non_empty(key, raw)?),
            K::LogLevel => self.general.log_level = log_level(key, raw)?,
            K::LogPath => self.general.log_path = PathBuf::from(non_empty(key, raw)?),
            K::ShortMemoryTurns => self.memory.short_memory_turns = budget(key, raw)?,
            K::ShortMemoryMaxChars => self.memory.short_memory_max_chars = budget(key, raw)?,
            K::ShortMemoryMaxTokens => self.memory.short_memory_max_tokens = budget(key, raw)?,
            K::MaxSessionCount => self.sessions.max_session_count = budget(key, raw)?,
            K::DbPath => self.sessions.db_path = PathBuf::from(non_empty(key, raw)?),
            K::TopKEpisodes => self.retrieval.top_k_episodes = budget(key, raw)?,
            K::TopKLogMessages => self.retrieval.top_k_log_messages = budget(key, raw)?,
            K::LogScanLimit => self.retrieval.log_scan_limit = budget(key, raw)?,
            K::BaseUrl => self.llm.base_url = base_url(key, raw)?,
            K::Model => self.llm.model = non_empty(key, raw)?,
            K::TimeoutSec => {
                let secs: u64 = parse(key, raw)?;
                if secs == 0 {
                    return Err(invalid(key, "must be at least 1 second"));
                }
                self.llm.timeout_sec = secs;
            }
            K::RetryMax => self.llm.retry_max = u32::try_from(budget(key, raw)?).unwrap_or(u32::MAX),
            K::Temperature => self.llm.temperature = ranged(key, raw, 0.0, 2.0)?,
            K::TopP => self.llm.top_p = ranged(key, raw, 0.0, 1.0)?,
            K::MaxTokens => self.llm.max_tokens = u32::try_from(budget(key, raw)?).unwrap_or(u32::MAX),
            K::PresencePenalty => self.llm.presence_penalty = ranged(key, raw, -2.0, 2.0)?,
            K::FrequencyPenalty => self.llm.frequency_penalty = ranged(key, raw, -2.0, 2.0)?,
            K::StructuredOutput => self.llm.structured_output = boolean(key, raw)?,
            K::ApiKey => self.llm.api_key = raw.to_string(),
        }
        debug!(%key, value = %self.get(key), "Setting updated");
        Ok(())
    }

    /// Parse `key` from text and apply `raw`.
    ///
    /// # Errors
    /// [`HearthError::UnknownSetting`] for keys outside [`SettingKey::ALL`],
    /// otherwise as [`HearthError::InvalidSetting`].
    pub fn set_named(&mut self, key: &str, raw: &str) -> Result<SettingKey> {
        let key: SettingKey = key.parse()?;
        self.set(key, raw)?;
        Ok(key)
    }

    /// Apply `HEARTH_<KEY>` overrides from `vars` (usually `std::env::vars()`).
    ///
    /// Returns the keys that were applied.
    ///
    /// # Errors
    /// Fails on the first override whose value is invalid.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<Vec<SettingKey>>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = Vec::new();
        for (name, value) in vars {
            let Some(field) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let Ok(key) = field.to_ascii_lowercase().parse::<SettingKey>() else {
                continue;
            };
            self.set(key, &value)?;
            applied.push(key);
        }
        Ok(applied)
    }

    /// `key = value` lines for display, API key masked.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        SettingKey::ALL
            .into_iter()
            .map(|key| {
                let value = match key {
                    SettingKey::ApiKey if !self.llm.api_key.is_empty() => "********".to_string(),
                    _ => self.get(key),
                };
                format!("{key} = {value}")
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn invalid(key: SettingKey, reason: impl Into<String>) -> HearthError {
    HearthError::InvalidSetting {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse<T: FromStr>(key: SettingKey, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| invalid(key, format!("cannot parse '{raw}'")))
}

fn budget(key: SettingKey, raw: &str) -> Result<usize> {
    let n: i64 = parse(key, raw)?;
    Ok(usize::try_from(n.max(0)).unwrap_or(usize::MAX))
}

fn ranged(key: SettingKey, raw: &str, min: f32, max: f32) -> Result<f32> {
    let v: f32 = parse(key, raw)?;
    if v.is_finite() && (min..=max).contains(&v) {
        Ok(v)
    } else {
        Err(invalid(key, format!("must be between {min} and {max}")))
    }
}

fn boolean(key: SettingKey, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, "expected true or false")),
    }
}

fn non_empty(key: SettingKey, raw: &str) -> Result<String> {
    if raw.is_empty() {
        Err(invalid(key, "must not be empty"))
    } else {
        Ok(raw.to_string())
    }
}

fn log_level(key: SettingKey, raw: &str) -> Result<String> {
    let level = raw.to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(level),
        _ => Err(invalid(key, "expected trace, debug, info, warn or error")),
    }
}

fn base_url(key: SettingKey, raw: &str) -> Result<String> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(raw.trim_end_matches('/').to_string())
    } else {
        Err(invalid(key, "must start with http:// or https://"))
    }
}

/// Integers in the file may be negative; those mean "disabled".
fn non_negative<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<usize, D::Error> {
    let n = i64::deserialize(d)?;
    Ok(usize::try_from(n.max(0)).unwrap_or(usize::MAX))
}

fn non_negative_u32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let n = i64::deserialize(d)?;
    Ok(u32::try_from(n.max(0)).unwrap_or(u32::MAX))
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_character() -> String {
    "tokina".to_string()
}
fn default_characters_dir() -> PathBuf {
    PathBuf::from("characters")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_path() -> PathBuf {
    PathBuf::from("logs/hearth.log")
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/hearth.db")
}
fn default_base_url() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}
fn default_model() -> String {
    "local-model".to_string()
}
fn default_api_key() -> String {
    "lm-studio".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_2_u32() -> u32 {
    2
}
fn default_3() -> usize {
    3
}
fn default_6() -> usize {
    6
}
fn default_60() -> u64 {
    60
}
fn default_100() -> usize {
    100
}
fn default_200() -> usize {
    200
}
fn default_12000() -> usize {
    12_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = HearthConfig::from_toml("").expect("parse");
        assert_eq!(config, HearthConfig::default());
        assert_eq!(config.memory.short_memory_turns, 100);
        assert_eq!(config.memory.short_memory_max_chars, 12_000);
        assert_eq!(config.llm.base_url, "http://127.0.0.1:1234/v1");
        assert!(config.llm.structured_output);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = HearthConfig::from_toml(
            "[memory]\nshort_memory_turns = 5\n\n[llm]\nmodel = \"qwen\"\n",
        )
        .expect("parse");
        assert_eq!(config.memory.short_memory_turns, 5);
        assert_eq!(config.memory.short_memory_max_chars, 12_000);
        assert_eq!(config.llm.model, "qwen");
        assert_eq!(config.llm.retry_max, 2);
    }

    #[test]
    fn negative_budgets_in_file_become_zero() {
        let config = HearthConfig::from_toml(
            "[memory]\nshort_memory_max_chars = -1\n[sessions]\nmax_session_count = -5\n",
        )
        .expect("parse");
        assert_eq!(config.memory.short_memory_max_chars, 0);
        assert_eq!(config.sessions.max_session_count, 0);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        assert!(matches!(
            HearthConfig::from_toml("[memory\n"),
            Err(HearthError::Config(_))
        ));
    }

    #[test]
    fn setting_keys_parse_bare_and_qualified() {
        for key in SettingKey::ALL {
            assert_eq!(key.name().parse::<SettingKey>().expect("bare"), key);
            assert_eq!(key.to_string().parse::<SettingKey>().expect("qualified"), key);
        }
        assert!(matches!("nope".parse::<SettingKey>(), Err(HearthError::UnknownSetting(_))));
        assert!("llm.short_memory_turns".parse::<SettingKey>().is_err());
    }

    #[test]
    fn set_validates_before_mutating() {
        let mut config = HearthConfig::default();
        config.set(SettingKey::ShortMemoryTurns, "20").expect("set");
        assert_eq!(config.memory.short_memory_turns, 20);

        config.set(SettingKey::ShortMemoryMaxTokens, "-3").expect("negative");
        assert_eq!(config.memory.short_memory_max_tokens, 0);

        let before = config.clone();
        assert!(config.set(SettingKey::ShortMemoryTurns, "lots").is_err());
        assert!(config.set(SettingKey::Temperature, "3.5").is_err());
        assert!(config.set(SettingKey::TimeoutSec, "0").is_err());
        assert!(config.set(SettingKey::BaseUrl, "localhost:1234").is_err());
        assert!(config.set(SettingKey::StructuredOutput, "maybe").is_err());
        assert!(config.set(SettingKey::LogLevel, "loud").is_err());
        assert_eq!(config, before);

        config.set(SettingKey::StructuredOutput, "off").expect("bool");
        assert!(!config.llm.structured_output);
        config.set(SettingKey::BaseUrl, "http://host:8080/v1/").expect("url");
        assert_eq!(config.llm.base_url, "http://host:8080/v1");
    }

    #[test]
    fn get_renders_current_values() {
        let mut config = HearthConfig::default();
        config.set_named("top_k_episodes", "7").expect("set");
        assert_eq!(config.get(SettingKey::TopKEpisodes), "7");
        assert!(matches!(
            config.set_named("volume", "3"),
            Err(HearthError::UnknownSetting(_))
        ));
    }

    #[test]
    fn env_overrides_use_prefixed_names() {
        let mut config = HearthConfig::default();
        let vars = vec![
            ("HEARTH_MODEL".to_string(), "mistral".to_string()),
            ("HEARTH_RETRY_MAX".to_string(), "4".to_string()),
            ("HEARTH_UNKNOWN".to_string(), "x".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ];
        let applied = config.apply_env_overrides(vars).expect("apply");
        assert_eq!(applied, vec![SettingKey::Model, SettingKey::RetryMax]);
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.retry_max, 4);
        assert_eq!(SettingKey::RetryMax.env_var(), "HEARTH_RETRY_MAX");
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conf").join("hearth.toml");
        let mut config = HearthConfig::default();
        config.set(SettingKey::Model, "phi").expect("set");
        config.save(&path).expect("save");

        let loaded = HearthConfig::load_or_default(&path).expect("load");
        assert_eq!(loaded, config);
        let missing = HearthConfig::load_or_default(&dir.path().join("none.toml")).expect("default");
        assert_eq!(missing, HearthConfig::default());
    }

    #[test]
    fn describe_masks_api_key() {
        let lines = HearthConfig::default().describe();
        assert_eq!(lines.len(), SettingKey::ALL.len());
        assert!(lines.contains(&"llm.api_key = ********".to_string()));
        assert!(lines.contains(&"memory.short_memory_turns = 100".to_string()));
    }

    #[test]
    fn budget_maps_memory_settings() {
        let budget = MemorySettings::default().budget();
        assert_eq!(budget.turns, 100);
        assert_eq!(budget.max_chars, 12_000);
        assert_eq!(budget.max_tokens, 0);
    }
}
