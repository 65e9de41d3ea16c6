//! The interactive control loop.
//!
//! One line in, one turn (or command) out; the loop awaits each turn before
//! reading the next line. Turn failures are reported on a single `[ERROR]`
//! line and never end the loop.

use std::io::{self, Write};
use std::path::PathBuf;

use hearth_core::config::{HearthConfig, SettingKey};
use hearth_core::error::Result as CoreResult;
use hearth_core::store::MessageStore;
use hearth_core::types::Session;
use hearth_llm::ChatBackend;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

use crate::command::{self, CommandName, Input};
use crate::pipeline::TurnPipeline;
use crate::session::SessionService;
use crate::sink::ReplySink;

const TIMEOUT_HINT: &str = "(check that the model backend is running and reachable)";

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Leave the loop.
    Exit,
}

/// Chat session state plus everything needed to run turns.
pub struct ChatApp<S, B> {
    pipeline: TurnPipeline<S, B>,
    config: HearthConfig,
    config_path: PathBuf,
    sessions: SessionService,
    session: Session,
    sinks: Vec<Box<dyn ReplySink>>,
}

impl<S: MessageStore, B: ChatBackend> ChatApp<S, B> {
    /// Resume the latest session (or create one) and hydrate the pipeline.
    ///
    /// When `character` is given and differs from the resumed session's
    /// character, a new session is started for it instead. An unknown
    /// `character` is logged and ignored.
    ///
    /// # Errors
    ///
    /// Store failures while resuming, creating, or restoring the session.
    pub fn new(
        mut pipeline: TurnPipeline<S, B>,
        config: HearthConfig,
        config_path: impl Into<PathBuf>,
        character: Option<&str>,
    ) -> CoreResult<Self> {
        let sessions = SessionService::new(config.sessions.max_session_count);
        let character = character.filter(|id| match pipeline.characters().load(id) {
            Ok(_) => true,
            Err(err) => {
                warn!(character = %id, error = %err, "Unknown character, resuming latest session");
                false
            }
        });
        let default_character = character.unwrap_or(&config.general.default_character_id);

        let mut session = sessions.resume_or_create(pipeline.store(), default_character)?;
        if let Some(wanted) = character
            && wanted != session.character_id
        {
            session = sessions.create_new(pipeline.store(), wanted)?;
        }

        pipeline.apply_config(&config);
        pipeline.restore(&session)?;

        Ok(Self {
            pipeline,
            config,
            config_path: config_path.into(),
            sessions,
            session,
            sinks: Vec::new(),
        })
    }

    /// Add a reply sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl ReplySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Active session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Live configuration.
    #[must_use]
    pub fn config(&self) -> &HearthConfig {
        &self.config
    }

    /// The turn pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &TurnPipeline<S, B> {
        &self.pipeline
    }

    /// Read lines from `input` until end of input or `/exit`.
    ///
    /// # Errors
    ///
    /// I/O failures on `input`, `out`, or a sink.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let name = self.pipeline.characters().display_name(&self.session.character_id);
        writeln!(out, "Talking to {name}. Type /help for commands.")?;

        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                break;
            };
            if self.handle_line(&line, out).await? == Flow::Exit {
                break;
            }
        }
        info!(session = %self.session.id, "Chat loop finished");
        Ok(())
    }

    /// Handle one input line.
    ///
    /// # Errors
    ///
    /// I/O failures on `out` or a sink.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        match command::route(line) {
            Input::Empty => Ok(Flow::Continue),
            Input::Text(text) => {
                self.turn(&text, out).await?;
                Ok(Flow::Continue)
            }
            Input::Command { name, args } => self.command(name, &args, out),
        }
    }

    async fn turn<W: Write>(&mut self, text: &str, out: &mut W) -> io::Result<()> {
        match self.pipeline.run_turn(&self.session, text).await {
            Ok(turn) => {
                for sink in &mut self.sinks {
                    sink.deliver(&turn.speaker, &turn.reply)?;
                }
            }
            Err(err) => {
                error!(session = %self.session.id, error = %err, "Turn failed");
                if err.is_timeout() {
                    writeln!(out, "[ERROR] {err} {TIMEOUT_HINT}")?;
                } else {
                    writeln!(out, "[ERROR] {err}")?;
                }
            }
        }
        Ok(())
    }

    fn command<W: Write>(&mut self, name: CommandName, args: &[String], out: &mut W) -> io::Result<Flow> {
        match name {
            CommandName::Help => {
                for command in CommandName::ALL {
                    writeln!(out, "  {}", command.usage())?;
                }
            }
            CommandName::Exit => return Ok(Flow::Exit),
            CommandName::New => {
                let character = args
                    .first()
                    .cloned()
                    .unwrap_or_else(|| self.session.character_id.clone());
                if let Err(err) = self.pipeline.characters().load(&character) {
                    writeln!(out, "[ERROR] {err}")?;
                } else {
                    self.start_session(&character, out)?;
                }
            }
            CommandName::Reset => {
                self.pipeline.reset(self.session.id);
                writeln!(out, "Short-term memory cleared.")?;
            }
            CommandName::Save => match self.config.save(&self.config_path) {
                Ok(()) => writeln!(out, "Settings saved to {}.", self.config_path.display())?,
                Err(err) => writeln!(out, "[ERROR] {err}")?,
            },
            CommandName::Config => self.config_command(args, out)?,
            CommandName::Character => self.character_command(args, out)?,
        }
        Ok(Flow::Continue)
    }

    fn config_command<W: Write>(&mut self, args: &[String], out: &mut W) -> io::Result<()> {
        match args {
            [] => {
                for line in self.config.describe() {
                    writeln!(out, "  {line}")?;
                }
            }
            [sub] if sub == "show" => {
                for line in self.config.describe() {
                    writeln!(out, "  {line}")?;
                }
            }
            [sub, key, value @ ..] if sub == "set" && !value.is_empty() => {
                let value = value.join(" ");
                match self.config.set_named(key, &value) {
                    Ok(key) => {
                        self.pipeline.apply_config(&self.config);
                        self.sessions
                            .set_max_session_count(self.config.sessions.max_session_count);
                        info!(%key, "Setting changed");
                        if applies_live(key) {
                            writeln!(out, "{key} = {}", self.config.get(key))?;
                        } else {
                            writeln!(out, "{key} = {} (takes effect after restart)", self.config.get(key))?;
                        }
                    }
                    Err(err) => writeln!(out, "[ERROR] {err}")?,
                }
            }
            _ => writeln!(out, "usage: {}", CommandName::Config.usage())?,
        }
        Ok(())
    }

    fn character_command<W: Write>(&mut self, args: &[String], out: &mut W) -> io::Result<()> {
        match args {
            [sub] if sub == "list" => match self.pipeline.characters().list() {
                Ok(ids) if ids.is_empty() => writeln!(out, "No characters found.")?,
                Ok(ids) => {
                    for id in ids {
                        let marker = if id == self.session.character_id { "*" } else { " " };
                        let name = self.pipeline.characters().display_name(&id);
                        writeln!(out, "{marker} {id} ({name})")?;
                    }
                }
                Err(err) => writeln!(out, "[ERROR] {err}")?,
            },
            [] => self.show_character(out)?,
            [sub] if sub == "show" => self.show_character(out)?,
            [sub, id] if sub == "set" => {
                if let Err(err) = self.pipeline.characters().load(id) {
                    writeln!(out, "[ERROR] {err}")?;
                    return Ok(());
                }
                self.config.general.default_character_id.clone_from(id);
                self.start_session(id, out)?;
            }
            _ => writeln!(out, "usage: {}", CommandName::Character.usage())?,
        }
        Ok(())
    }

    fn show_character<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let id = &self.session.character_id;
        let name = self.pipeline.characters().display_name(id);
        let emotion = self.pipeline.emotion();
        writeln!(out, "{name} [{id}], session {}", self.session.id)?;
        let levels: Vec<String> = emotion.iter().map(|(k, v)| format!("{k}={v}")).collect();
        writeln!(out, "  mood: {} ({})", emotion.dominant(), levels.join(" "))
    }

    fn start_session<W: Write>(&mut self, character: &str, out: &mut W) -> io::Result<()> {
        let started = self
            .sessions
            .create_new(self.pipeline.store(), character)
            .and_then(|session| self.pipeline.restore(&session).map(|()| session));
        match started {
            Ok(session) => {
                let name = self.pipeline.characters().display_name(character);
                writeln!(out, "New session with {name}.")?;
                self.session = session;
            }
            Err(err) => writeln!(out, "[ERROR] {err}")?,
        }
        Ok(())
    }
}

/// Settings the running loop picks up immediately. Everything else is read
/// once at startup.
fn applies_live(key: SettingKey) -> bool {
    matches!(
        key,
        SettingKey::DefaultCharacterId
            | SettingKey::ShortMemoryTurns
            | SettingKey::ShortMemoryMaxChars
            | SettingKey::ShortMemoryMaxTokens
            | SettingKey::MaxSessionCount
            | SettingKey::TopKEpisodes
            | SettingKey::TopKLogMessages
            | SettingKey::LogScanLimit
            | SettingKey::StructuredOutput
    )
}
