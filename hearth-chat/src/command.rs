//! Slash-command routing for the chat loop.
//!
//! Only known commands are treated as commands; any other line, including
//! one that merely starts with `/`, is sent to the character as text.

use std::fmt;
use std::str::FromStr;

/// Commands the chat loop understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    /// `/help`
    Help,
    /// `/exit` or `/quit`
    Exit,
    /// `/new [character]`
    New,
    /// `/reset`
    Reset,
    /// `/save`
    Save,
    /// `/config show | set <key> <value>`
    Config,
    /// `/character list | show | set <id>`
    Character,
}

impl CommandName {
    /// Every command, in help order.
    pub const ALL: [Self; 7] = [
        Self::Help,
        Self::Exit,
        Self::New,
        Self::Reset,
        Self::Save,
        Self::Config,
        Self::Character,
    ];

    /// Usage line shown by `/help`.
    #[must_use]
    pub fn usage(self) -> &'static str {
        match self {
            Self::Help => "/help                      show this list",
            Self::Exit => "/exit                      leave (also /quit)",
            Self::New => "/new [character]           start a new session",
            Self::Reset => "/reset                     forget short-term memory for this session",
            Self::Save => "/save                      write the current settings to disk",
            Self::Config => "/config show | set <k> <v> inspect or change settings",
            Self::Character => "/character list | show | set <id>",
        }
    }
}

impl FromStr for CommandName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "help" => Ok(Self::Help),
            "exit" | "quit" => Ok(Self::Exit),
            "new" => Ok(Self::New),
            "reset" => Ok(Self::Reset),
            "save" => Ok(Self::Save),
            "config" => Ok(Self::Config),
            "character" => Ok(Self::Character),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Help => "help",
            Self::Exit => "exit",
            Self::New => "new",
            Self::Reset => "reset",
            Self::Save => "save",
            Self::Config => "config",
            Self::Character => "character",
        };
        write!(f, "/{name}")
    }
}

/// One routed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line.
    Empty,
    /// Text for the character.
    Text(String),
    /// A recognised command with its whitespace-separated arguments.
    Command {
        /// Which command.
        name: CommandName,
        /// Remaining words.
        args: Vec<String>,
    },
}

/// Classify a raw input line.
#[must_use]
pub fn route(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }

    if let Some(rest) = trimmed.strip_prefix('/') {
        let mut words = rest.split_whitespace();
        if let Some(name) = words.next().and_then(|w| w.parse::<CommandName>().ok()) {
            return Input::Command {
                name,
                args: words.map(str::to_string).collect(),
            };
        }
    }

    Input::Text(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(route(""), Input::Empty);
        assert_eq!(route("   \t"), Input::Empty);
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(route("  hello there \n"), Input::Text("hello there".into()));
    }

    #[test]
    fn known_commands_carry_args() {
        assert_eq!(
            route("/config set top_k_episodes 5"),
            Input::Command {
                name: CommandName::Config,
                args: vec!["set".into(), "top_k_episodes".into(), "5".into()],
            }
        );
        assert_eq!(
            route("/QUIT"),
            Input::Command {
                name: CommandName::Exit,
                args: vec![],
            }
        );
    }

    #[test]
    fn unknown_slash_is_text() {
        assert_eq!(route("/shrug"), Input::Text("/shrug".into()));
        assert_eq!(route("/"), Input::Text("/".into()));
    }
}
