//! `hearth` — chat with a character from the terminal.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hearth_chat::{ChatApp, TextSink, TurnPipeline, TurnSettings};
use hearth_core::store::MessageStore;
use hearth_core::{CharacterLibrary, HearthConfig, SqliteStore};
use hearth_llm::{LlmClient, LlmClientConfig};
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "hearth",
    about = "Hearth — talk to a character with memory and moods",
    version
)]
struct Cli {
    /// Settings file (created by /save if missing)
    #[arg(short, long, env = "HEARTH_CONFIG", default_value = "hearth.toml")]
    config: PathBuf,

    /// Character to talk to; starts a new session if it differs from the last one
    #[arg(long)]
    character: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = HearthConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config
        .apply_env_overrides(std::env::vars())
        .context("applying HEARTH_* environment overrides")?;

    init_tracing(&config.general.log_path, &config.general.log_level)?;
    info!(config = %cli.config.display(), "Starting hearth");

    let store = SqliteStore::open(&config.sessions.db_path)
        .with_context(|| format!("opening {}", config.sessions.db_path.display()))?;
    store
        .enforce_max_sessions(config.sessions.max_session_count)
        .context("trimming old sessions")?;
    let characters = CharacterLibrary::new(&config.general.characters_dir);
    let llm = LlmClient::openai(LlmClientConfig::from(&config.llm)).context("building LLM client")?;

    let pipeline = TurnPipeline::new(
        store,
        llm,
        characters,
        config.memory.budget(),
        TurnSettings::from(&config),
    );
    let mut app = ChatApp::new(pipeline, config, cli.config, cli.character.as_deref())
        .context("starting session")?
        .with_sink(TextSink::stdout());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    app.run(stdin, &mut stdout).await?;
    Ok(())
}

fn init_tracing(log_path: &Path, level: &str) -> anyhow::Result<()> {
    if let Some(dir) = log_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
