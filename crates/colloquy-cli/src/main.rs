//! # colloquy
//!
//! Interactive command-line chat client. Wires settings, logging, the
//! completion provider, and the chat session together, then runs the
//! prompt loop.

#![deny(unsafe_code)]

mod actions;
mod app;
mod console;
mod session;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colloquy_llm::openai::{OpenAiConfig, OpenAiProvider};
use colloquy_logging::LogFormat;
use colloquy_settings::{load_dotenv, load_settings_from_path, settings_path};
use colloquy_tokens::lookup_model;
use tracing::info;

use crate::app::App;
use crate::session::ChatSession;

/// Colloquy chat client.
#[derive(Parser, Debug)]
#[command(name = "colloquy", about = "Interactive chat client with bounded-context memory")]
struct Cli {
    /// Model name or alias (overrides settings).
    #[arg(long)]
    model: Option<String>,

    /// Settings file (defaults to `~/.colloquy/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Resume the named chat from the chats directory without asking.
    #[arg(long)]
    resume: Option<String>,

    /// Log level (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_file = Path::new(".env");
    let env_loaded = load_dotenv(env_file)
        .with_context(|| format!("Failed to load {}", env_file.display()))?;

    let path = cli.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(model) = cli.model {
        settings.model.name = model;
    }

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    let format = if settings.logging.json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    colloquy_logging::init_subscriber(level, format);

    let model = lookup_model(&settings.model.name).context("Unsupported model")?;
    let config = OpenAiConfig::from_env(model.name.clone())
        .context("OpenAI credentials are required")?
        .with_base_url(settings.api.base_url.clone())
        .with_timeout(Duration::from_millis(settings.api.timeout_ms));
    let provider = OpenAiProvider::new(config).context("Failed to create OpenAI client")?;
    info!(
        model = %model.name,
        settings = %path.display(),
        env_file = env_loaded,
        "starting colloquy"
    );

    let session = ChatSession::new(model, &settings.model, Box::new(provider));
    let mut app = App::new(session, &settings);

    match run(&mut app, cli.resume.as_deref()).await {
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            console::blank();
            console::green("Goodbye!");
            Ok(())
        }
        result => result.context("Terminal I/O failed"),
    }
}

async fn run(app: &mut App, resume: Option<&str>) -> io::Result<()> {
    app.configure(resume).await?;
    app.run().await
}
