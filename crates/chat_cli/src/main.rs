use std::io;

use anyhow::{Context, Result};
use chat_cli::app::run_repl;
use clap::Parser;
use multimodal_chat::config::{DEFAULT_LOG_FILTER, LOG_ENV_VAR, PROVIDER_ENV_VAR};
use multimodal_chat::{ChatConfig, ChatSession};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "multimodal-chat", version, about = "Terminal multimodal chat")]
struct Cli {
    /// Provider to use: openai or mock
    #[arg(long, env = PROVIDER_ENV_VAR)]
    provider: Option<String>,

    /// Model id for agent completion
    #[arg(long)]
    model: Option<String>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = ChatConfig::from_env()?.with_overrides(cli.provider, cli.model);
    let mut session =
        ChatSession::from_config(&config).context("failed to start chat session")?;
    tracing::info!(
        provider = %session.profile().provider_id,
        model = %session.profile().model_id,
        "chat session ready"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_repl(&mut session, stdin.lock(), &mut stdout.lock())?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}
