use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use chat_web::{router, AppState};
use clap::Parser;
use multimodal_chat::config::{DEFAULT_LOG_FILTER, LOG_ENV_VAR, PROVIDER_ENV_VAR};
use multimodal_chat::ChatConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "multimodal-chat-web",
    version,
    about = "Browser UI for multimodal chat"
)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "MULTIMODAL_CHAT_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// Provider to use: openai or mock
    #[arg(long, env = PROVIDER_ENV_VAR)]
    provider: Option<String>,

    /// Model id for agent completion
    #[arg(long)]
    model: Option<String>,

    /// Seconds a browser session may stay idle before its conversation is dropped
    #[arg(long, env = "MULTIMODAL_CHAT_SESSION_IDLE_SEC", default_value_t = 3600)]
    session_idle_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = ChatConfig::from_env()?.with_overrides(cli.provider, cli.model);
    let state = AppState::from_config(config).context("failed to configure chat provider")?;

    let listener = TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!("listening on http://{}", listener.local_addr()?);

    spawn_idle_sweeper(state.clone(), Duration::from_secs(cli.session_idle_sec.max(1)));

    axum::serve(listener, router(state))
        .await
        .context("server stopped unexpectedly")?;
    Ok(())
}

fn spawn_idle_sweeper(state: AppState, max_idle: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(max_idle.min(Duration::from_secs(60)));
        loop {
            ticker.tick().await;
            let dropped = state.prune_idle(max_idle);
            if dropped > 0 {
                info!(dropped, remaining = state.session_count(), "idle sessions dropped");
            }
        }
    });
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
