mod assistant;
mod chat;
mod config;
mod credentials;
mod documents;
mod errors;
mod llm_client;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assistant::prompts::DEFAULT_ASSISTANT_NAME;
use crate::assistant::{bootstrap_assistant, AssistantStore, BootstrapRequest, OpenAiAssistants};
use crate::chat::session::spawn_sweeper;
use crate::config::Config;
use crate::credentials::provider_for;
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "resume-assistant", version, about = "Nursing resume assistant web service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web UI and session API (default).
    Serve,
    /// Create the vendor-side assistant once and cache its id locally.
    BootstrapAssistant(BootstrapArgs),
}

#[derive(Args)]
struct BootstrapArgs {
    #[arg(long, default_value = DEFAULT_ASSISTANT_NAME)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    /// Defaults to TRAINING_DATA_FILE.
    #[arg(long)]
    training_file: Option<PathBuf>,
    /// Defaults to OPENAI_MODEL.
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::BootstrapAssistant(args) => bootstrap(config, args).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Resume Assistant v{}", env!("CARGO_PKG_VERSION"));

    let credentials = provider_for(config.credential_source, &config.secrets_file);
    info!("Credential source: {:?}", config.credential_source);

    let state = AppState::new(config.clone(), credentials).context("Failed to build HTTP client")?;
    info!("LLM client initialized (model: {})", config.model);

    // Sweep at most once a minute, more often for short TTLs.
    let sweep_every = Duration::from_secs(config.session_ttl_secs.clamp(1, 60));
    spawn_sweeper(state.sessions.clone(), sweep_every);
    info!("Session TTL: {}s", config.session_ttl_secs);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn bootstrap(config: Config, args: BootstrapArgs) -> Result<()> {
    let credentials = provider_for(config.credential_source, &config.secrets_file);
    let api_key = credentials.api_key().await?;

    let llm = llm_client::LlmClient::new(
        &config.api_base,
        config.llm_timeout_secs.map(Duration::from_secs),
    )?;
    let api = OpenAiAssistants::new(llm, api_key);
    let store = AssistantStore::new(&config.assistant_store_path);

    let training_file = args
        .training_file
        .unwrap_or_else(|| config.training_data_file.clone());
    let model = args.model.unwrap_or_else(|| config.model.clone());

    let record = bootstrap_assistant(
        &api,
        &store,
        &BootstrapRequest {
            name: &args.name,
            description: args.description.as_deref(),
            model: &model,
            training_file: &training_file,
        },
    )
    .await?;

    info!(
        "Assistant {} ({:?}), recorded in {}",
        record.assistant_id,
        record.origin,
        store.path().display()
    );
    println!("{}", record.assistant_id);
    Ok(())
}
