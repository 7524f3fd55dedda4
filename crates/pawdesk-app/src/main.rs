//! Pawdesk application binary - composition root.
//!
//! Ties together all Pawdesk crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Initialize storage (WAL-mode SQLite)
//! 3. Build the completion gateway (Gemini, or mock when no API key is set)
//! 4. Start the axum REST API server

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use pawdesk_api::routes;
use pawdesk_api::state::AppState;
use pawdesk_chat::{ChatOrchestrator, CompletionGateway, GeminiGateway, MockGateway};
use pawdesk_core::config::PawdeskConfig;
use pawdesk_storage::Database;

mod cli;

/// Canned reply served when no completion service is configured.
const OFFLINE_REPLY: &str = "I can help you book an appointment for your pet — just say \"book an appointment\". Free-form questions are unavailable right now.";

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = PawdeskConfig::load_or_default(&config_file);
    config.general.port = args.resolve_port(config.general.port);
    if let Some(data_dir) = args.resolve_data_dir() {
        config.general.data_dir = data_dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.general.log_level.clone())),
        )
        .init();

    tracing::info!("Starting Pawdesk v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    let db_path = data_dir.join("pawdesk.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Completion gateway. Without an API key the server still runs: the
    // booking workflow is fully local and free-form turns get a canned reply.
    let api_key = config
        .gateway
        .api_key
        .clone()
        .or_else(|| std::env::var("PAWDESK_API_KEY").ok());

    let gateway: Arc<dyn CompletionGateway> = match api_key {
        Some(key) => {
            tracing::info!(model = %config.gateway.model, "Completion gateway ready");
            Arc::new(GeminiGateway::new(&config.gateway, key)?)
        }
        None => {
            tracing::warn!("No API key configured — free-form turns use a canned reply");
            Arc::new(MockGateway::new(OFFLINE_REPLY))
        }
    };

    // Orchestrator and API state.
    let orchestrator = ChatOrchestrator::new(Arc::clone(&db), gateway, &config.chat);
    let state = AppState::new(config, db, orchestrator);

    // === API server ===
    routes::start_server(state).await?;

    Ok(())
}
