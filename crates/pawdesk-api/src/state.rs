//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use pawdesk_chat::ChatOrchestrator;
use pawdesk_core::config::PawdeskConfig;
use pawdesk_storage::Database;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<PawdeskConfig>,
    /// SQLite database for persistent storage.
    pub database: Arc<Database>,
    /// Conversation orchestrator handling each turn.
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(
        config: PawdeskConfig,
        database: Arc<Database>,
        orchestrator: ChatOrchestrator,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database,
            orchestrator: Arc::new(orchestrator),
            start_time: Instant::now(),
        }
    }
}
