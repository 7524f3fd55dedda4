//! Pawdesk API crate - axum HTTP server and route handlers.
//!
//! Provides the REST API for the Pawdesk chatbot: conversational turns,
//! history retrieval, appointment creation and listing, and health checks.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
