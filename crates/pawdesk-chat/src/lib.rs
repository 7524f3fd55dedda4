//! Conversational engine for Pawdesk.
//!
//! Routes each inbound message through booking-intent detection, the
//! deterministic appointment workflow, or the external completion gateway,
//! and persists exactly one conversation update per turn.

pub mod error;
pub mod gateway;
pub mod intent;
pub mod orchestrator;
pub mod workflow;

pub use error::ChatError;
pub use gateway::{CompletionGateway, GeminiGateway, MockGateway};
pub use intent::IntentDetector;
pub use orchestrator::{ChatOrchestrator, TurnOutput};
pub use workflow::{advance, validate_date_time, validate_phone, Outcome, Transition};
