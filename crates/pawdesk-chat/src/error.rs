//! Error types for the conversational interface.

use pawdesk_core::error::PawdeskError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session id cannot be empty")]
    EmptySession,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("completion service unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PawdeskError> for ChatError {
    fn from(err: PawdeskError) -> Self {
        match err {
            PawdeskError::Gateway(msg) => ChatError::GatewayUnavailable(msg),
            other => ChatError::StorageError(other.to_string()),
        }
    }
}
