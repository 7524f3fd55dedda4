use thiserror::Error;

/// Top-level error type for the Pawdesk system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define their
/// own error types and implement `From<SubsystemError> for PawdeskError` so
/// that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PawdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PawdeskError {
    fn from(err: toml::de::Error) -> Self {
        PawdeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PawdeskError {
    fn from(err: toml::ser::Error) -> Self {
        PawdeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PawdeskError {
    fn from(err: serde_json::Error) -> Self {
        PawdeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Pawdesk operations.
pub type Result<T> = std::result::Result<T, PawdeskError>;
