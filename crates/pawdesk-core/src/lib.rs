pub mod config;
pub mod error;
pub mod types;

pub use config::PawdeskConfig;
pub use error::{PawdeskError, Result};
pub use types::*;
