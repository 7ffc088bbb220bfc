//! Chatty error types

use thiserror::Error;

/// Chatty error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text generation backend error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Conversational memory error
    #[error("Memory error: {0}")]
    Memory(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Chatty operations
pub type Result<T> = std::result::Result<T, Error>;
