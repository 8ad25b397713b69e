//! Error types for parley

use thiserror::Error;

/// Result type alias for parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in parley
///
/// Malformed stream frames never surface here; they are logged and skipped
/// by the protocol client.
#[derive(Debug, Error)]
pub enum Error {
    /// Exchange exceeded its overall deadline
    #[error("exchange timed out")]
    Timeout,

    /// Exchange cancelled by the caller
    #[error("exchange cancelled")]
    Cancelled,

    /// Network or stream failure before a terminal frame
    #[error("transport error: {0}")]
    Transport(String),

    /// Recognition engine is not supported on this platform
    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Recognition engine failed and the restart policy was exhausted
    #[error("recognition engine fault: {0}")]
    EngineFault(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Chat options rejected by validation
    #[error("invalid chat options: {0}")]
    InvalidOptions(String),

    /// An exchange is already in flight for the conversation
    #[error("an exchange is already in flight")]
    Busy,

    /// Operation needs an open conversation
    #[error("no active conversation")]
    NoConversation,

    /// Session coordinator loop has stopped
    #[error("session closed")]
    SessionClosed,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error ended an exchange because of a deadline or caller action
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}
