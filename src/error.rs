//! Error types for voice card

use thiserror::Error;

/// Result type alias for voice card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the playback state machine
///
/// Failures inside a card's playback cycle never surface here; they are
/// folded into [`crate::playback::PlaybackState::Error`] instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Translation error
    #[error("translation error: {0}")]
    Translation(String),

    /// Unknown language code or name
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

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
