//! Error types for STUD.

use thiserror::Error;

/// Library-level error type for STUD operations.
#[derive(Error, Debug)]
pub enum StudError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("YouTube API error: {0}")]
    Youtube(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Chunking failed: {0}")]
    Chunking(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Quiz generation failed: {0}")]
    Quiz(String),

    #[error("Tutor error: {0}")]
    Tutor(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StudError {
    /// Whether this error means the caller asked for something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StudError::NotFound(_))
    }

    /// Whether this error was caused by bad caller input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, StudError::InvalidInput(_))
    }
}

/// Result type alias for STUD operations.
pub type Result<T> = std::result::Result<T, StudError>;
