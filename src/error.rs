//! Error types for audiocut.

use thiserror::Error;

/// Library-level error type for audiocut operations.
#[derive(Error, Debug)]
pub enum AudiocutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio download failed: {0}")]
    Download(String),

    #[error("Audio trim failed: {0}")]
    Trim(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),
}

/// Result type alias for audiocut operations.
pub type Result<T> = std::result::Result<T, AudiocutError>;
