//! Error types for hitch.

use std::io;

/// Errors produced by the hitch crates.
#[derive(Debug, thiserror::Error)]
pub enum HitchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("alias error: {0}")]
    Alias(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HitchError>;
