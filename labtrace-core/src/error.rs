//! Error types for labtrace-core

use thiserror::Error;

/// Error type for scoring configuration and policy lookup
#[derive(Debug, Error)]
pub enum ScoringError {
    /// A preset id was requested that is not registered
    #[error("Unknown scoring policy: {0}")]
    UnknownPolicy(String),

    /// A policy failed validation
    #[error("Invalid scoring policy '{id}': {reason}")]
    InvalidPolicy { id: String, reason: String },

    /// Policy configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scoring operations
pub type Result<T> = std::result::Result<T, ScoringError>;
