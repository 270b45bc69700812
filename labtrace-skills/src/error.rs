//! Error types for labtrace-skills

use thiserror::Error;

/// Error type for proficiency configuration
#[derive(Debug, Error)]
pub enum ProficiencyError {
    /// Level thresholds are out of range or not strictly increasing
    #[error("Invalid proficiency thresholds: {0}")]
    InvalidThresholds(String),

    /// Decay half-life is not a positive finite number of days
    #[error("Invalid decay half-life: {0} days")]
    InvalidHalfLife(f64),

    /// A Q-matrix row weight is outside [0, 1]
    #[error("Invalid Q-matrix weight {weight} for {lab_id}/{step_id} -> {skill_id}")]
    InvalidWeight {
        lab_id: String,
        step_id: String,
        skill_id: String,
        weight: f64,
    },

    /// A skill evidence record carries a confidence or weight outside [0, 1]
    #[error("Invalid skill evidence from {source_id} for {skill_id}: {field} = {value}")]
    InvalidEvidence {
        skill_id: String,
        source_id: String,
        field: &'static str,
        value: f64,
    },

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for proficiency operations
pub type Result<T> = std::result::Result<T, ProficiencyError>;
