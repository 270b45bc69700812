//! Proficiency configuration.

use serde::{Deserialize, Serialize};

use crate::decay::DecayConfig;
use crate::error::Result;
use crate::level::ProficiencyThresholds;

/// Settings for skill-state resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProficiencyConfig {
    /// Evidence half-life in days (default: 60)
    pub half_life_days: f64,
    /// Per-level thresholds
    pub thresholds: ProficiencyThresholds,
}

impl Default for ProficiencyConfig {
    fn default() -> Self {
        Self {
            half_life_days: DecayConfig::default().half_life_days,
            thresholds: ProficiencyThresholds::default(),
        }
    }
}

impl ProficiencyConfig {
    /// Parse from TOML, validating before returning.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.decay().validate()?;
        self.thresholds.validate()
    }

    #[must_use]
    pub fn decay(&self) -> DecayConfig {
        DecayConfig {
            half_life_days: self.half_life_days,
        }
    }
}
