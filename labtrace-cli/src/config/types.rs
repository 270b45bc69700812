use labtrace_core::{DEFAULT_PRESET, PolicyRegistry, ScoringPolicy};
use labtrace_skills::{ProficiencyConfig, ProficiencyThresholds};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLabtraceConfig {
    #[serde(default)]
    pub scoring: RawScoringConfig,

    #[serde(default)]
    pub proficiency: RawProficiencyConfig,
}

/// Scoring section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawScoringConfig {
    /// Preset used when a command does not name one
    pub default_preset: Option<String>,

    /// Extra presets; a preset with a built-in id replaces it
    #[serde(default)]
    pub presets: Vec<ScoringPolicy>,
}

/// Proficiency section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProficiencyConfig {
    pub half_life_days: Option<f64>,

    #[serde(default)]
    pub thresholds: RawThresholds,
}

/// Thresholds as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawThresholds {
    pub knows: Option<f64>,
    pub understands: Option<f64>,
    pub applies: Option<f64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LabtraceConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub proficiency: ProficiencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Preset used when a command does not name one
    pub default_preset: String,

    /// Presets registered on top of the built-in ones
    #[serde(default)]
    pub presets: Vec<ScoringPolicy>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_preset: DEFAULT_PRESET.to_string(),
            presets: Vec::new(),
        }
    }
}

impl LabtraceConfig {
    /// Built-in presets plus the configured ones.
    pub fn registry(&self) -> labtrace_core::Result<PolicyRegistry> {
        let mut registry = PolicyRegistry::builtin();
        registry.extend(self.scoring.presets.iter().cloned())?;
        Ok(registry)
    }

    /// Reject configuration that would fail at scoring time.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.proficiency.validate()?;
        let registry = self.registry()?;
        registry.get(&self.scoring.default_preset)?;
        Ok(())
    }
}

impl RawThresholds {
    pub fn finalize(self) -> ProficiencyThresholds {
        let defaults = ProficiencyThresholds::default();
        ProficiencyThresholds {
            knows: self.knows.unwrap_or(defaults.knows),
            understands: self.understands.unwrap_or(defaults.understands),
            applies: self.applies.unwrap_or(defaults.applies),
        }
    }
}
