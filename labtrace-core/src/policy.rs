//! Scoring policies ("presets").
//!
//! A policy describes how hints, solution views, retries and a first-try
//! success move a step's confidence away from the 1.0 baseline, plus the
//! threshold a lab score must meet to pass. Policies are plain data so that
//! the same event log can be replayed under a different preset.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};

/// Preset id used when the caller does not name one.
pub const DEFAULT_PRESET: &str = "standard";

/// How revealed hints are charged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HintPenalty {
    /// Every hint costs the same
    Flat { per_hint: f64 },
    /// Hint `i` (0-based) costs `first * factor^i`
    Diminishing { first: f64, factor: f64 },
}

impl HintPenalty {
    /// Total penalty for `hints` revealed hints.
    #[must_use]
    pub fn total(&self, hints: u32) -> f64 {
        match self {
            Self::Flat { per_hint } => per_hint * f64::from(hints),
            // Geometric series, so the cost does not grow with the hint count
            Self::Diminishing { first, factor } => {
                let n = f64::from(hints);
                if *factor == 1.0 {
                    first * n
                } else {
                    first * (1.0 - factor.powf(n)) / (1.0 - factor)
                }
            }
        }
    }
}

/// Penalty for revealing the reference solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionPenalty {
    /// Amount subtracted from confidence
    pub penalty: f64,
    /// Upper bound on confidence once the solution has been seen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<f64>,
}

/// Penalty for attempts beyond the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPenalty {
    /// Amount subtracted per extra attempt
    pub per_retry: f64,
    /// Ceiling on the total retry penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total: Option<f64>,
}

impl RetryPenalty {
    /// Total penalty for `retries` extra attempts.
    #[must_use]
    pub fn total(&self, retries: u32) -> f64 {
        let raw = self.per_retry * f64::from(retries);
        match self.max_total {
            Some(max) => raw.min(max),
            None => raw,
        }
    }
}

/// A named scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Preset identifier (e.g. "standard")
    pub id: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Bonus for one attempt with no hints and no solution view
    #[serde(default)]
    pub first_try_bonus: f64,
    /// Minimum overall score for a lab to pass
    pub pass_threshold: f64,
    pub hint_penalty: HintPenalty,
    pub solution_penalty: SolutionPenalty,
    pub retry_penalty: RetryPenalty,
}

impl ScoringPolicy {
    /// The default preset: moderate hint and retry costs, solution view caps at 0.3.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            id: "standard".to_string(),
            description: "Balanced penalties for guided practice".to_string(),
            hint_penalty: HintPenalty::Flat { per_hint: 0.10 },
            solution_penalty: SolutionPenalty {
                penalty: 0.50,
                cap: Some(0.30),
            },
            retry_penalty: RetryPenalty {
                per_retry: 0.05,
                max_total: Some(0.30),
            },
            first_try_bonus: 0.05,
            pass_threshold: 0.60,
        }
    }

    /// Assessment-grade preset with heavier penalties and no bonus.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            id: "strict".to_string(),
            description: "Assessment mode: heavy penalties, high pass bar".to_string(),
            hint_penalty: HintPenalty::Flat { per_hint: 0.15 },
            solution_penalty: SolutionPenalty {
                penalty: 0.70,
                cap: Some(0.20),
            },
            retry_penalty: RetryPenalty {
                per_retry: 0.10,
                max_total: Some(0.50),
            },
            first_try_bonus: 0.0,
            pass_threshold: 0.75,
        }
    }

    /// Exploration preset where each further hint costs half the previous one.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            id: "lenient".to_string(),
            description: "Exploration mode: diminishing hint cost, low pass bar".to_string(),
            hint_penalty: HintPenalty::Diminishing {
                first: 0.08,
                factor: 0.5,
            },
            solution_penalty: SolutionPenalty {
                penalty: 0.30,
                cap: Some(0.50),
            },
            retry_penalty: RetryPenalty {
                per_retry: 0.02,
                max_total: Some(0.20),
            },
            first_try_bonus: 0.05,
            pass_threshold: 0.50,
        }
    }

    /// Check that every number is in range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ScoringError::InvalidPolicy {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }

        match self.hint_penalty {
            HintPenalty::Flat { per_hint } if !non_negative(per_hint) => {
                return Err(invalid("hint per_hint must be >= 0"));
            }
            HintPenalty::Diminishing { first, factor } => {
                if !non_negative(first) {
                    return Err(invalid("hint first must be >= 0"));
                }
                if !(factor > 0.0 && factor <= 1.0) {
                    return Err(invalid("hint factor must be within (0, 1]"));
                }
            }
            HintPenalty::Flat { .. } => {}
        }

        if !non_negative(self.solution_penalty.penalty) {
            return Err(invalid("solution penalty must be >= 0"));
        }
        if let Some(cap) = self.solution_penalty.cap
            && !unit(cap)
        {
            return Err(invalid("solution cap must be within [0, 1]"));
        }
        if !non_negative(self.retry_penalty.per_retry) {
            return Err(invalid("per_retry must be >= 0"));
        }
        if let Some(max) = self.retry_penalty.max_total
            && !non_negative(max)
        {
            return Err(invalid("retry max_total must be >= 0"));
        }
        if !non_negative(self.first_try_bonus) {
            return Err(invalid("first_try_bonus must be >= 0"));
        }
        if !unit(self.pass_threshold) {
            return Err(invalid("pass_threshold must be within [0, 1]"));
        }

        Ok(())
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// On-disk shape of a preset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetFile {
    #[serde(default)]
    pub presets: Vec<ScoringPolicy>,
}

impl PresetFile {
    /// Parse a preset file from TOML.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Read and parse a preset file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}

/// Catalog of scoring presets keyed by id.
///
/// Lookups of unregistered ids fail; there is no silent fallback.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, ScoringPolicy>,
}

impl PolicyRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in presets.
    #[must_use]
    pub fn builtin() -> Self {
        let policies = [
            ScoringPolicy::standard(),
            ScoringPolicy::strict(),
            ScoringPolicy::lenient(),
        ]
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

        Self { policies }
    }

    /// Validate and register a policy, replacing any preset with the same id.
    pub fn register(&mut self, policy: ScoringPolicy) -> Result<()> {
        policy.validate()?;
        self.policies.insert(policy.id.clone(), policy);
        Ok(())
    }

    /// Look up a preset by id.
    pub fn get(&self, id: &str) -> Result<&ScoringPolicy> {
        self.policies
            .get(id)
            .ok_or_else(|| ScoringError::UnknownPolicy(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.policies.contains_key(id)
    }

    /// Registered presets in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ScoringPolicy> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Register every policy in order; later ids replace earlier ones.
    pub fn extend(&mut self, policies: impl IntoIterator<Item = ScoringPolicy>) -> Result<usize> {
        let mut count = 0;
        for policy in policies {
            self.register(policy)?;
            count += 1;
        }
        Ok(count)
    }
}
