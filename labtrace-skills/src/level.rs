//! Level thresholds and level resolution.

use serde::{Deserialize, Serialize};

use crate::decay::LevelAggregates;
use crate::error::{ProficiencyError, Result};
use crate::types::{MasteryLevel, ProficiencyLevel};

/// Minimum aggregate confidence for each level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProficiencyThresholds {
    /// Threshold for "knows" (default: 0.30)
    pub knows: f64,
    /// Threshold for "understands" (default: 0.50)
    pub understands: f64,
    /// Threshold for "applies" (default: 0.70)
    pub applies: f64,
}

impl Default for ProficiencyThresholds {
    fn default() -> Self {
        Self {
            knows: 0.30,
            understands: 0.50,
            applies: 0.70,
        }
    }
}

impl ProficiencyThresholds {
    /// Each threshold in `[0, 1]` and `knows < understands < applies`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("knows", self.knows),
            ("understands", self.understands),
            ("applies", self.applies),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ProficiencyError::InvalidThresholds(format!(
                    "{name} threshold {value} is outside [0, 1]"
                )));
            }
        }

        if !(self.knows < self.understands && self.understands < self.applies) {
            return Err(ProficiencyError::InvalidThresholds(format!(
                "thresholds must be strictly increasing, got knows={} understands={} applies={}",
                self.knows, self.understands, self.applies
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn threshold(&self, level: ProficiencyLevel) -> f64 {
        match level {
            ProficiencyLevel::Knows => self.knows,
            ProficiencyLevel::Understands => self.understands,
            ProficiencyLevel::Applies => self.applies,
        }
    }
}

/// Highest level whose own aggregate meets its threshold.
///
/// Levels are checked from the top down. When none qualifies the result is
/// `Unassessed` with the largest raw aggregate, so a near miss stays visible.
#[must_use]
pub fn resolve_level(
    aggregates: &LevelAggregates,
    thresholds: &ProficiencyThresholds,
) -> (MasteryLevel, f64) {
    for level in ProficiencyLevel::ALL.into_iter().rev() {
        let value = aggregates.get(level);
        if value >= thresholds.threshold(level) {
            return (level.into(), value);
        }
    }
    (MasteryLevel::Unassessed, aggregates.max())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggs(knows: f64, understands: f64, applies: f64) -> LevelAggregates {
        LevelAggregates {
            knows,
            understands,
            applies,
        }
    }

    #[test]
    fn test_default_thresholds_are_valid() {
        let t = ProficiencyThresholds::default();
        assert!(t.validate().is_ok());
        assert_eq!(t.threshold(ProficiencyLevel::Understands), 0.50);
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let t = ProficiencyThresholds {
            knows: 0.5,
            understands: 0.5,
            applies: 0.7,
        };
        assert!(matches!(
            t.validate(),
            Err(ProficiencyError::InvalidThresholds(_))
        ));

        let t = ProficiencyThresholds {
            knows: 0.3,
            understands: 0.8,
            applies: 0.7,
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let t = ProficiencyThresholds {
            applies: 1.2,
            ..ProficiencyThresholds::default()
        };
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("applies"));
    }

    #[test]
    fn test_resolves_highest_qualifying_level() {
        let t = ProficiencyThresholds::default();
        assert_eq!(
            resolve_level(&aggs(0.9, 0.9, 0.75), &t),
            (MasteryLevel::Applies, 0.75)
        );
        assert_eq!(
            resolve_level(&aggs(0.9, 0.55, 0.0), &t),
            (MasteryLevel::Understands, 0.55)
        );
        assert_eq!(
            resolve_level(&aggs(0.35, 0.0, 0.0), &t),
            (MasteryLevel::Knows, 0.35)
        );
    }

    #[test]
    fn test_high_lower_level_never_promotes_to_applies() {
        let t = ProficiencyThresholds::default();
        let (level, value) = resolve_level(&aggs(1.0, 1.0, 0.69), &t);
        assert_eq!(level, MasteryLevel::Understands);
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_near_miss_reports_max_raw_aggregate() {
        let t = ProficiencyThresholds::default();
        let (level, value) = resolve_level(&aggs(0.1, 0.25, 0.45), &t);
        assert_eq!(level, MasteryLevel::Unassessed);
        assert_eq!(value, 0.45);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let t = ProficiencyThresholds::default();
        assert_eq!(resolve_level(&aggs(0.0, 0.0, 0.70), &t).0, MasteryLevel::Applies);
    }
}
