//! Time-decayed aggregation of skill evidence.
//!
//! Evidence loses weight exponentially with age:
//! `decay(d) = e^(-ln 2 / H * d)` for an age of `d` days and a half-life of
//! `H` days, so `decay(0) = 1` and `decay(H) = 0.5`. Each proficiency level
//! is aggregated on its own.
//!
//! The aggregate is a decay-weighted mean: older items pull the result
//! towards their confidence less strongly than fresh ones, but adding older
//! evidence never drags a fresh result down merely for being old.

use chrono::{DateTime, Utc};
use labtrace_core::clamp_unit;
use serde::{Deserialize, Serialize};

use crate::error::{ProficiencyError, Result};
use crate::mapping::SkillEvidence;
use crate::types::{ProficiencyLevel, SkillId};

/// Denominators below this resolve the aggregate to 0.
pub const NEGLIGIBLE_WEIGHT: f64 = 1e-12;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Configuration for evidence decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Days after which evidence counts half (default: 60)
    pub half_life_days: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_days: 60.0,
        }
    }
}

impl DecayConfig {
    /// Half-life must be a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.half_life_days.is_finite() && self.half_life_days > 0.0 {
            Ok(())
        } else {
            Err(ProficiencyError::InvalidHalfLife(self.half_life_days))
        }
    }

    /// Decay weight for evidence of the given age.
    #[must_use]
    pub fn factor(&self, age_days: f64) -> f64 {
        decay_factor(age_days, self.half_life_days)
    }
}

/// `e^(-ln 2 / half_life * age)`; negative ages count as 0.
#[must_use]
pub fn decay_factor(age_days: f64, half_life_days: f64) -> f64 {
    let age = age_days.max(0.0);
    (-std::f64::consts::LN_2 / half_life_days * age).exp()
}

/// Age of an observation in fractional days; evidence from after `as_of` is age 0.
#[must_use]
pub fn age_in_days(timestamp: DateTime<Utc>, as_of: DateTime<Utc>) -> f64 {
    let ms = (as_of - timestamp).num_milliseconds();
    (ms.max(0) as f64) / MS_PER_DAY
}

/// Decayed aggregates per proficiency level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelAggregates {
    pub knows: f64,
    pub understands: f64,
    pub applies: f64,
}

impl LevelAggregates {
    #[must_use]
    pub fn get(&self, level: ProficiencyLevel) -> f64 {
        match level {
            ProficiencyLevel::Knows => self.knows,
            ProficiencyLevel::Understands => self.understands,
            ProficiencyLevel::Applies => self.applies,
        }
    }

    /// Largest of the three aggregates.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.knows.max(self.understands).max(self.applies)
    }
}

/// Decayed contribution `w·c·decay` of one item to its level's numerator.
#[must_use]
pub fn decayed_contribution(
    evidence: &SkillEvidence,
    as_of: DateTime<Utc>,
    config: &DecayConfig,
) -> f64 {
    evidence.weight * evidence.confidence * config.factor(age_in_days(evidence.timestamp, as_of))
}

/// Weighted, decayed mean confidence for one skill at one level.
///
/// `Σ(w·c·decay) / Σ(w·decay)` over the matching evidence, or 0 when the
/// denominator is negligible (no evidence, zero weights, or everything
/// decayed away).
#[must_use]
pub fn aggregate_level(
    evidence: &[SkillEvidence],
    skill_id: &SkillId,
    level: ProficiencyLevel,
    as_of: DateTime<Utc>,
    config: &DecayConfig,
) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for e in evidence
        .iter()
        .filter(|e| &e.skill_id == skill_id && e.level == level)
    {
        let decay = config.factor(age_in_days(e.timestamp, as_of));
        numerator += e.weight * e.confidence * decay;
        denominator += e.weight * decay;
    }

    if denominator < NEGLIGIBLE_WEIGHT {
        return 0.0;
    }
    clamp_unit(numerator / denominator)
}

/// [`aggregate_level`] for every level.
#[must_use]
pub fn aggregate_levels(
    evidence: &[SkillEvidence],
    skill_id: &SkillId,
    as_of: DateTime<Utc>,
    config: &DecayConfig,
) -> LevelAggregates {
    LevelAggregates {
        knows: aggregate_level(evidence, skill_id, ProficiencyLevel::Knows, as_of, config),
        understands: aggregate_level(
            evidence,
            skill_id,
            ProficiencyLevel::Understands,
            as_of,
            config,
        ),
        applies: aggregate_level(evidence, skill_id, ProficiencyLevel::Applies, as_of, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::EvidenceSourceType;
    use crate::types::StudentId;
    use chrono::{Duration, TimeZone};
    use labtrace_core::{LabId, SessionId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap()
    }

    fn evidence(level: ProficiencyLevel, confidence: f64, weight: f64, age_days: i64) -> SkillEvidence {
        SkillEvidence {
            skill_id: SkillId::new("git"),
            student_id: StudentId::new("stu"),
            level,
            confidence,
            weight,
            source_type: EvidenceSourceType::TaskCompletion,
            source_id: "step".into(),
            lab_id: LabId::new("lab"),
            session_id: SessionId::new("s"),
            timestamp: now() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = DecayConfig::default();
        assert_eq!(config.half_life_days, 60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_half_life_validation() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = DecayConfig {
                half_life_days: bad,
            };
            assert!(matches!(
                config.validate(),
                Err(ProficiencyError::InvalidHalfLife(_))
            ));
        }
    }

    #[test]
    fn test_decay_factor_anchors() {
        assert!((decay_factor(0.0, 60.0) - 1.0).abs() < 1e-12);
        assert!((decay_factor(60.0, 60.0) - 0.5).abs() < 1e-12);
        assert!((decay_factor(120.0, 60.0) - 0.25).abs() < 1e-12);
        assert_eq!(decay_factor(-5.0, 60.0), 1.0);
    }

    #[test]
    fn test_future_evidence_counts_as_fresh() {
        assert_eq!(age_in_days(now() + Duration::days(3), now()), 0.0);
        assert!((age_in_days(now() - Duration::hours(36), now()) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_evidence_aggregates_to_zero() {
        let agg = aggregate_levels(&[], &SkillId::new("git"), now(), &DecayConfig::default());
        assert_eq!(agg, LevelAggregates::default());
    }

    #[test]
    fn test_zero_weight_aggregates_to_zero_not_nan() {
        let items = vec![evidence(ProficiencyLevel::Knows, 0.9, 0.0, 1)];
        let value = aggregate_level(
            &items,
            &SkillId::new("git"),
            ProficiencyLevel::Knows,
            now(),
            &DecayConfig::default(),
        );
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_fully_decayed_evidence_aggregates_to_zero() {
        let items = vec![evidence(ProficiencyLevel::Knows, 0.9, 1.0, 365 * 50)];
        let config = DecayConfig {
            half_life_days: 1.0,
        };
        let value = aggregate_level(&items, &SkillId::new("git"), ProficiencyLevel::Knows, now(), &config);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_levels_aggregate_independently() {
        let items = vec![
            evidence(ProficiencyLevel::Applies, 0.9, 1.0, 0),
            evidence(ProficiencyLevel::Understands, 0.4, 1.0, 0),
        ];

        let agg = aggregate_levels(&items, &SkillId::new("git"), now(), &DecayConfig::default());

        assert!((agg.applies - 0.9).abs() < 1e-12);
        assert!((agg.understands - 0.4).abs() < 1e-12);
        assert_eq!(agg.knows, 0.0);
        assert!((agg.max() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_lone_stale_item_keeps_its_confidence() {
        let items = vec![evidence(ProficiencyLevel::Applies, 0.9, 1.0, 60)];

        let value = aggregate_level(
            &items,
            &SkillId::new("git"),
            ProficiencyLevel::Applies,
            now(),
            &DecayConfig::default(),
        );

        assert!((value - 0.9).abs() < 1e-12);
        // Its share of the numerator is what decays
        let contribution = decayed_contribution(&items[0], now(), &DecayConfig::default());
        assert!((contribution - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_ages_weight_fresh_evidence_more() {
        let items = vec![
            evidence(ProficiencyLevel::Knows, 1.0, 1.0, 0),
            evidence(ProficiencyLevel::Knows, 0.4, 1.0, 60),
            evidence(ProficiencyLevel::Knows, 0.1, 1.0, 120),
        ];

        let value = aggregate_level(
            &items,
            &SkillId::new("git"),
            ProficiencyLevel::Knows,
            now(),
            &DecayConfig::default(),
        );

        // (1.0 + 0.4 * 0.5 + 0.1 * 0.25) / (1.0 + 0.5 + 0.25)
        assert!((value - 1.225 / 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_old_strong_evidence_does_not_lower_fresh_result() {
        let fresh = vec![evidence(ProficiencyLevel::Applies, 1.0, 1.0, 0)];
        let mut both = fresh.clone();
        both.push(evidence(ProficiencyLevel::Applies, 1.0, 1.0, 365));
        let skill = SkillId::new("git");
        let config = DecayConfig::default();

        let alone = aggregate_level(&fresh, &skill, ProficiencyLevel::Applies, now(), &config);
        let combined = aggregate_level(&both, &skill, ProficiencyLevel::Applies, now(), &config);

        assert!((alone - 1.0).abs() < 1e-12);
        assert!((combined - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_inputs_stay_bounded() {
        let items = vec![evidence(ProficiencyLevel::Knows, 5.0, 1.0, 0)];
        let value = aggregate_level(
            &items,
            &SkillId::new("git"),
            ProficiencyLevel::Knows,
            now(),
            &DecayConfig::default(),
        );
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_weights_scale_contributions() {
        let items = vec![
            evidence(ProficiencyLevel::Knows, 1.0, 0.75, 0),
            evidence(ProficiencyLevel::Knows, 0.2, 0.25, 0),
        ];

        let value = aggregate_level(
            &items,
            &SkillId::new("git"),
            ProficiencyLevel::Knows,
            now(),
            &DecayConfig::default(),
        );

        // (0.75 * 1.0 + 0.25 * 0.2) / (0.75 + 0.25)
        assert!((value - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_other_skills_are_ignored() {
        let mut other = evidence(ProficiencyLevel::Knows, 0.2, 1.0, 0);
        other.skill_id = SkillId::new("shell");
        let items = vec![evidence(ProficiencyLevel::Knows, 0.8, 1.0, 0), other];

        let value = aggregate_level(
            &items,
            &SkillId::new("git"),
            ProficiencyLevel::Knows,
            now(),
            &DecayConfig::default(),
        );

        assert!((value - 0.8).abs() < 1e-12);
    }
}
