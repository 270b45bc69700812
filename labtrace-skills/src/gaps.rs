//! Gap analysis against a target lab's required skills.

use std::collections::BTreeMap;

use labtrace_core::LabId;
use serde::{Deserialize, Serialize};

use crate::level::ProficiencyThresholds;
use crate::qmatrix::{LabRequirements, SkillRequirement};
use crate::state::SkillState;
use crate::types::{MasteryLevel, ProficiencyLevel, SkillId};

/// A requirement the student has not reached yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill_id: SkillId,
    pub required_level: ProficiencyLevel,
    pub current_level: MasteryLevel,
    pub demonstrated_confidence: f64,
    /// Threshold of the required level
    pub threshold: f64,
    /// `max(0, threshold - demonstrated_confidence)`
    pub gap: f64,
}

/// Outcome of comparing skill states to a lab's requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub lab_id: LabId,
    /// Unmet requirements, in requirement order
    pub gaps: Vec<SkillGap>,
    /// Requirements already met
    pub met: Vec<SkillRequirement>,
    /// True when every requirement is met
    pub ready: bool,
}

impl GapAnalysis {
    /// Sum of all numeric gaps.
    #[must_use]
    pub fn total_gap(&self) -> f64 {
        self.gaps.iter().map(|g| g.gap).sum()
    }
}

/// Compare current skill states against a lab's required (skill, level) pairs.
///
/// Skills missing from `states` count as unassessed with confidence 0.
#[must_use]
pub fn analyze_gaps(
    states: &BTreeMap<SkillId, SkillState>,
    requirements: &LabRequirements,
    thresholds: &ProficiencyThresholds,
) -> GapAnalysis {
    let mut gaps = Vec::new();
    let mut met = Vec::new();

    for req in &requirements.requirements {
        let (current_level, demonstrated) = states
            .get(&req.skill_id)
            .map(|s| (s.current_level, s.demonstrated_confidence))
            .unwrap_or((MasteryLevel::Unassessed, 0.0));

        if current_level.meets(req.level) {
            met.push(req.clone());
            continue;
        }

        let threshold = thresholds.threshold(req.level);
        gaps.push(SkillGap {
            skill_id: req.skill_id.clone(),
            required_level: req.level,
            current_level,
            demonstrated_confidence: demonstrated,
            threshold,
            gap: (threshold - demonstrated).max(0.0),
        });
    }

    GapAnalysis {
        lab_id: requirements.lab_id.clone(),
        ready: gaps.is_empty(),
        gaps,
        met,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::LevelAggregates;
    use crate::types::StudentId;
    use chrono::{TimeZone, Utc};

    fn state(skill: &str, level: MasteryLevel, confidence: f64) -> (SkillId, SkillState) {
        let skill_id = SkillId::new(skill);
        let state = SkillState {
            student_id: StudentId::new("stu"),
            skill_id: skill_id.clone(),
            declared_level: None,
            current_level: level,
            demonstrated_confidence: confidence,
            evidence_count: 1,
            last_evidence_at: None,
            aggregates: LevelAggregates::default(),
            as_of: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        (skill_id, state)
    }

    fn requirements(reqs: &[(&str, ProficiencyLevel)]) -> LabRequirements {
        LabRequirements {
            lab_id: LabId::new("lab-k8s"),
            requirements: reqs
                .iter()
                .map(|(skill, level)| SkillRequirement {
                    skill_id: SkillId::new(*skill),
                    level: *level,
                })
                .collect(),
        }
    }

    #[test]
    fn test_met_requirements_are_not_gaps() {
        let states = BTreeMap::from([state("git", MasteryLevel::Applies, 0.8)]);
        let reqs = requirements(&[("git", ProficiencyLevel::Understands)]);

        let analysis = analyze_gaps(&states, &reqs, &ProficiencyThresholds::default());

        assert!(analysis.ready);
        assert!(analysis.gaps.is_empty());
        assert_eq!(analysis.met.len(), 1);
    }

    #[test]
    fn test_gap_is_threshold_minus_confidence() {
        let states = BTreeMap::from([state("git", MasteryLevel::Understands, 0.55)]);
        let reqs = requirements(&[("git", ProficiencyLevel::Applies)]);

        let analysis = analyze_gaps(&states, &reqs, &ProficiencyThresholds::default());

        assert!(!analysis.ready);
        let gap = &analysis.gaps[0];
        assert_eq!(gap.threshold, 0.70);
        assert!((gap.gap - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_gap_clamps_at_zero() {
        // Understands level reached via a high aggregate, applies still missing
        let states = BTreeMap::from([state("git", MasteryLevel::Understands, 0.95)]);
        let reqs = requirements(&[("git", ProficiencyLevel::Applies)]);

        let analysis = analyze_gaps(&states, &reqs, &ProficiencyThresholds::default());

        assert_eq!(analysis.gaps[0].gap, 0.0);
        assert!(!analysis.ready);
    }

    #[test]
    fn test_missing_skill_is_full_gap() {
        let reqs = requirements(&[
            ("docker", ProficiencyLevel::Knows),
            ("helm", ProficiencyLevel::Applies),
        ]);

        let analysis = analyze_gaps(&BTreeMap::new(), &reqs, &ProficiencyThresholds::default());

        assert_eq!(analysis.gaps.len(), 2);
        assert_eq!(analysis.gaps[0].current_level, MasteryLevel::Unassessed);
        assert!((analysis.gaps[0].gap - 0.30).abs() < 1e-9);
        assert!((analysis.total_gap() - 1.0).abs() < 1e-9);
    }
}
