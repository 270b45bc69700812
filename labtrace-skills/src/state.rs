//! Per-student, per-skill state.
//!
//! A [`SkillState`] is a disposable view recomputed wholesale from the full
//! evidence history on every query. Nothing is patched incrementally, so
//! recomputing with the same evidence and `as_of` instant always yields the
//! same state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::ProficiencyConfig;
use crate::decay::{DecayConfig, LevelAggregates, aggregate_levels};
use crate::error::Result;
use crate::level::resolve_level;
use crate::mapping::SkillEvidence;
use crate::types::{MasteryLevel, ProficiencyLevel, SkillId, StudentId};

/// Derived proficiency of one student in one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillState {
    pub student_id: StudentId,
    pub skill_id: SkillId,
    /// Self-reported level, if any
    pub declared_level: Option<ProficiencyLevel>,
    pub current_level: MasteryLevel,
    /// Aggregate at the achieved level, or the best raw aggregate when unassessed
    pub demonstrated_confidence: f64,
    /// Evidence items across all levels
    pub evidence_count: usize,
    pub last_evidence_at: Option<DateTime<Utc>>,
    pub aggregates: LevelAggregates,
    /// Reference instant used for decay
    pub as_of: DateTime<Utc>,
}

/// Resolves skill states under a validated [`ProficiencyConfig`].
#[derive(Debug, Clone)]
pub struct SkillStateResolver {
    config: ProficiencyConfig,
    decay: DecayConfig,
}

impl SkillStateResolver {
    /// Create a resolver, rejecting invalid thresholds or half-life.
    pub fn new(config: ProficiencyConfig) -> Result<Self> {
        config.validate()?;
        let decay = config.decay();
        Ok(Self { config, decay })
    }

    pub fn config(&self) -> &ProficiencyConfig {
        &self.config
    }

    /// State for one skill from the student's evidence.
    ///
    /// Evidence for other students or skills is ignored.
    #[must_use]
    pub fn resolve(
        &self,
        student_id: &StudentId,
        skill_id: &SkillId,
        evidence: &[SkillEvidence],
        declared_level: Option<ProficiencyLevel>,
        as_of: DateTime<Utc>,
    ) -> SkillState {
        let relevant: Vec<SkillEvidence> = evidence
            .iter()
            .filter(|e| &e.student_id == student_id && &e.skill_id == skill_id)
            .cloned()
            .collect();

        let aggregates = aggregate_levels(&relevant, skill_id, as_of, &self.decay);
        let (current_level, demonstrated_confidence) =
            resolve_level(&aggregates, &self.config.thresholds);

        SkillState {
            student_id: student_id.clone(),
            skill_id: skill_id.clone(),
            declared_level,
            current_level,
            demonstrated_confidence,
            evidence_count: relevant.len(),
            last_evidence_at: relevant.iter().map(|e| e.timestamp).max(),
            aggregates,
            as_of,
        }
    }

    /// States for every skill the student has evidence for or has declared.
    #[instrument(skip(self, evidence, declared), fields(evidence = evidence.len()))]
    pub fn resolve_all(
        &self,
        student_id: &StudentId,
        evidence: &[SkillEvidence],
        declared: &BTreeMap<SkillId, ProficiencyLevel>,
        as_of: DateTime<Utc>,
    ) -> BTreeMap<SkillId, SkillState> {
        let skills: BTreeSet<&SkillId> = evidence
            .iter()
            .filter(|e| &e.student_id == student_id)
            .map(|e| &e.skill_id)
            .chain(declared.keys())
            .collect();

        let states: BTreeMap<SkillId, SkillState> = skills
            .into_iter()
            .map(|skill_id| {
                let state = self.resolve(
                    student_id,
                    skill_id,
                    evidence,
                    declared.get(skill_id).copied(),
                    as_of,
                );
                (skill_id.clone(), state)
            })
            .collect();

        debug!(skills = states.len(), "Resolved skill states");
        states
    }

    /// [`resolve_all`](Self::resolve_all) for many students in parallel.
    ///
    /// Students share nothing, so each is resolved on its own rayon task.
    #[must_use]
    pub fn resolve_students(
        &self,
        evidence_by_student: &BTreeMap<StudentId, Vec<SkillEvidence>>,
        as_of: DateTime<Utc>,
    ) -> BTreeMap<StudentId, BTreeMap<SkillId, SkillState>> {
        let no_declared = BTreeMap::new();
        evidence_by_student
            .par_iter()
            .map(|(student_id, evidence)| {
                let states = self.resolve_all(student_id, evidence, &no_declared, as_of);
                (student_id.clone(), states)
            })
            .collect()
    }
}

impl Default for SkillStateResolver {
    fn default() -> Self {
        let config = ProficiencyConfig::default();
        let decay = config.decay();
        Self { config, decay }
    }
}

/// Group a flat evidence list by student.
#[must_use]
pub fn group_by_student(evidence: &[SkillEvidence]) -> BTreeMap<StudentId, Vec<SkillEvidence>> {
    let mut grouped: BTreeMap<StudentId, Vec<SkillEvidence>> = BTreeMap::new();
    for e in evidence {
        grouped.entry(e.student_id.clone()).or_default().push(e.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProficiencyError;
    use crate::level::ProficiencyThresholds;
    use crate::mapping::EvidenceSourceType;
    use chrono::{Duration, TimeZone};
    use labtrace_core::{LabId, SessionId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    fn evidence(
        student: &str,
        skill: &str,
        level: ProficiencyLevel,
        confidence: f64,
        age_days: i64,
    ) -> SkillEvidence {
        SkillEvidence {
            skill_id: SkillId::new(skill),
            student_id: StudentId::new(student),
            level,
            confidence,
            weight: 1.0,
            source_type: EvidenceSourceType::TaskCompletion,
            source_id: "step".into(),
            lab_id: LabId::new("lab"),
            session_id: SessionId::new("s"),
            timestamp: now() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ProficiencyConfig {
            thresholds: ProficiencyThresholds {
                knows: 0.6,
                understands: 0.5,
                applies: 0.7,
            },
            ..ProficiencyConfig::default()
        };
        assert!(matches!(
            SkillStateResolver::new(config),
            Err(ProficiencyError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn test_counts_and_last_evidence_span_all_levels() {
        let resolver = SkillStateResolver::default();
        let items = vec![
            evidence("stu", "git", ProficiencyLevel::Knows, 0.9, 10),
            evidence("stu", "git", ProficiencyLevel::Applies, 0.2, 2),
            evidence("stu", "shell", ProficiencyLevel::Applies, 1.0, 0),
            evidence("other", "git", ProficiencyLevel::Applies, 1.0, 0),
        ];

        let state = resolver.resolve(
            &StudentId::new("stu"),
            &SkillId::new("git"),
            &items,
            Some(ProficiencyLevel::Understands),
            now(),
        );

        assert_eq!(state.evidence_count, 2);
        assert_eq!(state.last_evidence_at, Some(now() - Duration::days(2)));
        assert_eq!(state.current_level, MasteryLevel::Knows);
        assert_eq!(state.declared_level, Some(ProficiencyLevel::Understands));
    }

    #[test]
    fn test_resolve_all_includes_declared_only_skills() {
        let resolver = SkillStateResolver::default();
        let items = vec![evidence("stu", "git", ProficiencyLevel::Understands, 0.8, 0)];
        let declared = BTreeMap::from([(SkillId::new("docker"), ProficiencyLevel::Applies)]);

        let states = resolver.resolve_all(&StudentId::new("stu"), &items, &declared, now());

        assert_eq!(states.len(), 2);
        let docker = &states[&SkillId::new("docker")];
        assert_eq!(docker.current_level, MasteryLevel::Unassessed);
        assert_eq!(docker.evidence_count, 0);
        assert_eq!(docker.declared_level, Some(ProficiencyLevel::Applies));
        assert_eq!(
            states[&SkillId::new("git")].current_level,
            MasteryLevel::Understands
        );
    }

    #[test]
    fn test_resolve_students_matches_sequential() {
        let resolver = SkillStateResolver::default();
        let items = vec![
            evidence("a", "git", ProficiencyLevel::Applies, 0.9, 5),
            evidence("b", "git", ProficiencyLevel::Knows, 0.4, 30),
            evidence("b", "shell", ProficiencyLevel::Understands, 0.6, 1),
            evidence("c", "net", ProficiencyLevel::Applies, 0.9, 200),
        ];
        let grouped = group_by_student(&items);

        let parallel = resolver.resolve_students(&grouped, now());

        assert_eq!(parallel.len(), 3);
        for (student, evidence) in &grouped {
            let sequential = resolver.resolve_all(student, evidence, &BTreeMap::new(), now());
            assert_eq!(parallel[student], sequential);
        }
    }

    #[test]
    fn test_recompute_is_stable() {
        let resolver = SkillStateResolver::default();
        let items = vec![
            evidence("stu", "git", ProficiencyLevel::Applies, 0.9, 45),
            evidence("stu", "git", ProficiencyLevel::Understands, 0.7, 3),
        ];
        let student = StudentId::new("stu");

        let first = resolver.resolve_all(&student, &items, &BTreeMap::new(), now());
        let second = resolver.resolve_all(&student, &items, &BTreeMap::new(), now());

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
