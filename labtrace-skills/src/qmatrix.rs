//! The Q-matrix: which lab steps evidence which skills, at what level.
//!
//! Rows come from lab authoring data and are treated as an immutable
//! lookup table once constructed.

use std::collections::BTreeMap;

use labtrace_core::{LabId, StepId};
use serde::{Deserialize, Serialize};

use crate::error::{ProficiencyError, Result};
use crate::types::{ProficiencyLevel, SkillId};

/// One step-to-skill mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QMatrixEntry {
    pub lab_id: LabId,
    pub step_id: StepId,
    pub skill_id: SkillId,
    pub level: ProficiencyLevel,
    /// Contribution weight in `[0, 1]`
    pub weight: f64,
}

/// A (skill, level) pair a lab expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub skill_id: SkillId,
    pub level: ProficiencyLevel,
}

/// Skills a lab requires, used as a gap-analysis target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabRequirements {
    pub lab_id: LabId,
    pub requirements: Vec<SkillRequirement>,
}

/// Indexed Q-matrix.
#[derive(Debug, Clone, Default)]
pub struct QMatrix {
    rows: Vec<QMatrixEntry>,
    by_step: BTreeMap<(LabId, StepId), Vec<usize>>,
}

impl QMatrix {
    /// Build a Q-matrix, rejecting weights outside `[0, 1]`.
    pub fn new(rows: Vec<QMatrixEntry>) -> Result<Self> {
        let mut by_step: BTreeMap<(LabId, StepId), Vec<usize>> = BTreeMap::new();

        for (idx, row) in rows.iter().enumerate() {
            if !(row.weight.is_finite() && (0.0..=1.0).contains(&row.weight)) {
                return Err(ProficiencyError::InvalidWeight {
                    lab_id: row.lab_id.to_string(),
                    step_id: row.step_id.to_string(),
                    skill_id: row.skill_id.to_string(),
                    weight: row.weight,
                });
            }
            by_step
                .entry((row.lab_id.clone(), row.step_id.clone()))
                .or_default()
                .push(idx);
        }

        Ok(Self { rows, by_step })
    }

    /// Rows matching a lab step, in declaration order.
    #[must_use]
    pub fn rows_for(&self, lab_id: &LabId, step_id: &StepId) -> Vec<&QMatrixEntry> {
        self.by_step
            .get(&(lab_id.clone(), step_id.clone()))
            .map(|idxs| idxs.iter().map(|&idx| &self.rows[idx]).collect())
            .unwrap_or_default()
    }

    /// Distinct skills of a lab, each at the highest level any of its steps evidences.
    #[must_use]
    pub fn lab_requirements(&self, lab_id: &LabId) -> LabRequirements {
        let mut highest: BTreeMap<&SkillId, ProficiencyLevel> = BTreeMap::new();
        for row in self.rows.iter().filter(|r| &r.lab_id == lab_id) {
            highest
                .entry(&row.skill_id)
                .and_modify(|level| *level = (*level).max(row.level))
                .or_insert(row.level);
        }

        LabRequirements {
            lab_id: lab_id.clone(),
            requirements: highest
                .into_iter()
                .map(|(skill_id, level)| SkillRequirement {
                    skill_id: skill_id.clone(),
                    level,
                })
                .collect(),
        }
    }

    pub fn rows(&self) -> &[QMatrixEntry] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
