//! Projects completed-step evidence onto skills through the Q-matrix.

use chrono::{DateTime, Utc};
use labtrace_core::{LabId, LabProgress, SessionId, TaskStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProficiencyError, Result};
use crate::qmatrix::QMatrix;
use crate::types::{ProficiencyLevel, SkillId, StudentId};

/// What produced a piece of skill evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSourceType {
    /// A lab step reached completed status
    TaskCompletion,
}

/// One (step completion, skill, level) observation.
///
/// Append-only: records accumulate across sessions and are never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEvidence {
    pub skill_id: SkillId,
    pub student_id: StudentId,
    pub level: ProficiencyLevel,
    /// Copied from the producing task evidence
    pub confidence: f64,
    /// Copied from the Q-matrix row
    pub weight: f64,
    pub source_type: EvidenceSourceType,
    /// Step id for task completions
    pub source_id: String,
    pub lab_id: LabId,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
}

impl SkillEvidence {
    /// Reject confidence or weight outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("confidence", self.confidence), ("weight", self.weight)] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ProficiencyError::InvalidEvidence {
                    skill_id: self.skill_id.to_string(),
                    source_id: self.source_id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Emit one [`SkillEvidence`] per matching Q-matrix row for every completed step.
///
/// Partial and pending steps produce nothing, and so do completed steps the
/// Q-matrix does not cover.
#[must_use]
pub fn map_skill_evidence(
    progress: &LabProgress,
    student_id: &StudentId,
    qmatrix: &QMatrix,
) -> Vec<SkillEvidence> {
    let mut out = Vec::new();

    for task in progress
        .steps
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
    {
        let rows = qmatrix.rows_for(&progress.lab_id, &task.step_id);
        if rows.is_empty() {
            debug!(step_id = %task.step_id, lab_id = %progress.lab_id, "No Q-matrix rows for completed step");
            continue;
        }

        let Some(timestamp) = task.completed_at.or(progress.ended_at) else {
            warn!(step_id = %task.step_id, "Completed step has no timestamp, skipping");
            continue;
        };

        out.extend(rows.into_iter().map(|row| SkillEvidence {
            skill_id: row.skill_id.clone(),
            student_id: student_id.clone(),
            level: row.level,
            confidence: task.confidence,
            weight: row.weight,
            source_type: EvidenceSourceType::TaskCompletion,
            source_id: task.step_id.to_string(),
            lab_id: progress.lab_id.clone(),
            session_id: progress.session_id.clone(),
            timestamp,
        }));
    }

    out
}
