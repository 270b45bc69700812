//! Lab-level progress rollup.
//!
//! The step roster is supplied by the caller (it comes from the lab's
//! authoring data), so "0 of N completed" is distinguishable from "no
//! events seen". Events for steps outside the roster are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::events::{EventKind, TelemetryEvent};
use crate::evidence::{TaskEvidence, build_task_evidence};
use crate::metrics::{StepMetrics, aggregate_step_metrics};
use crate::policy::{PolicyRegistry, ScoringPolicy};
use crate::types::{LabId, SessionId, StepId};

fn default_weight() -> f64 {
    1.0
}

/// One step of a lab module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterStep {
    pub step_id: StepId,
    /// Relative weight in the overall score
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// The full ordered list of steps in a lab module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRoster {
    pub lab_id: LabId,
    pub steps: Vec<RosterStep>,
}

impl StepRoster {
    /// Roster with every step weighted 1.0.
    #[must_use]
    pub fn uniform(lab_id: impl Into<LabId>, steps: &[&str]) -> Self {
        Self {
            lab_id: lab_id.into(),
            steps: steps
                .iter()
                .map(|s| RosterStep {
                    step_id: StepId::new(*s),
                    weight: default_weight(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, step_id: &StepId) -> bool {
        self.steps.iter().any(|s| &s.step_id == step_id)
    }
}

/// Session-level score summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabProgress {
    pub session_id: SessionId,
    pub lab_id: LabId,
    pub policy_id: String,
    /// Evidence per roster step, in roster order
    pub steps: Vec<TaskEvidence>,
    /// Weighted mean confidence over completed steps
    pub overall_score: f64,
    /// Completed steps over roster size, in `[0, 100]`
    pub completion_percentage: f64,
    pub passed: bool,
    pub completed_steps: usize,
    pub total_steps: usize,
    /// Events in the session slice
    pub event_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl LabProgress {
    /// Evidence for one step, if it is on the roster.
    #[must_use]
    pub fn step(&self, step_id: &StepId) -> Option<&TaskEvidence> {
        self.steps.iter().find(|e| &e.step_id == step_id)
    }
}

/// Score one session against its roster.
#[instrument(skip(events, roster, policy), fields(lab_id = %roster.lab_id, policy = %policy.id))]
pub fn compute_lab_progress(
    events: &[TelemetryEvent],
    session_id: &SessionId,
    roster: &StepRoster,
    policy: &ScoringPolicy,
) -> LabProgress {
    let session_events: Vec<&TelemetryEvent> = events
        .iter()
        .filter(|e| &e.session_id == session_id)
        .collect();

    let metrics = aggregate_step_metrics(events, Some(session_id));
    for step_id in metrics.keys().filter(|s| !roster.contains(s)) {
        debug!(step_id = %step_id, "Ignoring events for step not on roster");
    }

    let empty = StepMetrics::default();
    let steps: Vec<TaskEvidence> = roster
        .steps
        .iter()
        .map(|rs| {
            let m = metrics.get(&rs.step_id).unwrap_or(&empty);
            build_task_evidence(rs.step_id.clone(), session_id.clone(), m, policy)
        })
        .collect();

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut completed_steps = 0;
    for (rs, evidence) in roster.steps.iter().zip(&steps) {
        if evidence.is_completed() {
            completed_steps += 1;
            let weight = rs.weight.max(0.0);
            weighted_sum += weight * evidence.confidence;
            weight_total += weight;
        }
    }

    let overall_score = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };

    let total_steps = roster.len();
    let completion_percentage = if total_steps == 0 {
        0.0
    } else {
        round2(completed_steps as f64 / total_steps as f64 * 100.0)
    };

    let passed = total_steps > 0
        && completed_steps == total_steps
        && overall_score >= policy.pass_threshold;

    let (started_at, ended_at) = session_bounds(&session_events);

    debug!(
        completed_steps,
        total_steps, overall_score, passed, "Computed lab progress"
    );

    LabProgress {
        session_id: session_id.clone(),
        lab_id: roster.lab_id.clone(),
        policy_id: policy.id.clone(),
        steps,
        overall_score,
        completion_percentage,
        passed,
        completed_steps,
        total_steps,
        event_count: session_events.len(),
        started_at,
        ended_at,
    }
}

/// Session start/end from lifecycle events, else first/last event timestamps.
fn session_bounds(events: &[&TelemetryEvent]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let first = events.iter().map(|e| e.timestamp).min();
    let last = events.iter().map(|e| e.timestamp).max();

    let started = events
        .iter()
        .filter(|e| matches!(e.event, EventKind::SessionStarted))
        .map(|e| e.timestamp)
        .min();
    let ended = events
        .iter()
        .filter(|e| matches!(e.event, EventKind::SessionEnded))
        .map(|e| e.timestamp)
        .max();

    (started.or(first), ended.or(last))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scoring facade over a preset registry.
///
/// Replaying a log under several presets is just scoring it several times;
/// the input slice is only ever borrowed.
#[derive(Debug, Clone)]
pub struct Scorer {
    registry: PolicyRegistry,
}

impl Scorer {
    #[must_use]
    pub fn new(registry: PolicyRegistry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Score a session under the named preset.
    pub fn score(
        &self,
        events: &[TelemetryEvent],
        session_id: &SessionId,
        roster: &StepRoster,
        preset_id: &str,
    ) -> Result<LabProgress> {
        let policy = self.registry.get(preset_id)?;
        Ok(compute_lab_progress(events, session_id, roster, policy))
    }

    /// Score the same session under each preset in turn.
    ///
    /// Fails before scoring anything if any preset id is unknown.
    pub fn replay(
        &self,
        events: &[TelemetryEvent],
        session_id: &SessionId,
        roster: &StepRoster,
        preset_ids: &[&str],
    ) -> Result<Vec<LabProgress>> {
        let policies = preset_ids
            .iter()
            .map(|id| self.registry.get(id))
            .collect::<Result<Vec<_>>>()?;

        Ok(policies
            .into_iter()
            .map(|policy| compute_lab_progress(events, session_id, roster, policy))
            .collect())
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(PolicyRegistry::builtin())
    }
}
