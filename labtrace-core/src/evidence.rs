//! Task evidence: one scored record per step per session.
//!
//! Evidence is rebuilt from scratch on every pass over the event log. A
//! longer slice produces a new record that supersedes the old one; records
//! are never edited in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::{ScoreModifier, evaluate_confidence};
use crate::events::{EvidenceSource, TelemetryEvent};
use crate::metrics::{StepMetrics, in_fold_order};
use crate::policy::ScoringPolicy;
use crate::types::{EventId, SessionId, StepId};

/// Progress state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Nothing observed yet
    Pending,
    /// Started, no attempt made
    InProgress,
    /// At least one attempt, not passed
    Partial,
    /// Passed
    Completed,
}

impl TaskStatus {
    /// Derive status from metrics: completed, else partial, else in progress, else pending.
    #[must_use]
    pub fn from_metrics(metrics: &StepMetrics) -> Self {
        if metrics.passed {
            Self::Completed
        } else if metrics.attempts() > 0 {
            Self::Partial
        } else if metrics.started_at.is_some() {
            Self::InProgress
        } else {
            Self::Pending
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Partial => "partial",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored evidence for one step in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvidence {
    pub step_id: StepId,
    pub session_id: SessionId,
    pub status: TaskStatus,
    /// Confidence in `[0, 1]`; 0 unless completed
    pub confidence: f64,
    pub modifiers: Vec<ScoreModifier>,
    /// Events that contributed to this record
    pub source_event_ids: Vec<EventId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Milliseconds between start and completion, when both are known
    pub time_spent_ms: Option<i64>,
    pub attempts: u32,
    pub hints_used: u32,
    pub solution_viewed: bool,
    pub pass_source: Option<EvidenceSource>,
    /// Human-readable summary of how the confidence was reached
    pub explanation: String,
}

impl TaskEvidence {
    /// Evidence for a roster step with no observed events.
    #[must_use]
    pub fn pending(step_id: StepId, session_id: SessionId) -> Self {
        build_task_evidence(step_id, session_id, &StepMetrics::default(), &ScoringPolicy::standard())
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Combine a step's metrics and the policy into a [`TaskEvidence`].
#[must_use]
pub fn build_task_evidence(
    step_id: StepId,
    session_id: SessionId,
    metrics: &StepMetrics,
    policy: &ScoringPolicy,
) -> TaskEvidence {
    let status = TaskStatus::from_metrics(metrics);

    let (confidence, modifiers) = if status == TaskStatus::Completed {
        let result = evaluate_confidence(metrics, policy);
        (result.confidence, result.modifiers)
    } else {
        (0.0, Vec::new())
    };

    let completed_at = metrics.finished_at();
    // A restart logged after the pass leaves no meaningful duration
    let time_spent_ms = match (metrics.started_at, completed_at) {
        (Some(start), Some(end)) if end >= start => Some((end - start).num_milliseconds()),
        _ => None,
    };

    let explanation = explain(status, confidence, &modifiers, metrics);

    TaskEvidence {
        step_id,
        session_id,
        status,
        confidence,
        modifiers,
        source_event_ids: metrics.event_ids.clone(),
        started_at: metrics.started_at,
        completed_at,
        time_spent_ms,
        attempts: metrics.attempts(),
        hints_used: metrics.hints_revealed,
        solution_viewed: metrics.solution_viewed,
        pass_source: metrics.pass_source,
        explanation,
    }
}

fn explain(
    status: TaskStatus,
    confidence: f64,
    modifiers: &[ScoreModifier],
    metrics: &StepMetrics,
) -> String {
    match status {
        TaskStatus::Completed => {
            let via = metrics
                .pass_source
                .map(|s| format!(" via {s}"))
                .unwrap_or_default();
            if modifiers.is_empty() {
                format!("Completed{via} with confidence {confidence:.2}")
            } else {
                let parts: Vec<String> = modifiers
                    .iter()
                    .map(|m| format!("{} ({:+.2})", m.note, m.delta))
                    .collect();
                format!(
                    "Completed{via} with confidence {confidence:.2}: {}",
                    parts.join(", ")
                )
            }
        }
        TaskStatus::Partial => format!(
            "Not yet passed after {} attempt{}, {} hint{} revealed",
            metrics.attempts(),
            if metrics.attempts() == 1 { "" } else { "s" },
            metrics.hints_revealed,
            if metrics.hints_revealed == 1 { "" } else { "s" },
        ),
        TaskStatus::InProgress => "Started, no attempts yet".to_string(),
        TaskStatus::Pending => "No activity recorded".to_string(),
    }
}

/// One contributing event in a [`ScoreTrace`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub summary: String,
}

/// Evidence for one step together with the events and rules behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTrace {
    pub policy_id: String,
    pub evidence: TaskEvidence,
    pub entries: Vec<TraceEntry>,
}

/// Build the score trace for a single step of a session.
#[must_use]
pub fn trace_step(
    events: &[TelemetryEvent],
    session_id: &SessionId,
    step_id: &StepId,
    policy: &ScoringPolicy,
) -> ScoreTrace {
    let mut metrics = StepMetrics::default();
    let mut entries = Vec::new();

    for event in in_fold_order(events) {
        if &event.session_id != session_id || event.step_id.as_ref() != Some(step_id) {
            continue;
        }
        metrics.apply(event);
        entries.push(TraceEntry {
            event_id: event.id,
            timestamp: event.timestamp,
            kind: event.kind_name().to_string(),
            summary: event.describe(),
        });
    }

    ScoreTrace {
        policy_id: policy.id.clone(),
        evidence: build_task_evidence(step_id.clone(), session_id.clone(), &metrics, policy),
        entries,
    }
}
