//! Per-step metric aggregation.
//!
//! Folds a session's telemetry into one [`StepMetrics`] per step. The fold
//! visits events in `(timestamp, position)` order, so the result does not
//! depend on the order in which events arrived; "first write wins" fields
//! therefore hold the earliest observation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::events::{EventKind, EvidenceSource, TelemetryEvent};
use crate::types::{EventId, SessionId, StepId};

/// Intermediate summary of one step within one session.
///
/// Created fresh on every aggregation run and never persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Hints revealed (highest hint index seen + 1)
    pub hints_revealed: u32,
    /// Largest `total_hints` reported by any hint event
    pub total_hints: u32,
    pub solution_viewed: bool,
    /// Passing and failing checks
    pub check_attempts: u32,
    pub passed: bool,
    /// When the step first passed
    pub passed_at: Option<DateTime<Utc>>,
    pub pass_source: Option<EvidenceSource>,
    /// Earliest step_started
    pub started_at: Option<DateTime<Utc>>,
    /// Latest completion marker (step_completed or correct answer)
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_source: Option<EvidenceSource>,
    pub question_attempts: u32,
    pub question_correct: bool,
    /// Every event that touched this step, in fold order
    pub event_ids: Vec<EventId>,
}

impl StepMetrics {
    /// Check attempts plus question attempts.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.check_attempts + self.question_attempts
    }

    /// Attempts beyond the first.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.attempts().saturating_sub(1)
    }

    /// One attempt, passed, with no hints and no solution view.
    #[must_use]
    pub fn is_first_try_success(&self) -> bool {
        self.passed && self.attempts() == 1 && self.hints_revealed == 0 && !self.solution_viewed
    }

    /// When the step was finished: the completion marker, or else the first passing check.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.or(self.passed_at)
    }

    /// Apply one event to this step's metrics.
    pub fn apply(&mut self, event: &TelemetryEvent) {
        self.event_ids.push(event.id);

        match &event.event {
            EventKind::HintRequested {
                hint_index,
                total_hints,
            } => {
                self.hints_revealed = self.hints_revealed.max(hint_index.saturating_add(1));
                self.total_hints = self.total_hints.max(*total_hints);
            }
            EventKind::SolutionViewed => {
                self.solution_viewed = true;
            }
            EventKind::CheckPassed { source } => {
                self.check_attempts += 1;
                if !self.passed {
                    self.passed = true;
                    self.passed_at = Some(event.timestamp);
                    self.pass_source = Some(*source);
                }
            }
            EventKind::CheckFailed { .. } => {
                self.check_attempts += 1;
            }
            EventKind::StepStarted => {
                if self.started_at.is_none() {
                    self.started_at = Some(event.timestamp);
                }
            }
            EventKind::StepCompleted { source } => {
                self.completed_at = Some(event.timestamp);
                self.completion_source = *source;
            }
            EventKind::QuestionAnswered { is_correct, .. } => {
                self.question_attempts += 1;
                if *is_correct {
                    self.question_correct = true;
                    self.completed_at = Some(event.timestamp);
                    self.completion_source = Some(EvidenceSource::Question);
                    if !self.passed {
                        self.passed = true;
                        self.passed_at = Some(event.timestamp);
                        self.pass_source = Some(EvidenceSource::Question);
                    }
                }
            }
            EventKind::SessionStarted | EventKind::SessionEnded => {}
        }
    }
}

/// Events sorted by timestamp, ties broken by position in the input.
pub(crate) fn in_fold_order(events: &[TelemetryEvent]) -> Vec<&TelemetryEvent> {
    let mut ordered: Vec<&TelemetryEvent> = events.iter().collect();
    // Stable sort keeps input order for equal timestamps
    ordered.sort_by_key(|e| e.timestamp);
    ordered
}

/// Fold events into one [`StepMetrics`] per step.
///
/// When `session` is given, events from other sessions are ignored. Events
/// without a step id are ignored.
#[must_use]
pub fn aggregate_step_metrics(
    events: &[TelemetryEvent],
    session: Option<&SessionId>,
) -> BTreeMap<StepId, StepMetrics> {
    let mut steps: BTreeMap<StepId, StepMetrics> = BTreeMap::new();

    for event in in_fold_order(events) {
        if let Some(session) = session
            && &event.session_id != session
        {
            continue;
        }

        let Some(step_id) = &event.step_id else {
            if event.event.requires_step() {
                trace!(event_id = %event.id, kind = event.kind_name(), "Ignoring step event without step id");
            }
            continue;
        };

        steps.entry(step_id.clone()).or_default().apply(event);
    }

    steps
}
