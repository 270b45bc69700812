//! Telemetry event types.
//!
//! Events are the source of truth for everything the scoring pipeline
//! produces. They are appended by the session drivers and never mutated;
//! step metrics, task evidence and lab progress are all pure folds over a
//! slice of this log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EventId, SessionId, StepId};

/// Where a piece of completion evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// A command the student ran matched the expected pattern
    Command,
    /// A check script reported success or failure
    CheckScript,
    /// The tutor marked the step
    Tutor,
    /// A knowledge-check question was answered
    Question,
}

impl EvidenceSource {
    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::CheckScript => "check_script",
            Self::Tutor => "tutor",
            Self::Question => "question",
        }
    }
}

impl std::fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific payload of a telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The lab session was opened
    SessionStarted,

    /// The lab session was closed
    SessionEnded,

    /// The student navigated to a step
    StepStarted,

    /// The step was marked complete by the session driver
    StepCompleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<EvidenceSource>,
    },

    /// A hint was revealed
    HintRequested { hint_index: u32, total_hints: u32 },

    /// The reference solution was revealed
    SolutionViewed,

    /// A verification check succeeded
    CheckPassed { source: EvidenceSource },

    /// A verification check failed
    CheckFailed { source: EvidenceSource },

    /// A knowledge-check question was answered
    QuestionAnswered {
        #[serde(default)]
        selected: Vec<String>,
        #[serde(default)]
        correct_options: Vec<String>,
        is_correct: bool,
        attempt: u32,
    },
}

impl EventKind {
    /// The wire tag for this event kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::SessionEnded => "session_ended",
            Self::StepStarted => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::HintRequested { .. } => "hint_requested",
            Self::SolutionViewed => "solution_viewed",
            Self::CheckPassed { .. } => "check_passed",
            Self::CheckFailed { .. } => "check_failed",
            Self::QuestionAnswered { .. } => "question_answered",
        }
    }

    /// Whether this kind only makes sense when attached to a step.
    #[must_use]
    pub fn requires_step(&self) -> bool {
        !matches!(self, Self::SessionStarted | Self::SessionEnded)
    }
}

/// One immutable entry of the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Globally unique event identifier
    pub id: EventId,
    /// Session the event belongs to
    pub session_id: SessionId,
    /// Step the event refers to, when it refers to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// The event payload
    pub event: EventKind,
}

impl TelemetryEvent {
    /// Create an event with a fresh UUIDv7 identifier.
    #[must_use]
    pub fn new(
        session_id: impl Into<SessionId>,
        step_id: Option<StepId>,
        timestamp: DateTime<Utc>,
        event: EventKind,
    ) -> Self {
        Self {
            id: EventId::new(),
            session_id: session_id.into(),
            step_id,
            timestamp,
            event,
        }
    }

    /// The wire tag of the payload.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.event.name()
    }

    /// One-line human-readable summary, used by score traces.
    #[must_use]
    pub fn describe(&self) -> String {
        let step = self
            .step_id
            .as_ref()
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();

        let what = match &self.event {
            EventKind::SessionStarted => "session started".to_string(),
            EventKind::SessionEnded => "session ended".to_string(),
            EventKind::StepStarted => "step started".to_string(),
            EventKind::StepCompleted { source: Some(source) } => {
                format!("step completed (via {source})")
            }
            EventKind::StepCompleted { source: None } => "step completed".to_string(),
            EventKind::HintRequested {
                hint_index,
                total_hints,
            } => format!(
                "hint {} of {} revealed",
                hint_index.saturating_add(1),
                total_hints
            ),
            EventKind::SolutionViewed => "solution viewed".to_string(),
            EventKind::CheckPassed { source } => format!("check passed ({source})"),
            EventKind::CheckFailed { source } => format!("check failed ({source})"),
            EventKind::QuestionAnswered {
                is_correct,
                attempt,
                ..
            } => {
                let verdict = if *is_correct { "correct" } else { "incorrect" };
                format!("question answered {verdict} on attempt {attempt}")
            }
        };

        format!("{}{step}: {what}", self.timestamp.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}
