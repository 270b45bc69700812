//! Scoring core for labtrace.
//!
//! Turns a log of lab telemetry (hints, checks, solution views, quiz
//! answers) into per-step task evidence and a lab-level progress summary.
//!
//! # Architecture
//!
//! The pipeline is a pure function of the event log and a scoring policy:
//!
//! - **Events** ([`TelemetryEvent`]) are append-only and are the source of truth
//! - **Metrics** ([`StepMetrics`]) fold a session's events per step
//! - **Confidence** ([`evaluate_confidence`]) applies the policy's modifiers
//! - **Evidence** ([`TaskEvidence`]) and **progress** ([`LabProgress`]) are
//!   rebuilt from scratch on every pass, so rescoring under another policy
//!   never mutates anything

mod confidence;
mod error;
mod events;
mod evidence;
mod log;
mod metrics;
mod policy;
mod progress;
pub mod types;

// Error types
pub use error::{Result, ScoringError};

// Event types
pub use events::{EventKind, EvidenceSource, TelemetryEvent};

// Log ingestion
pub use log::{EventLog, ParsedLog, SkippedRecord};

// Policy types
pub use policy::{
    DEFAULT_PRESET, HintPenalty, PolicyRegistry, PresetFile, RetryPenalty, ScoringPolicy,
    SolutionPenalty,
};

// Scoring pipeline
pub use confidence::{
    BASE_CONFIDENCE, ConfidenceResult, ModifierKind, ScoreModifier, clamp_unit,
    evaluate_confidence,
};
pub use evidence::{ScoreTrace, TaskEvidence, TaskStatus, TraceEntry, build_task_evidence, trace_step};
pub use metrics::{StepMetrics, aggregate_step_metrics};
pub use progress::{LabProgress, RosterStep, Scorer, StepRoster, compute_lab_progress};

// ID types
pub use types::{EventId, LabId, SessionId, StepId};
