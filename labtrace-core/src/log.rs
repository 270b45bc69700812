//! Append-only telemetry log and JSON Lines ingestion.
//!
//! The log only grows: there is no API to edit or remove an event. Every
//! scoring pass reads a closed slice of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::TelemetryEvent;
use crate::types::{EventId, SessionId};

/// A log record that could not be decoded and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// 1-based line number in the source text
    pub line: usize,
    /// Decoder error message
    pub reason: String,
}

/// Result of decoding a JSON Lines event log.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    /// Successfully decoded events, in file order
    pub events: Vec<TelemetryEvent>,
    /// Records that were malformed and skipped
    pub skipped: Vec<SkippedRecord>,
}

/// In-memory append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<TelemetryEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its ID.
    pub fn append(&mut self, event: TelemetryEvent) -> EventId {
        let id = event.id;
        self.events.push(event);
        id
    }

    /// All events in append order.
    #[must_use]
    pub fn as_slice(&self) -> &[TelemetryEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events for one session, in append order.
    #[must_use]
    pub fn read_session(&self, session_id: &SessionId) -> Vec<TelemetryEvent> {
        Self::for_session(&self.events, session_id)
    }

    /// Events whose timestamp falls in `[start, end]`.
    #[must_use]
    pub fn read_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TelemetryEvent> {
        self.events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect()
    }

    /// Filter a slice down to one session.
    #[must_use]
    pub fn for_session(events: &[TelemetryEvent], session_id: &SessionId) -> Vec<TelemetryEvent> {
        events
            .iter()
            .filter(|e| &e.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Decode a JSON Lines document.
    ///
    /// Each non-blank line is decoded on its own. Malformed lines are
    /// reported in [`ParsedLog::skipped`] and never fail the batch.
    pub fn parse_jsonl(text: &str) -> ParsedLog {
        let mut parsed = ParsedLog::default();

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<TelemetryEvent>(trimmed) {
                Ok(event) => parsed.events.push(event),
                Err(e) => {
                    warn!(line = line_no, error = %e, "Skipping malformed telemetry record");
                    parsed.skipped.push(SkippedRecord {
                        line: line_no,
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            decoded = parsed.events.len(),
            skipped = parsed.skipped.len(),
            "Parsed telemetry log"
        );
        parsed
    }

    /// Build a log from already-decoded events.
    #[must_use]
    pub fn from_events(events: Vec<TelemetryEvent>) -> Self {
        Self { events }
    }
}
