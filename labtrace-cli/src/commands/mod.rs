//! Subcommands and the input helpers they share.

pub mod config;
pub mod map;
pub mod presets;
pub mod replay;
pub mod score;
pub mod skills;
pub mod trace;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use labtrace_core::{EventLog, SessionId, StepRoster, TelemetryEvent};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

/// Output format for commands that print results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Event log, roster and session selection shared by the scoring commands.
#[derive(Args, Debug)]
pub struct SessionInput {
    /// Telemetry event log (JSON Lines)
    #[arg(long)]
    pub events: PathBuf,

    /// Step roster of the lab (JSON)
    #[arg(long)]
    pub roster: PathBuf,

    /// Session to score; required when the log holds several
    #[arg(long)]
    pub session: Option<String>,
}

/// A decoded session ready for scoring.
pub struct LoadedSession {
    pub events: Vec<TelemetryEvent>,
    pub roster: StepRoster,
    pub session_id: SessionId,
}

impl SessionInput {
    pub fn load(&self) -> Result<LoadedSession> {
        let events = load_events(&self.events)?;
        let roster: StepRoster = load_json(&self.roster)?;
        let session_id = select_session(&events, self.session.as_deref())?;
        Ok(LoadedSession {
            events,
            roster,
            session_id,
        })
    }
}

/// Decode a JSON Lines event log, skipping malformed lines.
pub fn load_events(path: &Path) -> Result<Vec<TelemetryEvent>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event log {}", path.display()))?;
    let parsed = EventLog::parse_jsonl(&text);
    if !parsed.skipped.is_empty() {
        warn!(
            skipped = parsed.skipped.len(),
            path = %path.display(),
            "Some telemetry records were malformed and skipped"
        );
    }
    info!(events = parsed.events.len(), "Loaded event log");
    Ok(parsed.events)
}

/// Read and decode a JSON document.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pick the session to score: the one requested, or the only one in the log.
pub fn select_session(events: &[TelemetryEvent], requested: Option<&str>) -> Result<SessionId> {
    if let Some(id) = requested {
        return Ok(SessionId::new(id));
    }

    let sessions: BTreeSet<&SessionId> = events.iter().map(|e| &e.session_id).collect();
    let sessions: Vec<&SessionId> = sessions.into_iter().collect();
    match sessions.as_slice() {
        [] => bail!("Event log contains no events; pass --session to score an empty session"),
        [only] => Ok((*only).clone()),
        many => {
            let ids: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
            bail!(
                "Event log contains {} sessions ({}); choose one with --session",
                ids.len(),
                ids.join(", ")
            )
        }
    }
}

/// Table with the house style: condensed UTF-8 borders, cyan headers.
pub fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_confidence(value: f64) -> String {
    format!("{value:.2}")
}

pub fn format_duration_ms(ms: Option<i64>) -> String {
    match ms {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{ms}ms"),
        Some(ms) if ms < 60_000 => format!("{}s", ms / 1000),
        Some(ms) => format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000),
    }
}
