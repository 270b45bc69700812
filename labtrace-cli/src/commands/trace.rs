use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use labtrace_core::{ScoreTrace, StepId, trace_step};
use tracing::warn;

use super::{OutputFormat, SessionInput, format_confidence, print_json, styled_table};
use crate::config::LabtraceConfig;

#[derive(Args, Debug)]
pub struct TraceArgs {
    #[command(flatten)]
    pub input: SessionInput,

    /// Step to explain
    #[arg(long)]
    pub step: String,

    /// Scoring preset (defaults to the configured one)
    #[arg(long)]
    pub preset: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: TraceArgs, config: &LabtraceConfig) -> Result<()> {
    let session = args.input.load()?;
    let registry = config.registry()?;
    let preset = args
        .preset
        .as_deref()
        .unwrap_or(&config.scoring.default_preset);
    let policy = registry.get(preset)?;

    let step_id = StepId::new(args.step);
    if !session.roster.contains(&step_id) {
        warn!(step = %step_id, lab = %session.roster.lab_id, "Step is not on the lab roster");
    }

    let trace = trace_step(&session.events, &session.session_id, &step_id, policy);

    match args.format {
        OutputFormat::Json => print_json(&trace),
        OutputFormat::Table => {
            print_trace(&trace);
            Ok(())
        }
    }
}

fn print_trace(trace: &ScoreTrace) {
    let evidence = &trace.evidence;

    if trace.entries.is_empty() {
        println!("No events recorded for step {}", evidence.step_id);
    } else {
        let mut events = styled_table(&["Time", "Event", "Details"]);
        for entry in &trace.entries {
            events.add_row(vec![
                Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
                Cell::new(&entry.kind),
                Cell::new(&entry.summary),
            ]);
        }
        println!("{events}");
    }

    if !evidence.modifiers.is_empty() {
        let mut modifiers = styled_table(&["Modifier", "Delta", "Note"]);
        for m in &evidence.modifiers {
            modifiers.add_row(vec![
                Cell::new(m.kind.as_str()),
                Cell::new(format!("{:+.2}", m.delta)),
                Cell::new(&m.note),
            ]);
        }
        println!();
        println!("{modifiers}");
    }

    println!();
    println!("Step {} under preset {}", evidence.step_id, trace.policy_id);
    println!("Status: {}", evidence.status);
    println!("Confidence: {}", format_confidence(evidence.confidence));
    println!("{}", evidence.explanation);
}
