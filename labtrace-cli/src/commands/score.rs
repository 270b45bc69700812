use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};
use labtrace_core::{LabProgress, Scorer, TaskStatus};

use super::{
    OutputFormat, SessionInput, format_confidence, format_duration_ms, print_json, styled_table,
};
use crate::config::LabtraceConfig;

#[derive(Args, Debug)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub input: SessionInput,

    /// Scoring preset (defaults to the configured one)
    #[arg(long)]
    pub preset: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: ScoreArgs, config: &LabtraceConfig) -> Result<()> {
    let session = args.input.load()?;
    let scorer = Scorer::new(config.registry()?);
    let preset = args
        .preset
        .as_deref()
        .unwrap_or(&config.scoring.default_preset);

    let progress = scorer.score(&session.events, &session.session_id, &session.roster, preset)?;

    match args.format {
        OutputFormat::Json => print_json(&progress),
        OutputFormat::Table => {
            print_progress(&progress);
            Ok(())
        }
    }
}

fn status_cell(status: TaskStatus) -> Cell {
    let color = match status {
        TaskStatus::Completed => Color::Green,
        TaskStatus::Partial => Color::Yellow,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Pending => Color::DarkGrey,
    };
    Cell::new(status.as_str()).fg(color)
}

fn print_progress(progress: &LabProgress) {
    let mut table = styled_table(&[
        "Step",
        "Status",
        "Confidence",
        "Attempts",
        "Hints",
        "Solution",
        "Time",
    ]);

    for step in &progress.steps {
        table.add_row(vec![
            Cell::new(step.step_id.as_str()),
            status_cell(step.status),
            Cell::new(format_confidence(step.confidence)),
            Cell::new(step.attempts),
            Cell::new(step.hints_used),
            Cell::new(if step.solution_viewed { "yes" } else { "no" }),
            Cell::new(format_duration_ms(step.time_spent_ms)),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "Lab {} / session {} (preset: {})",
        progress.lab_id, progress.session_id, progress.policy_id
    );
    println!(
        "Completed: {}/{} ({:.2}%)",
        progress.completed_steps, progress.total_steps, progress.completion_percentage
    );
    println!("Overall score: {}", format_confidence(progress.overall_score));
    println!("Passed: {}", if progress.passed { "yes" } else { "no" });
}
