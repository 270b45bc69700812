use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use labtrace_core::{LabProgress, Scorer};

use super::{OutputFormat, SessionInput, format_confidence, print_json, styled_table};
use crate::config::LabtraceConfig;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub input: SessionInput,

    /// Presets to compare; repeat the flag for each
    #[arg(long = "preset", required = true)]
    pub presets: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: ReplayArgs, config: &LabtraceConfig) -> Result<()> {
    let session = args.input.load()?;
    let scorer = Scorer::new(config.registry()?);
    let preset_ids: Vec<&str> = args.presets.iter().map(String::as_str).collect();

    let results = scorer.replay(
        &session.events,
        &session.session_id,
        &session.roster,
        &preset_ids,
    )?;

    match args.format {
        OutputFormat::Json => print_json(&results),
        OutputFormat::Table => {
            print_comparison(&results);
            Ok(())
        }
    }
}

fn print_comparison(results: &[LabProgress]) {
    let Some(first) = results.first() else {
        return;
    };

    // One column per preset, one row per step
    let mut headers = vec!["Step".to_string()];
    headers.extend(results.iter().map(|p| p.policy_id.clone()));
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let mut table = styled_table(&header_refs);

    for (index, step) in first.steps.iter().enumerate() {
        let mut row = vec![Cell::new(step.step_id.as_str())];
        row.extend(results.iter().map(|p| {
            Cell::new(
                p.steps
                    .get(index)
                    .map(|s| format_confidence(s.confidence))
                    .unwrap_or_else(|| "-".to_string()),
            )
        }));
        table.add_row(row);
    }

    let mut overall = vec![Cell::new("overall")];
    overall.extend(
        results
            .iter()
            .map(|p| Cell::new(format_confidence(p.overall_score))),
    );
    table.add_row(overall);

    let mut passed = vec![Cell::new("passed")];
    passed.extend(
        results
            .iter()
            .map(|p| Cell::new(if p.passed { "yes" } else { "no" })),
    );
    table.add_row(passed);

    println!(
        "Lab {} / session {} ({} events)",
        first.lab_id, first.session_id, first.event_count
    );
    println!("{table}");
}
