use anyhow::Result;
use comfy_table::{Cell, Color};
use labtrace_core::{HintPenalty, ScoringPolicy};

use super::styled_table;
use crate::config::LabtraceConfig;

pub fn run(config: &LabtraceConfig) -> Result<()> {
    let registry = config.registry()?;

    let mut table = styled_table(&[
        "Preset",
        "Pass",
        "Hints",
        "Solution",
        "Retries",
        "First try",
        "Description",
    ]);
    for policy in registry.iter() {
        let name = if policy.id == config.scoring.default_preset {
            Cell::new(format!("{} (default)", policy.id)).fg(Color::Green)
        } else {
            Cell::new(&policy.id)
        };
        table.add_row(vec![
            name,
            Cell::new(format!("{:.2}", policy.pass_threshold)),
            Cell::new(describe_hints(&policy.hint_penalty)),
            Cell::new(describe_solution(policy)),
            Cell::new(describe_retries(policy)),
            Cell::new(format!("+{:.2}", policy.first_try_bonus)),
            Cell::new(&policy.description),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn describe_hints(penalty: &HintPenalty) -> String {
    match penalty {
        HintPenalty::Flat { per_hint } => format!("-{per_hint:.2} each"),
        HintPenalty::Diminishing { first, factor } => format!("-{first:.2} x {factor}^i"),
    }
}

fn describe_solution(policy: &ScoringPolicy) -> String {
    let p = &policy.solution_penalty;
    match p.cap {
        Some(cap) => format!("-{:.2}, cap {cap:.2}", p.penalty),
        None => format!("-{:.2}", p.penalty),
    }
}

fn describe_retries(policy: &ScoringPolicy) -> String {
    let r = &policy.retry_penalty;
    match r.max_total {
        Some(max) => format!("-{:.2} each, max {max:.2}", r.per_retry),
        None => format!("-{:.2} each", r.per_retry),
    }
}
