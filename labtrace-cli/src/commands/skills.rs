use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, Color};
use labtrace_skills::{
    GapAnalysis, LabRequirements, MasteryLevel, ProficiencyLevel, SkillEvidence, SkillId,
    SkillState, SkillStateResolver, StudentId, analyze_gaps,
};
use serde::Serialize;
use tracing::info;

use super::{OutputFormat, format_confidence, load_json, print_json, styled_table};
use crate::config::LabtraceConfig;

#[derive(Args, Debug)]
pub struct SkillsArgs {
    /// Skill evidence (JSON array, as produced by `labtrace map`)
    #[arg(long)]
    pub evidence: PathBuf,

    /// Student whose skills to resolve
    #[arg(long)]
    pub student: String,

    /// Reference instant for decay (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<String>,

    /// Self-reported levels (JSON object of skill id to level)
    #[arg(long)]
    pub declared: Option<PathBuf>,

    /// Lab requirements to analyze gaps against (JSON)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct SkillsReport {
    student_id: StudentId,
    as_of: DateTime<Utc>,
    skills: Vec<SkillState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gaps: Option<GapAnalysis>,
}

pub fn run(args: SkillsArgs, config: &LabtraceConfig) -> Result<()> {
    let as_of = parse_as_of(args.as_of.as_deref())?;
    let evidence = load_evidence(&args.evidence)?;
    let declared: BTreeMap<SkillId, ProficiencyLevel> = match &args.declared {
        Some(path) => load_json(path)?,
        None => BTreeMap::new(),
    };
    let student = StudentId::new(args.student);

    let resolver = SkillStateResolver::new(config.proficiency.clone())?;
    let states = resolver.resolve_all(&student, &evidence, &declared, as_of);
    info!(student = %student, skills = states.len(), "Resolved skills");

    let gaps = match &args.target {
        Some(path) => {
            let target: LabRequirements = load_json(path)?;
            Some(analyze_gaps(&states, &target, &resolver.config().thresholds))
        }
        None => None,
    };

    match args.format {
        OutputFormat::Json => print_json(&SkillsReport {
            student_id: student,
            as_of,
            skills: states.into_values().collect(),
            gaps,
        }),
        OutputFormat::Table => {
            print_states(&student, as_of, &states);
            if let Some(analysis) = &gaps {
                println!();
                print_gaps(analysis);
            }
            Ok(())
        }
    }
}

/// Read skill evidence, rejecting records with out-of-range values.
fn load_evidence(path: &Path) -> Result<Vec<SkillEvidence>> {
    let evidence: Vec<SkillEvidence> = load_json(path)?;
    for item in &evidence {
        item.validate()
            .with_context(|| format!("Invalid evidence in {}", path.display()))?;
    }
    Ok(evidence)
}

/// The wall clock is read here and nowhere below.
fn parse_as_of(value: Option<&str>) -> Result<DateTime<Utc>> {
    match value {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("Invalid --as-of timestamp: {s}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn level_cell(level: MasteryLevel) -> Cell {
    let color = match level {
        MasteryLevel::Applies => Color::Green,
        MasteryLevel::Understands => Color::Cyan,
        MasteryLevel::Knows => Color::Yellow,
        MasteryLevel::Unassessed => Color::DarkGrey,
    };
    Cell::new(level.as_str()).fg(color)
}

fn print_states(student: &StudentId, as_of: DateTime<Utc>, states: &BTreeMap<SkillId, SkillState>) {
    if states.is_empty() {
        println!("No skill evidence for {student}");
        return;
    }

    let mut table = styled_table(&[
        "Skill",
        "Level",
        "Declared",
        "Confidence",
        "Knows",
        "Understands",
        "Applies",
        "Evidence",
        "Last seen",
    ]);
    for state in states.values() {
        table.add_row(vec![
            Cell::new(state.skill_id.as_str()),
            level_cell(state.current_level),
            Cell::new(state.declared_level.map_or("-", |l| l.as_str())),
            Cell::new(format_confidence(state.demonstrated_confidence)),
            Cell::new(format_confidence(state.aggregates.knows)),
            Cell::new(format_confidence(state.aggregates.understands)),
            Cell::new(format_confidence(state.aggregates.applies)),
            Cell::new(state.evidence_count),
            Cell::new(
                state
                    .last_evidence_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("Skills for {student} as of {}", as_of.to_rfc3339());
    println!("{table}");
}

fn print_gaps(analysis: &GapAnalysis) {
    if analysis.ready {
        println!("Ready for {}: all {} requirements met", analysis.lab_id, analysis.met.len());
        return;
    }

    let mut table = styled_table(&["Skill", "Required", "Current", "Confidence", "Threshold", "Gap"]);
    for gap in &analysis.gaps {
        table.add_row(vec![
            Cell::new(gap.skill_id.as_str()),
            Cell::new(gap.required_level.as_str()),
            level_cell(gap.current_level),
            Cell::new(format_confidence(gap.demonstrated_confidence)),
            Cell::new(format_confidence(gap.threshold)),
            Cell::new(format_confidence(gap.gap)).fg(Color::Red),
        ]);
    }

    println!(
        "Gaps for {} ({} met, {} missing)",
        analysis.lab_id,
        analysis.met.len(),
        analysis.gaps.len()
    );
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_as_of_rfc3339() {
        let parsed = parse_as_of(Some("2025-06-01T12:00:00+02:00")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_as_of_rejects_garbage() {
        assert!(parse_as_of(Some("yesterday")).is_err());
    }

    const EVIDENCE: &str = r#"[{"skill_id":"git","student_id":"ada","level":"knows","confidence":CONF,"weight":1.0,"source_type":"task_completion","source_id":"a","lab_id":"lab","session_id":"s","timestamp":"2025-06-01T10:00:00Z"}]"#;

    fn write_evidence(dir: &tempfile::TempDir, confidence: &str) -> PathBuf {
        let path = dir.path().join("evidence.json");
        std::fs::write(&path, EVIDENCE.replace("CONF", confidence)).unwrap();
        path
    }

    #[test]
    fn test_load_evidence_accepts_valid_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let evidence = load_evidence(&write_evidence(&dir, "0.8")).unwrap();
        assert_eq!(evidence.len(), 1);
    }

    #[test]
    fn test_load_evidence_rejects_confidence_above_one() {
        let dir = tempfile::TempDir::new().unwrap();

        let err = load_evidence(&write_evidence(&dir, "5.0")).unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("Invalid evidence"));
        assert!(message.contains("confidence = 5"));
    }

    #[test]
    fn test_declared_levels_reach_skill_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("declared.json");
        std::fs::write(&path, r#"{"git": "applies", "docker": "knows"}"#).unwrap();
        let evidence = load_evidence(&write_evidence(&dir, "0.8")).unwrap();

        let declared: BTreeMap<SkillId, ProficiencyLevel> = load_json(&path).unwrap();
        let states = SkillStateResolver::default().resolve_all(
            &StudentId::new("ada"),
            &evidence,
            &declared,
            Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
        );

        assert_eq!(
            states[&SkillId::new("git")].declared_level,
            Some(ProficiencyLevel::Applies)
        );
        assert_eq!(states[&SkillId::new("git")].current_level, MasteryLevel::Knows);
        assert_eq!(states[&SkillId::new("docker")].evidence_count, 0);
    }
}
