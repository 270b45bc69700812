use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use labtrace_core::LabProgress;
use labtrace_skills::{QMatrix, QMatrixEntry, StudentId, map_skill_evidence};
use tracing::info;

use super::{load_json, print_json};

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Lab progress (JSON, as produced by `labtrace score --format json`)
    #[arg(long)]
    pub progress: PathBuf,

    /// Q-matrix rows (JSON array)
    #[arg(long)]
    pub qmatrix: PathBuf,

    /// Student the session belongs to
    #[arg(long)]
    pub student: String,
}

pub fn run(args: MapArgs) -> Result<()> {
    let progress: LabProgress = load_json(&args.progress)?;
    let rows: Vec<QMatrixEntry> = load_json(&args.qmatrix)?;
    let qmatrix = QMatrix::new(rows)?;

    let evidence = map_skill_evidence(&progress, &StudentId::new(args.student), &qmatrix);
    for item in &evidence {
        item.validate()
            .with_context(|| format!("Invalid progress in {}", args.progress.display()))?;
    }
    info!(items = evidence.len(), lab = %progress.lab_id, "Mapped skill evidence");

    print_json(&evidence)
}
