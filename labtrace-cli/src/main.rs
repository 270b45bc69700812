use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "labtrace", about = "Score lab telemetry and track skill proficiency")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra config file, applied on top of user and project config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one session of a lab
    Score(commands::score::ScoreArgs),
    /// Explain how one step's score was reached
    Trace(commands::trace::TraceArgs),
    /// Rescore a session under several presets
    Replay(commands::replay::ReplayArgs),
    /// Resolve a student's skill levels from skill evidence
    Skills(commands::skills::SkillsArgs),
    /// Turn lab progress into skill evidence via a Q-matrix
    Map(commands::map::MapArgs),
    /// List scoring presets
    Presets,
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Score(args) => commands::score::run(args, &config),
        Commands::Trace(args) => commands::trace::run(args, &config),
        Commands::Replay(args) => commands::replay::run(args, &config),
        Commands::Skills(args) => commands::skills::run(args, &config),
        Commands::Map(args) => commands::map::run(args),
        Commands::Presets => commands::presets::run(&config),
        Commands::Config(args) => commands::config::run(args, &config),
    }
}
