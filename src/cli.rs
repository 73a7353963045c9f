use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Project timeline: hierarchical Gantt tasks with progress roll-up.
/// Data lives in ~/.pt (or $PT_HOME, or --dir), one JSON file per project.
#[derive(Parser)]
#[command(name = "pt", version, about = "Gantt-style project timeline CLI")]
pub struct Cli {
    /// Data directory holding project files and config.toml.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Project name (defaults to config, then the most recently edited project).
    #[arg(long, short = 'p', global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
