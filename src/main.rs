//! # PT - Project Timeline CLI
//!
//! A command-line Gantt chart for hierarchical project plans, with an interactive
//! terminal user interface (TUI).
//!
//! ## Key Features
//!
//! - **Hierarchical Tasks**: any task can have children; nesting depth is unbounded
//! - **Progress Roll-up**: a parent's progress is the rounded mean of its children's,
//!   and its dates span theirs, all the way up to the root
//! - **Depth Colours**: descendants get lighter, slightly desaturated shades of their root's colour
//! - **Exports**: CSV, JSON and a plain-text report
//! - **Multi-Project Support**: one JSON file per project in `~/.pt/`
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a phase and two tasks under it
//! pt add "Launch" --start 2025-01-01 --end 2025-01-10
//! pt add "Design" --parent Launch --start 2025-01-01 --end 2025-01-05
//! pt add "Build" --parent Launch --start 2025-01-06 --end 2025-01-10
//!
//! # Record progress; the parent follows
//! pt update Design --progress 100
//! pt list
//!
//! # Open the Gantt view
//! pt ui
//! ```
//!
//! Data is stored in `~/.pt/` (override with `$PT_HOME` or `--dir`), alongside an
//! optional `config.toml`. Set `RUST_LOG=pt=debug` to trace roll-ups.

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod color;
pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod fields;
pub mod hierarchy;
pub mod planner;
pub mod project;
pub mod store;
pub mod sync;
pub mod task;
pub mod timeline;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod run;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::{resolve_data_dir, Config};
use planner::Planner;
use project::select_project;

const DEFAULT_LOG_FILTER: &str = "warn";

fn fail(msg: String) -> ! {
    error!("{}", msg);
    eprintln!("{}", msg);
    std::process::exit(1);
}

/// Logs go to stderr so command output stays pipeable. `RUST_LOG` wins over the
/// config file.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    // Completions need neither data nor config
    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let pt_dir = resolve_data_dir(cli.dir.clone());
    if let Err(e) = std::fs::create_dir_all(&pt_dir) {
        eprintln!("Failed to create data directory {}: {}", pt_dir.display(), e);
        std::process::exit(1);
    }

    let config = match Config::load(&pt_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config);
    debug!(dir = %pt_dir.display(), "data directory");

    let project = select_project(&pt_dir, cli.project.as_deref(), config.project.as_deref())
        .unwrap_or_else(|e| fail(format!("Failed to read projects in {}: {}", pt_dir.display(), e)));

    if let Commands::Projects = cli.command {
        if let Err(e) = cmd_projects(&pt_dir, &project) {
            fail(e.to_string());
        }
        return;
    }

    let store = project.open_store().unwrap_or_else(|e| fail(e.to_string()));
    let mut planner = Planner::load(store, config.palette.colors.clone()).unwrap_or_else(|e| fail(e.to_string()));
    debug!(project = %project.display_name, tasks = planner.hierarchy().len(), "project loaded");

    let result = match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Projects => unreachable!("projects handled above"),

        Commands::Ui => cmd_ui(planner, &project, config.delete_policy),

        Commands::Add { name, start, end, parent, progress, color, status, work_status, depends_on } =>
            cmd_add(&mut planner, name, start, end, parent, progress, color, status, work_status, depends_on),

        Commands::List { collapse, flat, work_status } => cmd_list(&planner, collapse, flat, work_status),

        Commands::View { id, children, parents } => cmd_view(&planner, id, children, parents),

        Commands::Update {
            id, name, start, end, progress, color, parent, clear_parent,
            status, work_status, depends_on, clear_deps,
        } => cmd_update(&mut planner, id, name, start, end, progress, color, parent, clear_parent,
                        status, work_status, depends_on, clear_deps),

        Commands::Status { id, status } => cmd_status(&mut planner, id, status),

        Commands::Delete { id, cascade, reparent } =>
            cmd_delete(&mut planner, id, cascade, reparent, config.delete_policy),

        Commands::Issue { action } => cmd_issue(&mut planner, action),

        Commands::Export { format, output } => cmd_export(&planner, &project, format, output),
    };

    if let Err(e) = result {
        fail(e.to_string());
    }
}
