//! Command implementations for the CLI interface.
//!
//! Each handler works on a loaded `Planner` and prints its result. Errors are returned
//! to `main`, which reports them and exits non-zero.

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, Utc};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::Cli;
use crate::dates::{format_day, parse_instant, truncate};
use crate::export::{default_file_name, export_rows, to_csv, to_json, to_print};
use crate::fields::*;
use crate::hierarchy::CollapseSet;
use crate::planner::Planner;
use crate::project::{discover_projects, Project};
use crate::store::JsonStore;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::tui::run::run_tui;

pub type CmdResult = Result<(), Box<dyn Error>>;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive Gantt view.
    Ui,

    /// Add a new task.
    Add {
        /// Task name.
        name: String,
        /// Start: YYYY-MM-DD, RFC 3339, "today", "next monday", "in 3d"... (default: today).
        #[arg(long)]
        start: Option<String>,
        /// End, same formats as --start (default: a week after start).
        #[arg(long)]
        end: Option<String>,
        /// Parent task ID or name.
        #[arg(long)]
        parent: Option<String>,
        /// Progress percentage 0-100.
        #[arg(long, default_value_t = 0)]
        progress: u8,
        /// Bar colour as #rrggbb (default: least-used palette colour, or derived from the parent).
        #[arg(long)]
        color: Option<String>,
        /// Gantt status.
        #[arg(long, value_enum, default_value_t = GanttStatus::OnTrack)]
        status: GanttStatus,
        /// Work status.
        #[arg(long, value_enum)]
        work_status: Option<WorkStatus>,
        /// Task this one depends on (ID or name). May be repeated.
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },

    /// List tasks as a tree (or flat).
    List {
        /// Hide the descendants of these task IDs.
        #[arg(long = "collapse")]
        collapse: Vec<TaskId>,
        /// Print without tree indentation.
        #[arg(long)]
        flat: bool,
        /// Only tasks with this work status.
        #[arg(long, value_enum)]
        work_status: Option<WorkStatus>,
    },

    /// View a single task by ID or name.
    View {
        /// Task ID or name to view.
        id: String,
        /// Show child subtree.
        #[arg(long)]
        children: bool,
        /// Show ancestor chain.
        #[arg(long)]
        parents: bool,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or name to update.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        progress: Option<u8>,
        #[arg(long)]
        color: Option<String>,
        /// New parent task ID or name.
        #[arg(long)]
        parent: Option<String>,
        /// Make the task a root.
        #[arg(long, conflicts_with = "parent")]
        clear_parent: bool,
        #[arg(long, value_enum)]
        status: Option<GanttStatus>,
        #[arg(long, value_enum)]
        work_status: Option<WorkStatus>,
        /// Replace dependencies (ID or name). May be repeated.
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
        /// Remove all dependencies.
        #[arg(long, conflicts_with = "depends_on")]
        clear_deps: bool,
    },

    /// Set a task's Gantt status.
    Status {
        /// Task ID or name.
        id: String,
        #[arg(value_enum)]
        status: GanttStatus,
    },

    /// Delete a task by ID or name.
    Delete {
        /// Task ID or name to delete.
        id: String,
        /// Delete all descendants too.
        #[arg(long)]
        cascade: bool,
        /// Move children up to the deleted task's parent.
        #[arg(long, conflicts_with = "cascade")]
        reparent: bool,
    },

    /// Manage a task's issue log.
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },

    /// Export the timeline.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Output file (default: <project>_timeline.<ext>; "-" for stdout).
        #[arg(long, short)]
        output: Option<String>,
    },

    /// List projects in the data directory.
    Projects,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum IssueAction {
    /// Record a new issue.
    Add {
        /// Task ID or name.
        task: String,
        description: String,
    },
    /// Mark an issue resolved (or unresolved again).
    Toggle { task: String, issue: u64 },
    /// Remove an issue.
    Rm { task: String, issue: u64 },
}

/// Resolve a task identifier (either ID or name) to a task ID.
/// Returns an error if the name has multiple matches and suggests using ID instead.
pub fn resolve_task_identifier(identifier: &str, tasks: &[Task]) -> Result<TaskId, String> {
    if let Ok(id) = identifier.parse::<TaskId>() {
        return if tasks.iter().any(|t| t.id == id) {
            Ok(id)
        } else {
            Err(format!("Task with ID {} not found", id))
        };
    }

    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.name.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with name '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut msg = format!("Multiple tasks found with name '{}':\n", identifier);
            for t in matches {
                msg.push_str(&format!("  ID {}: {} ({} → {})\n", t.id, t.name, format_day(t.start), format_day(t.end)));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(msg)
        }
    }
}

fn resolve(planner: &Planner<JsonStore>, identifier: &str) -> Result<TaskId, Box<dyn Error>> {
    Ok(resolve_task_identifier(identifier, planner.hierarchy().tasks())?)
}

fn resolve_all(planner: &Planner<JsonStore>, identifiers: &[String]) -> Result<Vec<TaskId>, Box<dyn Error>> {
    identifiers.iter().map(|i| resolve(planner, i)).collect()
}

fn parse_when(s: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    parse_instant(s, Local::now().date_naive()).ok_or_else(|| format!("Unrecognised date '{}'", s).into())
}

/// Launch the terminal user interface.
pub fn cmd_ui(planner: Planner<JsonStore>, project: &Project, policy: DeletePolicy) -> CmdResult {
    run_tui(planner, &project.display_name, policy)?;
    Ok(())
}

/// Add a new task.
pub fn cmd_add(
    planner: &mut Planner<JsonStore>,
    name: String,
    start: Option<String>,
    end: Option<String>,
    parent: Option<String>,
    progress: u8,
    color: Option<String>,
    status: GanttStatus,
    work_status: Option<WorkStatus>,
    depends_on: Vec<String>,
) -> CmdResult {
    let start = match start {
        Some(s) => parse_when(&s)?,
        None => parse_when("today")?,
    };
    let end = match end {
        Some(s) => parse_when(&s)?,
        None => start + Duration::days(7),
    };
    let parent = parent.map(|p| resolve(planner, &p)).transpose()?;
    let dependencies = resolve_all(planner, &depends_on)?;

    let id = planner.add_task(TaskDraft {
        name,
        start,
        end,
        progress,
        color,
        parent,
        dependencies,
        status,
        work_status,
    })?;
    println!("Added task {}", id);
    Ok(())
}

/// Print the task tree.
pub fn cmd_list(planner: &Planner<JsonStore>, collapse: Vec<TaskId>, flat: bool, work_status: Option<WorkStatus>) -> CmdResult {
    let hierarchy = planner.hierarchy();
    let collapsed: CollapseSet = collapse.into_iter().collect();

    println!(
        "{:<5} {:<10} {:<10} {:>5} {:<9} {:<8} {}",
        "ID", "Start", "End", "Prog", "Status", "Color", "Name"
    );
    let mut shown = 0;
    for row in hierarchy.flatten_for_display(&collapsed) {
        let t = row.task;
        if work_status.is_some() && t.work_status != work_status {
            continue;
        }
        let indent = if flat { String::new() } else { "  ".repeat(row.level) };
        let marker = if !hierarchy.has_children(t.id) {
            ""
        } else if collapsed.is_collapsed(t.id) {
            "▸ "
        } else {
            "▾ "
        };
        println!(
            "{:<5} {:<10} {:<10} {:>4}% {:<9} {:<8} {}{}{}",
            t.id,
            format_day(t.start),
            format_day(t.end),
            t.progress,
            format_gantt_status(t.status),
            hierarchy.display_color(t),
            indent,
            marker,
            truncate(&t.name, 60)
        );
        shown += 1;
    }
    if shown == 0 {
        println!("(no tasks)");
    }
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_view(planner: &Planner<JsonStore>, id: String, children: bool, parents: bool) -> CmdResult {
    let hierarchy = planner.hierarchy();
    let task_id = resolve(planner, &id)?;
    let task = hierarchy.get(task_id).ok_or_else(|| format!("Task {} not found.", task_id))?;

    let parent_name = task
        .parent
        .map(|p| hierarchy.get(p).map(|t| format!("{} (#{})", t.name, t.id)).unwrap_or_else(|| format!("#{} (missing)", p)))
        .unwrap_or_else(|| "-".into());
    let deps = task
        .dependencies
        .iter()
        .map(|&d| hierarchy.get(d).map(|t| t.name.clone()).unwrap_or_else(|| d.to_string()))
        .collect::<Vec<_>>();

    println!("ID:           {}", task.id);
    println!("Name:         {}", task.name);
    println!("Start:        {}", task.start.to_rfc3339());
    println!("End:          {}", task.end.to_rfc3339());
    println!("Progress:     {}%{}", task.progress, if hierarchy.has_children(task.id) { " (from children)" } else { "" });
    println!("Status:       {}", format_gantt_status(task.status));
    println!("Work status:  {}", format_work_status(task.work_status));
    println!("Color:        {} (shown as {})", task.color, hierarchy.display_color(task));
    println!("Depth:        {}", hierarchy.depth_of(task));
    println!("Parent:       {}", parent_name);
    println!("Depends on:   {}", if deps.is_empty() { "-".into() } else { deps.join(", ") });

    if task.issues.is_empty() {
        println!("Issues:       -");
    } else {
        println!("Issues:");
        for issue in &task.issues {
            println!(
                "  [{}] #{} {} ({})",
                if issue.resolved { "x" } else { " " },
                issue.id,
                issue.description,
                issue.created_at.format("%Y-%m-%d")
            );
        }
    }

    if parents {
        let chain = hierarchy.ancestors_of(task);
        if chain.is_empty() {
            println!("Ancestors: -");
        } else {
            let names: Vec<_> = chain.iter().map(|t| format!("{} (#{})", t.name, t.id)).collect();
            println!("Ancestors (closest first): {}", names.join(" -> "));
        }
    }

    if children {
        println!("Children:");
        let base = hierarchy.depth_of(task);
        let subtree = hierarchy.descendants_of(task.id);
        if subtree.is_empty() {
            println!("  -");
        }
        for t in subtree.iter().filter_map(|&c| hierarchy.get(c)) {
            let depth = hierarchy.depth_of(t).saturating_sub(base);
            println!("{}- {} [{}%] (#{})", "  ".repeat(depth), t.name, t.progress, t.id);
        }
    }
    Ok(())
}

/// Update an existing task's fields.
pub fn cmd_update(
    planner: &mut Planner<JsonStore>,
    id: String,
    name: Option<String>,
    start: Option<String>,
    end: Option<String>,
    progress: Option<u8>,
    color: Option<String>,
    parent: Option<String>,
    clear_parent: bool,
    status: Option<GanttStatus>,
    work_status: Option<WorkStatus>,
    depends_on: Vec<String>,
    clear_deps: bool,
) -> CmdResult {
    let task_id = resolve(planner, &id)?;
    let parent = if clear_parent {
        Some(None)
    } else {
        parent.map(|p| resolve(planner, &p)).transpose()?.map(Some)
    };
    let dependencies = if clear_deps {
        Some(Vec::new())
    } else if depends_on.is_empty() {
        None
    } else {
        Some(resolve_all(planner, &depends_on)?)
    };

    let patch = TaskPatch {
        name,
        start: start.as_deref().map(parse_when).transpose()?,
        end: end.as_deref().map(parse_when).transpose()?,
        progress,
        color,
        parent,
        dependencies,
        status,
        work_status: work_status.map(Some),
        issues: None,
    };
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }
    let touches_aggregate = patch.progress.is_some() || patch.start.is_some() || patch.end.is_some();
    if touches_aggregate && planner.hierarchy().has_children(task_id) {
        println!("Note: task {} has children; its progress and dates are recomputed from them.", task_id);
    }
    planner.update_task(task_id, patch)?;
    println!("Updated task {}", task_id);
    Ok(())
}

pub fn cmd_status(planner: &mut Planner<JsonStore>, id: String, status: GanttStatus) -> CmdResult {
    let task_id = resolve(planner, &id)?;
    planner.set_status(task_id, status)?;
    println!("Task {} is now {}", task_id, format_gantt_status(status));
    Ok(())
}

/// Delete a task, handling its children per the chosen or configured policy.
pub fn cmd_delete(planner: &mut Planner<JsonStore>, id: String, cascade: bool, reparent: bool, default_policy: DeletePolicy) -> CmdResult {
    let task_id = resolve(planner, &id)?;
    let policy = if cascade {
        DeletePolicy::Cascade
    } else if reparent {
        DeletePolicy::Reparent
    } else {
        default_policy
    };
    let removed = planner.delete_task(task_id, policy)?;
    println!("Deleted {} task(s)", removed);
    Ok(())
}

pub fn cmd_issue(planner: &mut Planner<JsonStore>, action: IssueAction) -> CmdResult {
    match action {
        IssueAction::Add { task, description } => {
            let task_id = resolve(planner, &task)?;
            let issue = planner.add_issue(task_id, &description)?;
            println!("Added issue #{} to task {}", issue, task_id);
        }
        IssueAction::Toggle { task, issue } => {
            let task_id = resolve(planner, &task)?;
            let resolved = planner.toggle_issue(task_id, issue)?;
            println!("Issue #{} {}", issue, if resolved { "resolved" } else { "reopened" });
        }
        IssueAction::Rm { task, issue } => {
            let task_id = resolve(planner, &task)?;
            planner.remove_issue(task_id, issue)?;
            println!("Removed issue #{}", issue);
        }
    }
    Ok(())
}

/// Export the timeline to a file (or stdout).
pub fn cmd_export(planner: &Planner<JsonStore>, project: &Project, format: ExportFormat, output: Option<String>) -> CmdResult {
    let hierarchy = planner.hierarchy();
    let now = Utc::now();
    let content = match format {
        ExportFormat::Csv => to_csv(&export_rows(hierarchy)),
        ExportFormat::Json => to_json(hierarchy, &project.display_name, now)?,
        ExportFormat::Print => to_print(&export_rows(hierarchy), &project.display_name, now),
    };

    match output.as_deref() {
        Some("-") => print!("{}", content),
        other => {
            let path = other
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default_file_name(&project.display_name, format)));
            std::fs::write(&path, content).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            info!(path = %path.display(), tasks = hierarchy.len(), "exported timeline");
            println!("Exported {} task(s) to {}", hierarchy.len(), path.display());
        }
    }
    Ok(())
}

/// List the projects found in the data directory.
pub fn cmd_projects(dir: &Path, current: &Project) -> CmdResult {
    let projects = discover_projects(dir)?;
    if projects.is_empty() {
        println!("No projects in {}", dir.display());
    }
    for p in projects {
        let mark = if p.file_path == current.file_path { "*" } else { " " };
        println!("{} {:<24} {}", mark, p.display_name, p.file_path.display());
    }
    Ok(())
}

pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::fixtures::task;
    use clap::Parser;

    #[test]
    fn test_resolve_by_id_or_name() {
        let mut a = task(1, None, 1, 5, 0);
        a.name = "Design".into();
        let mut b = task(2, None, 1, 5, 0);
        b.name = "Build".into();
        let mut c = task(3, None, 1, 5, 0);
        c.name = "build".into();
        let tasks = vec![a, b, c];

        assert_eq!(resolve_task_identifier("1", &tasks), Ok(1));
        assert_eq!(resolve_task_identifier("design", &tasks), Ok(1));
        assert!(resolve_task_identifier("9", &tasks).is_err());
        assert!(resolve_task_identifier("Ship", &tasks).is_err());
        let err = resolve_task_identifier("BUILD", &tasks).unwrap_err();
        assert!(err.contains("ID 2") && err.contains("ID 3"));
    }

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["pt", "delete", "4", "--cascade"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { cascade: true, reparent: false, .. }));
        assert!(Cli::try_parse_from(["pt", "delete", "4", "--cascade", "--reparent"]).is_err());
    }
}
