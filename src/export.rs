//! Read-only exports of the timeline.
//!
//! Rows are produced in display pre-order with nothing collapsed, then rendered as
//! CSV, JSON or a plain-text report suitable for printing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dates::{ceil_days, format_day};
use crate::fields::ExportFormat;
use crate::hierarchy::{CollapseSet, Hierarchy};
use crate::task::{Task, TaskId};

/// One exported task with its derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow<'a> {
    pub task: &'a Task,
    pub level: usize,
    pub duration_days: i64,
    pub parent_name: String,
    pub dependency_names: Vec<String>,
}

/// Every task reachable from a root, in pre-order.
pub fn export_rows(hierarchy: &Hierarchy) -> Vec<ExportRow<'_>> {
    hierarchy
        .flatten_for_display(&CollapseSet::new())
        .into_iter()
        .map(|row| {
            let task = row.task;
            let parent_name = task
                .parent
                .and_then(|p| hierarchy.get(p))
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let dependency_names = task
                .dependencies
                .iter()
                .map(|&d| hierarchy.get(d).map(|t| t.name.clone()).unwrap_or_else(|| d.to_string()))
                .collect();
            ExportRow {
                task,
                level: hierarchy.depth_of(task),
                duration_days: ceil_days(task.end - task.start),
                parent_name,
                dependency_names,
            }
        })
        .collect()
}

/// Quote a CSV field, doubling embedded quotes.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn to_csv(rows: &[ExportRow<'_>]) -> String {
    let mut csv = String::new();
    csv.push_str("Task Name,Level,Start Date,End Date,Duration (Days),Progress (%),Color,Parent Task,Dependencies\n");
    for row in rows {
        let t = row.task;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            quote(&format!("{}{}", "  ".repeat(row.level), t.name)),
            row.level,
            format_day(t.start),
            format_day(t.end),
            row.duration_days,
            t.progress,
            t.color,
            quote(&row.parent_name),
            quote(&row.dependency_names.join("; ")),
        ));
    }
    csv
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    project_name: &'a str,
    export_date: DateTime<Utc>,
    tasks: Vec<JsonTask<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonTask<'a> {
    id: TaskId,
    name: &'a str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    progress: u8,
    color: &'a str,
    parent_id: Option<TaskId>,
    dependencies: &'a [TaskId],
}

/// All tasks in collection order, as a JSON document.
pub fn to_json(hierarchy: &Hierarchy, project_name: &str, now: DateTime<Utc>) -> serde_json::Result<String> {
    let doc = JsonExport {
        project_name,
        export_date: now,
        tasks: hierarchy
            .tasks()
            .iter()
            .map(|t| JsonTask {
                id: t.id,
                name: &t.name,
                start_date: t.start,
                end_date: t.end,
                progress: t.progress,
                color: &t.color,
                parent_id: t.parent,
                dependencies: &t.dependencies,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc)
}

const BAR_CELLS: usize = 20;

/// Plain-text report for printing.
pub fn to_print(rows: &[ExportRow<'_>], project_name: &str, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(project_name);
    out.push('\n');
    out.push_str(&"=".repeat(project_name.chars().count().max(1)));
    out.push('\n');
    out.push_str(&format!("Exported {}\n\n", now.format("%Y-%m-%d %H:%M UTC")));

    for row in rows {
        let t = row.task;
        let indent = "    ".repeat(row.level);
        let filled = (t.progress as usize * BAR_CELLS + 50) / 100;
        out.push_str(&format!("{indent}{}\n", t.name));
        out.push_str(&format!(
            "{indent}  {} → {} ({} days)\n",
            format_day(t.start),
            format_day(t.end),
            row.duration_days
        ));
        out.push_str(&format!(
            "{indent}  [{}{}] {}%\n",
            "#".repeat(filled),
            "-".repeat(BAR_CELLS - filled),
            t.progress
        ));
        if !row.dependency_names.is_empty() {
            out.push_str(&format!("{indent}  Depends on: {}\n", row.dependency_names.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Suggested export file name: whitespace runs become `_`.
pub fn default_file_name(project_name: &str, format: ExportFormat) -> String {
    let stem = project_name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{}_timeline.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::fixtures::{jan, task};
    use pretty_assertions::assert_eq;

    fn sample() -> Hierarchy {
        let mut root = task(1, None, 1, 10, 75);
        root.name = "Launch".into();
        let mut design = task(2, Some(1), 1, 5, 50);
        design.name = "Design \"v2\"".into();
        let mut build = task(3, Some(1), 6, 10, 100);
        build.name = "Build".into();
        build.dependencies = vec![2, 77];
        Hierarchy::new(vec![root, build, design])
    }

    #[test]
    fn test_rows_are_pre_order_with_derived_columns() {
        let h = sample();
        let rows = export_rows(&h);
        let names: Vec<_> = rows.iter().map(|r| (r.task.id, r.level)).collect();
        assert_eq!(names, vec![(1, 0), (3, 1), (2, 1)]);
        assert_eq!(rows[0].duration_days, 9);
        assert_eq!(rows[1].parent_name, "Launch");
        assert_eq!(rows[1].dependency_names, vec!["Design \"v2\"".to_string(), "77".to_string()]);
        assert_eq!(rows[0].parent_name, "");
    }

    #[test]
    fn test_csv_layout() {
        let h = sample();
        let csv = to_csv(&export_rows(&h));
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "\"Launch\",0,2025-01-01,2025-01-10,9,75,#3b82f6,\"\",\"\"");
        assert_eq!(
            lines[2],
            "\"  Build\",1,2025-01-06,2025-01-10,4,100,#3b82f6,\"Launch\",\"Design \"\"v2\"\"; 77\""
        );
    }

    #[test]
    fn test_json_document() {
        let h = sample();
        let json = to_json(&h, "Q1 plan", jan(20)).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["projectName"], "Q1 plan");
        assert_eq!(v["tasks"].as_array().unwrap().len(), 3);
        assert_eq!(v["tasks"][1]["parentId"], 1);
        assert_eq!(v["tasks"][1]["dependencies"][1], 77);
        assert_eq!(v["tasks"][0]["parentId"], serde_json::Value::Null);
        assert_eq!(v["tasks"][0]["startDate"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn test_print_report() {
        let h = sample();
        let text = to_print(&export_rows(&h), "Q1 plan", jan(20));
        assert!(text.starts_with("Q1 plan\n=======\nExported 2025-01-20 00:00 UTC\n"));
        assert!(text.contains("Launch\n  2025-01-01 → 2025-01-10 (9 days)\n  [###############-----] 75%\n"));
        assert!(text.contains("    Build\n"));
        assert!(text.contains("Depends on: Design \"v2\", 77"));
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name("My  Project plan", ExportFormat::Csv), "My_Project_plan_timeline.csv");
        assert_eq!(default_file_name("x", ExportFormat::Print), "x_timeline.txt");
    }
}
