//! Enumerations and field types for timeline tasks.
//!
//! The Gantt status and the work status are separate vocabularies owned by different
//! views; nothing in the crate converts one into the other.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Schedule health of a task on the Gantt chart.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GanttStatus {
    #[default]
    OnTrack,
    AtRisk,
    Delayed,
}

impl GanttStatus {
    /// The next status in the on-track → at-risk → delayed cycle.
    pub fn cycle(self) -> Self {
        match self {
            GanttStatus::OnTrack => GanttStatus::AtRisk,
            GanttStatus::AtRisk => GanttStatus::Delayed,
            GanttStatus::Delayed => GanttStatus::OnTrack,
        }
    }
}

/// Board-style completion state of a generic task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WorkStatus {
    Todo,
    InProgress,
    Done,
}

/// What happens to the children of a deleted task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Children move up to the deleted task's parent.
    #[default]
    Reparent,
    /// The whole subtree is removed.
    Cascade,
}

/// Output formats for `pt export`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Print,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Print => "txt",
        }
    }
}

/// Format a Gantt status for display.
pub fn format_gantt_status(s: GanttStatus) -> &'static str {
    match s {
        GanttStatus::OnTrack => "On track",
        GanttStatus::AtRisk => "At risk",
        GanttStatus::Delayed => "Delayed",
    }
}

/// Format a work status for display.
pub fn format_work_status(s: Option<WorkStatus>) -> &'static str {
    match s {
        Some(WorkStatus::Todo) => "Todo",
        Some(WorkStatus::InProgress) => "In progress",
        Some(WorkStatus::Done) => "Done",
        None => "-",
    }
}
