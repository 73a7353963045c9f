//! Task data structures.
//!
//! This module defines the `Task` record stored for every bar on the timeline, the
//! issue log entries attached to it, and the two payload shapes used to create and
//! partially update tasks through a `TaskStore`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// Identifier assigned by the store on creation; never reused.
pub type TaskId = u64;

/// A scheduled work item on the project timeline.
///
/// Tasks form a forest through `parent`. When a task has children, its `progress`,
/// `start` and `end` are aggregates of those children and are maintained by
/// [`crate::sync::sync_ancestor_aggregates`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub progress: u8,
    pub color: String,
    #[serde(default)]
    pub parent: Option<TaskId>,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub status: GanttStatus,
    #[serde(default)]
    pub work_status: Option<WorkStatus>,
    #[serde(default)]
    pub issues: Vec<TaskIssue>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// A free-form problem note attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskIssue {
    pub id: u64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

/// User input for a new task. Colour is optional and resolved by the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub progress: u8,
    pub color: Option<String>,
    pub parent: Option<TaskId>,
    pub dependencies: Vec<TaskId>,
    pub status: GanttStatus,
    pub work_status: Option<WorkStatus>,
}

impl TaskDraft {
    /// Create a draft with default progress, status and no relations.
    pub fn new(name: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TaskDraft {
            name: name.to_string(),
            start,
            end,
            progress: 0,
            color: None,
            parent: None,
            dependencies: Vec::new(),
            status: GanttStatus::default(),
            work_status: None,
        }
    }
}

/// A fully resolved task payload, everything except the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub progress: u8,
    pub color: String,
    pub parent: Option<TaskId>,
    pub dependencies: Vec<TaskId>,
    pub status: GanttStatus,
    pub work_status: Option<WorkStatus>,
}

impl NewTask {
    /// Materialise the stored record once the store has picked an id.
    pub fn into_task(self, id: TaskId, now_utc: i64) -> Task {
        Task {
            id,
            name: self.name,
            start: self.start,
            end: self.end,
            progress: self.progress,
            color: self.color,
            parent: self.parent,
            dependencies: self.dependencies,
            status: self.status,
            work_status: self.work_status,
            issues: Vec::new(),
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }
}

/// A partial field set keyed by task id. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub progress: Option<u8>,
    pub color: Option<String>,
    pub parent: Option<Option<TaskId>>,
    pub dependencies: Option<Vec<TaskId>>,
    pub status: Option<GanttStatus>,
    pub work_status: Option<Option<WorkStatus>>,
    pub issues: Option<Vec<TaskIssue>>,
}

impl TaskPatch {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Write every present field onto `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(start) = self.start {
            task.start = start;
        }
        if let Some(end) = self.end {
            task.end = end;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(color) = &self.color {
            task.color = color.clone();
        }
        if let Some(parent) = self.parent {
            task.parent = parent;
        }
        if let Some(deps) = &self.dependencies {
            task.dependencies = deps.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(work_status) = self.work_status {
            task.work_status = work_status;
        }
        if let Some(issues) = &self.issues {
            task.issues = issues.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let draft = NewTask {
            name: "Design".into(),
            start: day(1),
            end: day(5),
            progress: 10,
            color: "#3b82f6".into(),
            parent: Some(4),
            dependencies: vec![2],
            status: GanttStatus::OnTrack,
            work_status: None,
        };
        let mut task = draft.into_task(7, 0);
        let patch = TaskPatch {
            progress: Some(60),
            parent: Some(None),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut task);

        assert_eq!(task.progress, 60);
        assert_eq!(task.parent, None);
        assert_eq!(task.name, "Design");
        assert_eq!(task.dependencies, vec![2]);
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }
}
