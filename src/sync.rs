//! Bottom-up aggregate synchronisation.
//!
//! A task with children does not own its progress or date span: progress is the
//! rounded mean of its direct children's progress, start is the earliest child start
//! and end the latest child end. After any change to a task, every ancestor is
//! recomputed one level at a time, each level read fresh from the store after the
//! previous level's write has completed.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::TaskStore;
use crate::task::{Task, TaskId, TaskPatch};

/// Values a parent derives from its direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    pub progress: u8,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Aggregate {
    /// Aggregate over `children`, or `None` when there are none.
    pub fn of<'a, I>(children: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut iter = children.into_iter();
        let first = iter.next()?;
        let (mut sum, mut count) = (first.progress as u64, 1u64);
        let (mut start, mut end) = (first.start, first.end);
        for child in iter {
            sum += child.progress as u64;
            count += 1;
            start = start.min(child.start);
            end = end.max(child.end);
        }
        let progress = (sum as f64 / count as f64).round() as u8;
        Some(Aggregate { progress, start, end })
    }

    pub fn as_patch(&self) -> TaskPatch {
        TaskPatch {
            progress: Some(self.progress),
            start: Some(self.start),
            end: Some(self.end),
            ..TaskPatch::default()
        }
    }
}

/// Recompute and persist the aggregates of every ancestor of `task_id`.
///
/// Returns the ids of the ancestors written, closest first. Stops at a task without a
/// parent, at a parent that does not resolve, at a parent with no children, or on a
/// cycle. A failed write is returned immediately and nothing above it is touched.
pub fn sync_ancestor_aggregates<S>(store: &mut S, task_id: TaskId) -> Result<Vec<TaskId>, StoreError>
where
    S: TaskStore + ?Sized,
{
    match store.get(task_id)?.and_then(|t| t.parent) {
        Some(parent) => sync_from(store, parent),
        None => Ok(Vec::new()),
    }
}

/// Recompute `parent_id` from its children, then continue with its own ancestors.
pub fn sync_from<S>(store: &mut S, parent_id: TaskId) -> Result<Vec<TaskId>, StoreError>
where
    S: TaskStore + ?Sized,
{
    let mut written = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(parent_id);

    while let Some(id) = next {
        if !visited.insert(id) {
            warn!(task = id, "parent cycle detected, stopping aggregate sync");
            break;
        }
        let Some(parent) = store.get(id)? else {
            debug!(task = id, "parent does not resolve, stopping aggregate sync");
            break;
        };
        let children = store.children(id)?;
        let Some(agg) = Aggregate::of(&children) else {
            debug!(task = id, "parent has no children, nothing to aggregate");
            break;
        };

        if let Err(e) = store.update(id, &agg.as_patch()) {
            warn!(task = id, error = %e, "failed to persist aggregate");
            return Err(e);
        }
        debug!(
            task = id,
            progress = agg.progress,
            start = %agg.start,
            end = %agg.end,
            "aggregate updated"
        );
        written.push(id);
        next = parent.parent;
    }

    Ok(written)
}
