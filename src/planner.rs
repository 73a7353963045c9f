//! Mutation boundary for the timeline.
//!
//! `Planner` validates edits, hands them to the `TaskStore`, runs the ancestor
//! aggregate sync and, once everything succeeded, reloads its `Hierarchy` snapshot.
//! A failed operation leaves the snapshot exactly as it was; the store stays the
//! source of truth and [`Planner::refresh`] re-reads it.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::color::{derive_descendant_color, next_palette_color, normalize_hex, PALETTE};
use crate::error::{PlannerError, ValidationError};
use crate::fields::{DeletePolicy, GanttStatus};
use crate::hierarchy::Hierarchy;
use crate::store::TaskStore;
use crate::sync::{sync_ancestor_aggregates, sync_from};
use crate::task::{NewTask, Task, TaskDraft, TaskId, TaskIssue, TaskPatch};

pub struct Planner<S: TaskStore> {
    store: S,
    hierarchy: Hierarchy,
    palette: Vec<String>,
}

impl<S: TaskStore> Planner<S> {
    /// Load the current collection from `store`.
    pub fn load(store: S, palette: Vec<String>) -> Result<Self, PlannerError> {
        let hierarchy = Hierarchy::new(store.load()?);
        let palette = if palette.is_empty() {
            PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Ok(Planner { store, hierarchy, palette })
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Replace the snapshot with a fresh read of the store.
    pub fn refresh(&mut self) -> Result<(), PlannerError> {
        self.hierarchy = Hierarchy::new(self.store.load()?);
        Ok(())
    }

    fn task(&self, id: TaskId) -> Result<&Task, PlannerError> {
        self.hierarchy.get(id).ok_or(PlannerError::NotFound(id))
    }

    /// The colour a new task gets when none was chosen.
    pub fn default_color_for(&self, parent: Option<TaskId>) -> String {
        match parent.and_then(|p| self.hierarchy.get(p)) {
            Some(parent) => {
                let depth = self.hierarchy.depth_of(parent) + 1;
                derive_descendant_color(self.hierarchy.root_color_of(parent), depth as u32)
            }
            None => {
                let roots = self.hierarchy.roots();
                next_palette_color(roots.iter().map(|t| t.color.as_str()), &self.palette)
                    .unwrap_or(PALETTE[0])
                    .to_string()
            }
        }
    }

    /// Create a task and roll its values up into its ancestors.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<TaskId, PlannerError> {
        let name = draft.name.trim().to_string();
        check_fields(&name, draft.start, draft.end, draft.progress)?;
        if let Some(p) = draft.parent {
            if self.hierarchy.get(p).is_none() {
                return Err(ValidationError::UnknownParent(p).into());
            }
        }
        self.check_dependencies(None, &draft.dependencies)?;
        let color = match &draft.color {
            Some(c) => normalize_hex(c).ok_or_else(|| ValidationError::InvalidColor(c.clone()))?,
            None => self.default_color_for(draft.parent),
        };

        let id = self.store.insert(NewTask {
            name,
            start: draft.start,
            end: draft.end,
            progress: draft.progress,
            color,
            parent: draft.parent,
            dependencies: draft.dependencies,
            status: draft.status,
            work_status: draft.work_status,
        })?;
        info!(task = id, parent = ?draft.parent, "task created");

        sync_ancestor_aggregates(&mut self.store, id)?;
        self.refresh()?;
        Ok(id)
    }

    /// Apply a partial edit, then resynchronise the affected ancestor chains.
    pub fn update_task(&mut self, id: TaskId, mut patch: TaskPatch) -> Result<(), PlannerError> {
        let current = self.task(id)?;
        let old_parent = current.parent;

        let mut merged = current.clone();
        patch.apply_to(&mut merged);
        check_fields(merged.name.trim(), merged.start, merged.end, merged.progress)?;
        if let Some(name) = &mut patch.name {
            *name = name.trim().to_string();
        }
        if let Some(color) = &patch.color {
            let normalized =
                normalize_hex(color).ok_or_else(|| ValidationError::InvalidColor(color.clone()))?;
            patch.color = Some(normalized);
        }
        if let Some(Some(parent)) = patch.parent {
            self.check_parent(id, parent)?;
        }
        if let Some(deps) = &patch.dependencies {
            self.check_dependencies(Some(id), deps)?;
        }

        if patch.is_empty() {
            return Ok(());
        }
        self.store.update(id, &patch)?;
        debug!(task = id, "task updated");

        // A parent's progress and span are derived from its children.
        if self.hierarchy.has_children(id) {
            sync_from(&mut self.store, id)?;
        } else {
            sync_ancestor_aggregates(&mut self.store, id)?;
        }
        if let Some(new_parent) = patch.parent {
            if let Some(old) = old_parent.filter(|&old| Some(old) != new_parent) {
                sync_from(&mut self.store, old)?;
            }
        }
        self.refresh()
    }

    pub fn set_status(&mut self, id: TaskId, status: GanttStatus) -> Result<(), PlannerError> {
        self.update_task(id, TaskPatch { status: Some(status), ..TaskPatch::default() })
    }

    /// Delete a task, dealing with its children per `policy`, then resync its parent.
    /// Returns the number of tasks removed.
    pub fn delete_task(&mut self, id: TaskId, policy: DeletePolicy) -> Result<usize, PlannerError> {
        let parent = self.task(id)?.parent;
        let removed = match policy {
            DeletePolicy::Reparent => {
                let children: Vec<TaskId> =
                    self.hierarchy.children_of(id).iter().map(|t| t.id).collect();
                let patch = TaskPatch { parent: Some(parent), ..TaskPatch::default() };
                for child in &children {
                    self.store.update(*child, &patch)?;
                }
                self.store.delete(id)?;
                1
            }
            DeletePolicy::Cascade => {
                let mut doomed = self.hierarchy.descendants_of(id);
                doomed.reverse();
                doomed.push(id);
                for victim in &doomed {
                    self.store.delete(*victim)?;
                }
                doomed.len()
            }
        };
        info!(task = id, ?policy, removed, "task deleted");

        if let Some(p) = parent {
            sync_from(&mut self.store, p)?;
        }
        self.refresh()?;
        Ok(removed)
    }

    /// Append an unresolved issue and return its id.
    pub fn add_issue(&mut self, id: TaskId, description: &str) -> Result<u64, PlannerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyIssue.into());
        }
        let mut issues = self.task(id)?.issues.clone();
        let issue_id = issues.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        issues.push(TaskIssue {
            id: issue_id,
            description: description.to_string(),
            created_at: Utc::now(),
            resolved: false,
        });
        self.update_task(id, TaskPatch { issues: Some(issues), ..TaskPatch::default() })?;
        Ok(issue_id)
    }

    /// Flip an issue's resolved flag. Returns the new state.
    pub fn toggle_issue(&mut self, id: TaskId, issue: u64) -> Result<bool, PlannerError> {
        let mut issues = self.task(id)?.issues.clone();
        let entry = issues
            .iter_mut()
            .find(|i| i.id == issue)
            .ok_or(ValidationError::UnknownIssue { task: id, issue })?;
        entry.resolved = !entry.resolved;
        let resolved = entry.resolved;
        self.update_task(id, TaskPatch { issues: Some(issues), ..TaskPatch::default() })?;
        Ok(resolved)
    }

    pub fn remove_issue(&mut self, id: TaskId, issue: u64) -> Result<(), PlannerError> {
        let mut issues = self.task(id)?.issues.clone();
        let before = issues.len();
        issues.retain(|i| i.id != issue);
        if issues.len() == before {
            return Err(ValidationError::UnknownIssue { task: id, issue }.into());
        }
        self.update_task(id, TaskPatch { issues: Some(issues), ..TaskPatch::default() })
    }

    fn check_parent(&self, id: TaskId, parent: TaskId) -> Result<(), ValidationError> {
        if self.hierarchy.get(parent).is_none() {
            return Err(ValidationError::UnknownParent(parent));
        }
        if parent == id || self.hierarchy.is_descendant(id, parent) {
            return Err(ValidationError::ParentCycle { task: id, parent });
        }
        Ok(())
    }

    fn check_dependencies(&self, id: Option<TaskId>, deps: &[TaskId]) -> Result<(), ValidationError> {
        for &dep in deps {
            if Some(dep) == id || self.hierarchy.get(dep).is_none() {
                return Err(ValidationError::UnknownDependency(dep));
            }
        }
        Ok(())
    }
}

/// Field rules shared by create and edit.
fn check_fields(
    name: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    progress: u8,
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if end <= start {
        return Err(ValidationError::EndNotAfterStart);
    }
    if progress > 100 {
        return Err(ValidationError::ProgressOutOfRange(progress));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::hierarchy::fixtures::jan;
    use crate::store::JsonStore;
    use pretty_assertions::assert_eq;

    fn planner() -> Planner<JsonStore> {
        Planner::load(JsonStore::in_memory(), Vec::new()).unwrap()
    }

    fn draft(name: &str, parent: Option<TaskId>, start: u32, end: u32, progress: u8) -> TaskDraft {
        TaskDraft {
            parent,
            progress,
            ..TaskDraft::new(name, jan(start), jan(end))
        }
    }

    fn get(p: &Planner<JsonStore>, id: TaskId) -> &Task {
        p.hierarchy().get(id).unwrap()
    }

    #[test]
    fn test_children_roll_up_on_create() {
        let mut p = planner();
        let a = p.add_task(draft("A", None, 1, 10, 0)).unwrap();
        p.add_task(draft("B", Some(a), 1, 5, 50)).unwrap();
        p.add_task(draft("C", Some(a), 6, 10, 100)).unwrap();

        let a = get(&p, a);
        assert_eq!(a.progress, 75);
        assert_eq!((a.start, a.end), (jan(1), jan(10)));
    }

    #[test]
    fn test_update_resyncs_ancestors() {
        let mut p = planner();
        let root = p.add_task(draft("Root", None, 1, 20, 0)).unwrap();
        let mid = p.add_task(draft("Mid", Some(root), 1, 10, 0)).unwrap();
        let leaf = p.add_task(draft("Leaf", Some(mid), 2, 4, 0)).unwrap();

        p.update_task(leaf, TaskPatch { progress: Some(80), end: Some(jan(15)), ..TaskPatch::default() })
            .unwrap();

        assert_eq!(get(&p, mid).progress, 80);
        assert_eq!(get(&p, mid).end, jan(15));
        assert_eq!(get(&p, root).progress, 80);
        assert_eq!(get(&p, root).start, jan(2));
    }

    #[test]
    fn test_direct_edit_of_parent_is_recomputed() {
        let mut p = planner();
        let a = p.add_task(draft("A", None, 1, 10, 0)).unwrap();
        let b = p.add_task(draft("B", Some(a), 1, 5, 50)).unwrap();
        p.add_task(draft("C", Some(a), 6, 10, 100)).unwrap();
        let top = p.add_task(draft("Top", None, 1, 10, 0)).unwrap();
        p.update_task(a, TaskPatch { parent: Some(Some(top)), ..TaskPatch::default() }).unwrap();

        let edit = TaskPatch {
            name: Some("Phase A".into()),
            progress: Some(10),
            end: Some(jan(3)),
            ..TaskPatch::default()
        };
        p.update_task(a, edit).unwrap();

        let parent = get(&p, a);
        assert_eq!(parent.name, "Phase A");
        assert_eq!(parent.progress, 75);
        assert_eq!((parent.start, parent.end), (jan(1), jan(10)));
        assert_eq!(get(&p, top).progress, 75);
        assert_eq!(get(&p, top).end, jan(10));

        // Leaves keep what they were given.
        p.update_task(b, TaskPatch { progress: Some(0), ..TaskPatch::default() }).unwrap();
        assert_eq!(get(&p, b).progress, 0);
        assert_eq!(get(&p, a).progress, 50);
    }

    #[test]
    fn test_default_colors() {
        let mut p = planner();
        let first = p.add_task(draft("First", None, 1, 2, 0)).unwrap();
        let second = p.add_task(draft("Second", None, 1, 2, 0)).unwrap();
        let child = p.add_task(draft("Child", Some(first), 1, 2, 0)).unwrap();
        let grandchild = p.add_task(draft("Grandchild", Some(child), 1, 2, 0)).unwrap();

        assert_eq!(get(&p, first).color, PALETTE[0]);
        assert_eq!(get(&p, second).color, PALETTE[1]);
        assert_eq!(get(&p, child).color, derive_descendant_color(PALETTE[0], 1));
        assert_eq!(get(&p, grandchild).color, derive_descendant_color(PALETTE[0], 2));
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        let mut p = planner();
        let a = p.add_task(draft("A", None, 1, 5, 0)).unwrap();
        let b = p.add_task(draft("B", Some(a), 1, 5, 0)).unwrap();

        let err = p.add_task(draft("  ", None, 1, 5, 0)).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::EmptyName)));
        let err = p.add_task(draft("X", None, 5, 5, 0)).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::EndNotAfterStart)));
        let err = p.add_task(draft("X", None, 1, 5, 101)).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::ProgressOutOfRange(101))));
        let err = p.add_task(draft("X", Some(99), 1, 5, 0)).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::UnknownParent(99))));
        let err = p
            .add_task(TaskDraft { color: Some("teal".into()), ..draft("X", None, 1, 5, 0) })
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::InvalidColor(_))));

        let err = p
            .update_task(a, TaskPatch { parent: Some(Some(b)), ..TaskPatch::default() })
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::ParentCycle { .. })));
        let err = p
            .update_task(a, TaskPatch { dependencies: Some(vec![a]), ..TaskPatch::default() })
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::UnknownDependency(_))));
        assert!(matches!(
            p.update_task(42, TaskPatch::default()),
            Err(PlannerError::NotFound(42))
        ));
        assert_eq!(p.hierarchy().len(), 2);
    }

    #[test]
    fn test_reparent_resyncs_old_and_new_parents() {
        let mut p = planner();
        let a = p.add_task(draft("A", None, 1, 10, 0)).unwrap();
        let b = p.add_task(draft("B", None, 1, 10, 0)).unwrap();
        let x = p.add_task(draft("X", Some(a), 1, 3, 20)).unwrap();
        p.add_task(draft("Y", Some(a), 1, 3, 60)).unwrap();
        assert_eq!(get(&p, a).progress, 40);

        p.update_task(x, TaskPatch { parent: Some(Some(b)), ..TaskPatch::default() }).unwrap();
        assert_eq!(get(&p, a).progress, 60);
        assert_eq!(get(&p, b).progress, 20);
    }

    #[test]
    fn test_delete_reparents_children_by_default() {
        let mut p = planner();
        let root = p.add_task(draft("Root", None, 1, 20, 0)).unwrap();
        let mid = p.add_task(draft("Mid", Some(root), 1, 10, 0)).unwrap();
        let leaf = p.add_task(draft("Leaf", Some(mid), 1, 4, 30)).unwrap();
        let other = p.add_task(draft("Other", Some(root), 5, 20, 90)).unwrap();

        assert_eq!(p.delete_task(mid, DeletePolicy::Reparent).unwrap(), 1);
        assert_eq!(get(&p, leaf).parent, Some(root));
        let children: Vec<_> = p.hierarchy().children_of(root).iter().map(|t| t.id).collect();
        assert_eq!(children, vec![leaf, other]);
        assert_eq!(get(&p, root).progress, 60);
        assert_eq!((get(&p, root).start, get(&p, root).end), (jan(1), jan(20)));
    }

    #[test]
    fn test_delete_cascade_removes_subtree() {
        let mut p = planner();
        let root = p.add_task(draft("Root", None, 1, 20, 0)).unwrap();
        let mid = p.add_task(draft("Mid", Some(root), 1, 10, 0)).unwrap();
        p.add_task(draft("Leaf", Some(mid), 1, 4, 30)).unwrap();
        p.add_task(draft("Other", Some(root), 5, 20, 90)).unwrap();

        assert_eq!(p.delete_task(mid, DeletePolicy::Cascade).unwrap(), 2);
        assert_eq!(p.hierarchy().len(), 2);
        assert_eq!(get(&p, root).progress, 90);
        assert_eq!(get(&p, root).start, jan(5));
    }

    #[test]
    fn test_deleting_last_child_keeps_parent_values() {
        let mut p = planner();
        let root = p.add_task(draft("Root", None, 1, 20, 0)).unwrap();
        let only = p.add_task(draft("Only", Some(root), 3, 4, 70)).unwrap();
        p.delete_task(only, DeletePolicy::Reparent).unwrap();
        assert_eq!(get(&p, root).progress, 70);
        assert!(!p.hierarchy().has_children(root));
    }

    #[test]
    fn test_issue_log() {
        let mut p = planner();
        let a = p.add_task(draft("A", None, 1, 5, 0)).unwrap();
        let first = p.add_issue(a, "  vendor late ").unwrap();
        let second = p.add_issue(a, "scope creep").unwrap();
        assert_eq!((first, second), (1, 2));
        assert_eq!(get(&p, a).issues[0].description, "vendor late");

        assert!(p.toggle_issue(a, first).unwrap());
        assert!(get(&p, a).issues[0].resolved);
        p.remove_issue(a, second).unwrap();
        assert_eq!(get(&p, a).issues.len(), 1);

        assert!(matches!(
            p.add_issue(a, " "),
            Err(PlannerError::Validation(ValidationError::EmptyIssue))
        ));
        assert!(matches!(
            p.remove_issue(a, 9),
            Err(PlannerError::Validation(ValidationError::UnknownIssue { .. }))
        ));
    }

    /// Accepts inserts, refuses every update.
    struct ReadOnlyUpdates(JsonStore);

    impl TaskStore for ReadOnlyUpdates {
        fn load(&self) -> Result<Vec<Task>, StoreError> {
            self.0.load()
        }
        fn insert(&mut self, task: NewTask) -> Result<TaskId, StoreError> {
            self.0.insert(task)
        }
        fn update(&mut self, _id: TaskId, _patch: &TaskPatch) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("permission denied".into()))
        }
        fn delete(&mut self, id: TaskId) -> Result<(), StoreError> {
            self.0.delete(id)
        }
    }

    #[test]
    fn test_failed_sync_is_reported_and_snapshot_untouched() {
        let mut p = Planner::load(ReadOnlyUpdates(JsonStore::in_memory()), Vec::new()).unwrap();
        let a = p.add_task(draft("A", None, 1, 5, 0)).unwrap();

        let err = p.add_task(draft("B", Some(a), 1, 5, 50)).unwrap_err();
        assert!(matches!(err, PlannerError::Store(StoreError::Unavailable(_))));
        assert_eq!(p.hierarchy().len(), 1);

        p.refresh().unwrap();
        assert_eq!(p.hierarchy().len(), 2);
        assert_eq!(get_any(&p, a).progress, 0);

        let err = p.set_status(a, GanttStatus::Delayed).unwrap_err();
        assert!(matches!(err, PlannerError::Store(_)));
        assert_eq!(get_any(&p, a).status, GanttStatus::OnTrack);
    }

    fn get_any<S: TaskStore>(p: &Planner<S>, id: TaskId) -> &Task {
        p.hierarchy().get(id).unwrap()
    }
}
