//! Tree queries over a flat task collection.
//!
//! `Hierarchy` is an arena of tasks (kept in load order) plus an index from parent id
//! to child ids. It is rebuilt from every fresh load and never mutated in place, so all
//! queries are pure reads over one snapshot.
//!
//! `parent` references are not trusted: a parent id that does not resolve ends an
//! ancestor walk, and a walk that revisits a task stops instead of looping.

use std::collections::{HashMap, HashSet};

use crate::color::derive_descendant_color;
use crate::task::{Task, TaskId};

/// Task ids whose descendants are hidden in tree views. Session-local, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseSet(HashSet<TaskId>);

impl CollapseSet {
    pub fn new() -> Self {
        CollapseSet::default()
    }

    /// Flip the collapsed state of `id`. Returns true if it is now collapsed.
    pub fn toggle(&mut self, id: TaskId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    pub fn is_collapsed(&self, id: TaskId) -> bool {
        self.0.contains(&id)
    }
}

impl FromIterator<TaskId> for CollapseSet {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        CollapseSet(iter.into_iter().collect())
    }
}

/// One line of a tree view: the task and its nesting level (0 for roots).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRow<'a> {
    pub task: &'a Task,
    pub level: usize,
}

/// Snapshot of the task forest.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
    children: HashMap<TaskId, Vec<TaskId>>,
}

impl Hierarchy {
    /// Build the arena and child index. Later duplicates of an id are ignored, and a
    /// task naming itself as parent is not indexed as its own child.
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut index = HashMap::with_capacity(tasks.len());
        let mut kept = Vec::with_capacity(tasks.len());
        for task in tasks {
            if index.contains_key(&task.id) {
                continue;
            }
            index.insert(task.id, kept.len());
            kept.push(task);
        }

        let mut children: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for task in &kept {
            if let Some(p) = task.parent.filter(|&p| p != task.id) {
                children.entry(p).or_default().push(task.id);
            }
        }

        Hierarchy { tasks: kept, index, children }
    }

    /// All tasks in collection order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.index.get(&id).map(|&i| &self.tasks[i])
    }

    /// Direct children of `id` in collection order. Empty for unknown ids.
    pub fn children_of(&self, id: TaskId) -> Vec<&Task> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|&c| self.get(c)).collect())
            .unwrap_or_default()
    }

    /// Tasks without a parent, in collection order.
    pub fn roots(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.parent.is_none()).collect()
    }

    pub fn has_children(&self, id: TaskId) -> bool {
        self.children.get(&id).is_some_and(|c| !c.is_empty())
    }

    /// Resolvable ancestors of `task`, closest first.
    pub fn ancestors_of(&self, task: &Task) -> Vec<&Task> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([task.id]);
        let mut cur = task.parent;
        while let Some(pid) = cur {
            let Some(parent) = self.get(pid) else { break };
            if !seen.insert(parent.id) {
                break; // cycle
            }
            chain.push(parent);
            cur = parent.parent;
        }
        chain
    }

    /// Number of resolvable ancestor hops from `task` to its root.
    pub fn depth_of(&self, task: &Task) -> usize {
        self.ancestors_of(task).len()
    }

    /// The topmost resolvable ancestor of `task`, or `task` itself.
    pub fn root_of<'a>(&'a self, task: &'a Task) -> &'a Task {
        self.ancestors_of(task).last().copied().unwrap_or(task)
    }

    /// The stored colour of the task's root.
    pub fn root_color_of<'a>(&'a self, task: &'a Task) -> &'a str {
        &self.root_of(task).color
    }

    /// Colour a task is drawn in: its own colour when it is a root, otherwise its
    /// root's colour lightened for its depth.
    pub fn display_color(&self, task: &Task) -> String {
        match self.depth_of(task) {
            0 => task.color.clone(),
            depth => derive_descendant_color(self.root_color_of(task), depth as u32),
        }
    }

    /// All descendants of `id` in pre-order.
    pub fn descendants_of(&self, id: TaskId) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        self.collect_descendants(id, &mut seen, &mut out);
        out
    }

    fn collect_descendants(&self, id: TaskId, seen: &mut HashSet<TaskId>, out: &mut Vec<TaskId>) {
        if let Some(children) = self.children.get(&id) {
            for &c in children {
                if seen.insert(c) {
                    out.push(c);
                    self.collect_descendants(c, seen, out);
                }
            }
        }
    }

    /// True if `candidate` sits anywhere below `ancestor`.
    pub fn is_descendant(&self, ancestor: TaskId, candidate: TaskId) -> bool {
        self.get(candidate)
            .is_some_and(|t| self.ancestors_of(t).iter().any(|a| a.id == ancestor))
    }

    /// Pre-order render order from the roots, skipping below collapsed tasks.
    pub fn flatten_for_display(&self, collapsed: &CollapseSet) -> Vec<DisplayRow<'_>> {
        let mut rows = Vec::with_capacity(self.tasks.len());
        let mut seen = HashSet::new();
        for root in self.roots() {
            self.push_subtree(root, 0, collapsed, &mut seen, &mut rows);
        }
        rows
    }

    fn push_subtree<'a>(
        &'a self,
        task: &'a Task,
        level: usize,
        collapsed: &CollapseSet,
        seen: &mut HashSet<TaskId>,
        rows: &mut Vec<DisplayRow<'a>>,
    ) {
        if !seen.insert(task.id) {
            return;
        }
        rows.push(DisplayRow { task, level });
        if collapsed.is_collapsed(task.id) {
            return;
        }
        for child in self.children_of(task.id) {
            self.push_subtree(child, level + 1, collapsed, seen, rows);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::task;
    use super::*;
    use pretty_assertions::assert_eq;

    /// 1 ─┬─ 2 ─── 4
    ///    └─ 3
    /// 5 ──── 6
    fn sample() -> Hierarchy {
        Hierarchy::new(vec![
            task(1, None, 1, 10, 0),
            task(2, Some(1), 1, 5, 0),
            task(3, Some(1), 6, 10, 0),
            task(4, Some(2), 1, 3, 0),
            task(5, None, 2, 4, 0),
            task(6, Some(5), 2, 4, 0),
        ])
    }

    fn ids(rows: &[DisplayRow<'_>]) -> Vec<(TaskId, usize)> {
        rows.iter().map(|r| (r.task.id, r.level)).collect()
    }

    #[test]
    fn test_children_and_roots_keep_collection_order() {
        let h = sample();
        let children: Vec<_> = h.children_of(1).iter().map(|t| t.id).collect();
        assert_eq!(children, vec![2, 3]);
        let roots: Vec<_> = h.roots().iter().map(|t| t.id).collect();
        assert_eq!(roots, vec![1, 5]);
        assert!(h.children_of(99).is_empty());
        assert!(h.has_children(2));
        assert!(!h.has_children(4));
    }

    #[test]
    fn test_depth_and_root_color() {
        let mut tasks = sample().tasks().to_vec();
        tasks[0].color = "#ef4444".into();
        let h = Hierarchy::new(tasks);
        let leaf = h.get(4).unwrap();
        assert_eq!(h.depth_of(leaf), 2);
        assert_eq!(h.root_color_of(leaf), "#ef4444");
        assert_eq!(h.depth_of(h.get(1).unwrap()), 0);
        assert_eq!(h.display_color(h.get(1).unwrap()), "#ef4444");
        assert_eq!(h.display_color(leaf), derive_descendant_color("#ef4444", 2));
    }

    #[test]
    fn test_dangling_parent_stops_walk() {
        let h = Hierarchy::new(vec![task(1, Some(42), 1, 2, 0), task(2, Some(1), 1, 2, 0)]);
        assert_eq!(h.depth_of(h.get(1).unwrap()), 0);
        assert_eq!(h.depth_of(h.get(2).unwrap()), 1);
        assert_eq!(h.root_of(h.get(2).unwrap()).id, 1);
    }

    #[test]
    fn test_cycles_do_not_loop() {
        let h = Hierarchy::new(vec![
            task(1, Some(2), 1, 2, 0),
            task(2, Some(1), 1, 2, 0),
            task(3, Some(3), 1, 2, 0),
        ]);
        assert_eq!(h.depth_of(h.get(1).unwrap()), 1);
        assert_eq!(h.depth_of(h.get(3).unwrap()), 0);
        assert!(!h.has_children(3));
        assert_eq!(h.descendants_of(1), vec![2]);
        assert!(h.flatten_for_display(&CollapseSet::new()).is_empty());
    }

    #[test]
    fn test_flatten_pre_order_with_levels() {
        let h = sample();
        let rows = h.flatten_for_display(&CollapseSet::new());
        assert_eq!(ids(&rows), vec![(1, 0), (2, 1), (4, 2), (3, 1), (5, 0), (6, 1)]);
    }

    #[test]
    fn test_flatten_hides_collapsed_subtree_only() {
        let h = sample();
        let collapsed: CollapseSet = [2].into_iter().collect();
        let rows = h.flatten_for_display(&collapsed);
        assert_eq!(ids(&rows), vec![(1, 0), (2, 1), (3, 1), (5, 0), (6, 1)]);

        // Independent count: every task minus the descendants of collapsed nodes.
        let hidden = h.descendants_of(2).len();
        assert_eq!(rows.len(), h.len() - hidden);
    }

    #[test]
    fn test_collapsing_a_root_keeps_the_root() {
        let h = sample();
        let mut collapsed = CollapseSet::new();
        assert!(collapsed.toggle(1));
        let rows = h.flatten_for_display(&collapsed);
        assert_eq!(ids(&rows), vec![(1, 0), (5, 0), (6, 1)]);
        assert!(!collapsed.toggle(1));
        assert_eq!(h.flatten_for_display(&collapsed).len(), 6);
    }

    #[test]
    fn test_descendant_queries() {
        let h = sample();
        assert_eq!(h.descendants_of(1), vec![2, 4, 3]);
        assert!(h.is_descendant(1, 4));
        assert!(!h.is_descendant(4, 1));
        assert!(!h.is_descendant(5, 4));
    }
}
