//! Hierarchical task layout for the Gantt view.
//!
//! Tasks arrive as a flat list with parent references. Within each step the
//! root tasks are ordered by position and each one is followed by its
//! children, recursively, before the next root. Parents are resolved through
//! an id lookup rather than an owned tree.
//!
//! Tasks whose parent is not in the same step are dropped, as are tasks caught
//! in a parent cycle or nested deeper than [`MAX_DEPTH`].

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::flags::{FeatureFlag, FeatureFlagProvider};
use crate::status::{compute_status, TaskStatusResult};
use crate::task::{DateValue, Task, TaskStatusData};

/// Deepest level the layout will descend to. Roots are level 0.
pub const MAX_DEPTH: usize = 16;

/// A task placed in the display sequence.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRow<'a> {
    pub task: &'a Task,
    pub level: usize,
}

/// Group task indices by step, steps in order of first appearance.
fn group_by_step(tasks: &[Task]) -> Vec<Vec<usize>> {
    let mut order: Vec<Option<&str>> = Vec::new();
    let mut groups: HashMap<Option<&str>, Vec<usize>> = HashMap::new();
    for (i, t) in tasks.iter().enumerate() {
        let key = t.step_id.as_deref();
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(i);
    }
    order
        .into_iter()
        .filter_map(|k| groups.remove(&k))
        .collect()
}

/// Lay tasks out root-then-children, annotating each with its level.
pub fn layout_tasks(tasks: &[Task]) -> Vec<LayoutRow<'_>> {
    let mut out = Vec::with_capacity(tasks.len());
    for group in group_by_step(tasks) {
        layout_step(tasks, &group, &mut out);
    }
    out
}

fn layout_step<'a>(tasks: &'a [Task], group: &[usize], out: &mut Vec<LayoutRow<'a>>) {
    let mut by_id: HashMap<&str, usize> = HashMap::new();
    for &i in group {
        by_id.entry(tasks[i].id.as_str()).or_insert(i);
    }

    let mut roots = Vec::new();
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for &i in group {
        match tasks[i].parent_task_id.as_deref() {
            None => roots.push(i),
            Some(pid) => match by_id.get(pid) {
                Some(&p) => children.entry(p).or_default().push(i),
                None => debug!(task = %tasks[i].id, parent = pid, "dropping task with unresolved parent"),
            },
        }
    }
    roots.sort_by_key(|&i| tasks[i].position);
    for siblings in children.values_mut() {
        siblings.sort_by_key(|&i| tasks[i].position);
    }

    let mut visited: HashSet<usize> = HashSet::new();
    let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|&i| (i, 0)).collect();
    while let Some((i, level)) = stack.pop() {
        if level > MAX_DEPTH || !visited.insert(i) {
            continue;
        }
        out.push(LayoutRow { task: &tasks[i], level });
        if let Some(kids) = children.get(&i) {
            stack.extend(kids.iter().rev().map(|&c| (c, level + 1)));
        }
    }

    let unplaced = group.iter().filter(|&i| !visited.contains(i)).count();
    if unplaced > 0 {
        debug!(unplaced, "tasks left out of hierarchical layout");
    }
}

/// Every task at level 0, by step then position.
pub fn layout_flat(tasks: &[Task]) -> Vec<LayoutRow<'_>> {
    let mut out = Vec::with_capacity(tasks.len());
    for mut group in group_by_step(tasks) {
        group.sort_by_key(|&i| tasks[i].position);
        out.extend(group.into_iter().map(|i| LayoutRow { task: &tasks[i], level: 0 }));
    }
    out
}

/// One bar of the Gantt chart.
#[derive(Debug, Clone)]
pub struct GanttRow<'a> {
    pub task: &'a Task,
    pub level: usize,
    pub status: TaskStatusResult,
    pub bar: Option<(NaiveDate, NaiveDate)>,
}

impl GanttRow<'_> {
    /// Subtasks can only be added under root tasks.
    pub fn can_add_subtask(&self) -> bool {
        self.level == 0
    }
}

fn bar_span(task: &Task) -> Option<(NaiveDate, NaiveDate)> {
    let day = |v: &Option<DateValue>| v.as_ref().and_then(|d| d.to_date());
    let start = day(&task.planned_start).or_else(|| day(&task.actual_start));
    let end = day(&task.planned_end).or_else(|| day(&task.actual_end));
    match (start, end) {
        (Some(s), Some(e)) => Some((s.min(e), s.max(e))),
        (Some(d), None) | (None, Some(d)) => Some((d, d)),
        (None, None) => None,
    }
}

/// Rows and timeline range of the implementation Gantt view.
#[derive(Debug, Clone)]
pub struct GanttLayout<'a> {
    pub rows: Vec<GanttRow<'a>>,
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub hierarchical: bool,
}

impl<'a> GanttLayout<'a> {
    /// Build the view. With the Gantt flag off the rows fall back to a flat list.
    pub fn build(tasks: &'a [Task], today: NaiveDate, flags: &dyn FeatureFlagProvider) -> Self {
        let hierarchical = flags.is_enabled(FeatureFlag::Gantt);
        let placed = if hierarchical { layout_tasks(tasks) } else { layout_flat(tasks) };

        let rows: Vec<GanttRow<'a>> = placed
            .into_iter()
            .map(|r| GanttRow {
                task: r.task,
                level: r.level,
                status: compute_status(&r.task.status_data(), today),
                bar: bar_span(r.task),
            })
            .collect();

        let range = rows
            .iter()
            .filter_map(|r| r.bar)
            .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, (s, e)| match acc {
                None => Some((s, e)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(e))),
            });

        GanttLayout { rows, range, hierarchical }
    }

    pub fn row(&self, task_id: &str) -> Option<&GanttRow<'a>> {
        self.rows.iter().find(|r| r.task.id == task_id)
    }

    /// Rows passing `keep`, plus every ancestor of a passing row so nested
    /// rows are never shown under the wrong parent.
    pub fn retain_with_ancestors<F>(&self, keep: F) -> Vec<&GanttRow<'a>>
    where
        F: Fn(&GanttRow<'a>) -> bool,
    {
        let mut kept = vec![false; self.rows.len()];
        let mut open: Vec<usize> = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            open.truncate(row.level);
            if keep(row) {
                kept[i] = true;
                for &ancestor in &open {
                    kept[ancestor] = true;
                }
            }
            open.push(i);
        }
        self.rows.iter().zip(kept).filter(|(_, k)| *k).map(|(r, _)| r).collect()
    }
}

/// Fields of a task about to be created.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub details: Option<String>,
    pub dates: TaskStatusData,
}

/// Changes to an existing task. `None` leaves a field alone; for dates
/// `Some(None)` clears the field.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub details: Option<String>,
    pub planned_start: Option<Option<DateValue>>,
    pub planned_end: Option<Option<DateValue>>,
    pub actual_start: Option<Option<DateValue>>,
    pub actual_end: Option<Option<DateValue>>,
}

/// What a user asked the Gantt view to do. The view never mutates tasks
/// itself; it relays these to an [`IntentSink`].
#[derive(Debug, Clone)]
pub enum LayoutIntent {
    AddRootTask { step_id: Option<String>, draft: TaskDraft },
    AddSubtask { parent_id: String, draft: TaskDraft },
    EditTask { task_id: String, changes: TaskChanges },
    DeleteTask { task_id: String },
}

/// Receiver of layout intents, typically the record store.
pub trait IntentSink {
    /// Carry out the intent and return the id of the affected task.
    fn apply(&mut self, intent: LayoutIntent) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::StaticFlags;
    use pretty_assertions::assert_eq;

    fn task(id: &str, step: &str, parent: Option<&str>, position: i64) -> Task {
        let mut t = Task::new(id, id.to_uppercase());
        t.step_id = Some(step.to_string());
        t.parent_task_id = parent.map(str::to_string);
        t.position = position;
        t
    }

    fn ids_levels(rows: &[LayoutRow<'_>]) -> Vec<(String, usize)> {
        rows.iter().map(|r| (r.task.id.clone(), r.level)).collect()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_roots_followed_by_children() {
        let tasks = vec![
            task("c2a", "s1", Some("r2"), 1),
            task("r2", "s1", None, 2),
            task("c1b", "s1", Some("r1"), 2),
            task("r1", "s1", None, 1),
            task("c1a", "s1", Some("r1"), 1),
        ];
        let expected: Vec<(String, usize)> = [("r1", 0), ("c1a", 1), ("c1b", 1), ("r2", 0), ("c2a", 1)]
            .iter()
            .map(|(id, l)| (id.to_string(), *l))
            .collect();
        assert_eq!(ids_levels(&layout_tasks(&tasks)), expected);
    }

    #[test]
    fn test_steps_in_first_appearance_order() {
        let tasks = vec![
            task("b1", "build", None, 1),
            task("p1", "plan", None, 1),
            task("b0", "build", None, 0),
        ];
        let ids: Vec<String> = layout_tasks(&tasks).iter().map(|r| r.task.id.clone()).collect();
        assert_eq!(ids, vec!["b0", "b1", "p1"]);
    }

    #[test]
    fn test_orphans_are_dropped() {
        let tasks = vec![
            task("r1", "s1", None, 1),
            task("lost", "s1", Some("missing"), 1),
            task("other-step", "s2", Some("r1"), 1),
        ];
        let rows = layout_tasks(&tasks);
        assert_eq!(ids_levels(&rows), vec![("r1".to_string(), 0)]);
    }

    #[test]
    fn test_cycles_are_dropped() {
        let tasks = vec![
            task("r1", "s1", None, 1),
            task("a", "s1", Some("b"), 1),
            task("b", "s1", Some("a"), 2),
            task("self", "s1", Some("self"), 3),
        ];
        assert_eq!(ids_levels(&layout_tasks(&tasks)), vec![("r1".to_string(), 0)]);
    }

    #[test]
    fn test_deeper_nesting_and_depth_bound() {
        let mut tasks = vec![task("n0", "s1", None, 0)];
        for i in 1..=MAX_DEPTH + 3 {
            let parent = format!("n{}", i - 1);
            tasks.push(task(&format!("n{i}"), "s1", Some(&parent), 0));
        }
        let rows = layout_tasks(&tasks);
        assert_eq!(rows.len(), MAX_DEPTH + 1);
        assert_eq!(rows.last().unwrap().level, MAX_DEPTH);
    }

    #[test]
    fn test_equal_positions_keep_input_order() {
        let tasks = vec![task("x", "s1", None, 1), task("y", "s1", None, 1)];
        let ids: Vec<String> = layout_tasks(&tasks).iter().map(|r| r.task.id.clone()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn test_gantt_flag_off_is_flat() {
        let tasks = vec![
            task("c1", "s1", Some("r1"), 0),
            task("r1", "s1", None, 1),
        ];
        let layout = GanttLayout::build(&tasks, ymd(2024, 6, 1), &StaticFlags::default());
        assert!(!layout.hierarchical);
        assert_eq!(layout.rows.len(), 2);
        assert!(layout.rows.iter().all(|r| r.level == 0));
        assert_eq!(layout.rows[0].task.id, "c1");
    }

    #[test]
    fn test_gantt_rows_carry_status_and_range() {
        let mut r1 = task("r1", "s1", None, 1);
        r1.planned_start = Some("2024-05-01".into());
        r1.planned_end = Some("2024-05-20".into());
        let mut c1 = task("c1", "s1", Some("r1"), 1);
        c1.actual_start = Some("2024-05-03".into());
        c1.planned_end = Some("2024-06-10".into());
        let tasks = vec![r1, c1];

        let layout = GanttLayout::build(&tasks, ymd(2024, 6, 1), &StaticFlags::all_on());
        assert!(layout.hierarchical);
        assert_eq!(layout.range, Some((ymd(2024, 5, 1), ymd(2024, 6, 10))));

        let root = layout.row("r1").unwrap();
        assert!(root.can_add_subtask());
        assert_eq!(root.status.status.label(), "Overdue - Not Complete on Time");

        let child = layout.row("c1").unwrap();
        assert!(!child.can_add_subtask());
        assert_eq!(child.bar, Some((ymd(2024, 5, 3), ymd(2024, 6, 10))));
        assert_eq!(child.status.status.label(), "In Progress");
    }

    #[test]
    fn test_retain_keeps_ancestors_of_matches() {
        let tasks = vec![
            task("r1", "s1", None, 1),
            task("c1", "s1", Some("r1"), 1),
            task("r2", "s1", None, 2),
            task("c2", "s1", Some("r2"), 1),
            task("g2", "s1", Some("c2"), 1),
        ];
        let layout = GanttLayout::build(&tasks, ymd(2024, 6, 1), &StaticFlags::all_on());
        let kept: Vec<(String, usize)> = layout
            .retain_with_ancestors(|r| r.task.id == "g2" || r.task.id == "r1")
            .iter()
            .map(|r| (r.task.id.clone(), r.level))
            .collect();
        let expected: Vec<(String, usize)> = [("r1", 0), ("r2", 0), ("c2", 1), ("g2", 2)]
            .iter()
            .map(|(id, l)| (id.to_string(), *l))
            .collect();
        assert_eq!(kept, expected);
    }
}
