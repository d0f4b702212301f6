//! Local JSON record store and display helpers.
//!
//! `Database` stands in for the hosted backend: it holds the raw task,
//! metric, review and customer rows the engines consume, and carries out the
//! task mutations relayed from the Gantt view.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::layout::{IntentSink, LayoutIntent, TaskChanges, TaskDraft};
use crate::status::compute_status_now;
use crate::table::TaskRow;
use crate::task::{DateValue, Task};
use crate::weekly::{Customer, HealthReview, MetricRow};

/// In-memory copy of the record store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub metrics: Vec<MetricRow>,
    #[serde(default)]
    pub reviews: Vec<HealthReview>,
    #[serde(default)]
    pub customers: Vec<Customer>,
}

impl Database {
    /// Load the store from a JSON file. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "store not found, starting empty");
            return Ok(Database::default());
        }
        let buf = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&buf)?)
    }

    /// Save the store using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let io = |source| Error::Io { path: path.to_path_buf(), source };
        let data = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp).map_err(io)?;
        f.write_all(data.as_bytes()).map_err(io)?;
        f.flush().map_err(io)?;
        fs::rename(&tmp, path).map_err(io)?;
        info!(path = %path.display(), tasks = self.tasks.len(), "saved store");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Next free position among tasks sharing a step and parent.
    fn next_position(&self, step_id: Option<&str>, parent: Option<&str>) -> i64 {
        self.tasks
            .iter()
            .filter(|t| t.step_id.as_deref() == step_id && t.parent_task_id.as_deref() == parent)
            .map(|t| t.position)
            .max()
            .map_or(1, |p| p + 1)
    }

    fn insert(&mut self, step_id: Option<String>, parent: Option<String>, draft: TaskDraft) -> String {
        let now = Utc::now().timestamp();
        let position = self.next_position(step_id.as_deref(), parent.as_deref());
        let id = Uuid::new_v4().to_string();
        let status = compute_status_now(&draft.dates).status.label().to_string();
        self.tasks.push(Task {
            id: id.clone(),
            title: draft.title,
            details: draft.details,
            status,
            step_id,
            planned_start: draft.dates.planned_start,
            planned_end: draft.dates.planned_end,
            actual_start: draft.dates.actual_start,
            actual_end: draft.dates.actual_end,
            parent_task_id: parent,
            position,
            created_at_utc: now,
            updated_at_utc: now,
        });
        id
    }

    fn update(&mut self, id: &str, changes: TaskChanges) -> Result<()> {
        let task = self.get_mut(id).ok_or_else(|| Error::UnknownTask(id.to_string()))?;
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(details) = changes.details {
            task.details = Some(details);
        }
        if let Some(d) = changes.planned_start {
            task.planned_start = d;
        }
        if let Some(d) = changes.planned_end {
            task.planned_end = d;
        }
        if let Some(d) = changes.actual_start {
            task.actual_start = d;
        }
        if let Some(d) = changes.actual_end {
            task.actual_end = d;
        }
        task.status = compute_status_now(&task.status_data()).status.label().to_string();
        task.updated_at_utc = Utc::now().timestamp();
        Ok(())
    }

    /// Remove a task and everything nested under it.
    fn remove_cascade(&mut self, id: &str) -> Result<usize> {
        if self.get(id).is_none() {
            return Err(Error::UnknownTask(id.to_string()));
        }
        let child_map = build_children_map(&self.tasks);
        let mut doomed = HashSet::new();
        doomed.insert(id.to_string());
        collect_descendants(id, &child_map, &mut doomed);
        let before = self.tasks.len();
        self.tasks.retain(|t| !doomed.contains(&t.id));
        Ok(before - self.tasks.len())
    }
}

impl IntentSink for Database {
    fn apply(&mut self, intent: LayoutIntent) -> Result<String> {
        match intent {
            LayoutIntent::AddRootTask { step_id, draft } => Ok(self.insert(step_id, None, draft)),
            LayoutIntent::AddSubtask { parent_id, draft } => {
                let parent = self
                    .get(&parent_id)
                    .ok_or_else(|| Error::UnknownTask(parent_id.clone()))?;
                let step_id = parent.step_id.clone();
                Ok(self.insert(step_id, Some(parent_id), draft))
            }
            LayoutIntent::EditTask { task_id, changes } => {
                self.update(&task_id, changes)?;
                Ok(task_id)
            }
            LayoutIntent::DeleteTask { task_id } => {
                let removed = self.remove_cascade(&task_id)?;
                info!(task = %task_id, removed, "deleted task");
                Ok(task_id)
            }
        }
    }
}

/// Build a map of parent task ids to their children's ids.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = &t.parent_task_id {
            map.entry(p.clone()).or_default().push(t.id.clone());
        }
    }
    map
}

/// Collect all descendant ids of `root`. The `out` set doubles as the cycle guard.
pub fn collect_descendants(root: &str, child_map: &BTreeMap<String, Vec<String>>, out: &mut HashSet<String>) {
    if let Some(children) = child_map.get(root) {
        for c in children {
            if out.insert(c.clone()) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn format_day(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}

/// Print task rows in a formatted table, indented by level.
pub fn print_task_table<'r, 't: 'r>(rows: impl IntoIterator<Item = (&'r TaskRow<'t>, usize)>) {
    println!(
        "{:<10} {:<12} {:<31} {:<10} {:<10} {:<10} {:<10} {}",
        "ID", "Step", "Status", "Plan from", "Plan to", "Started", "Finished", "Title"
    );
    for (row, level) in rows {
        let t = row.task;
        let day = |v: &Option<DateValue>| format_day(v.as_ref().and_then(|d| d.to_date()));
        println!(
            "{:<10} {:<12} {:<31} {:<10} {:<10} {:<10} {:<10} {}{}",
            truncate(&t.id, 10),
            truncate(t.step_id.as_deref().unwrap_or("-"), 12),
            row.status.status.label(),
            day(&t.planned_start),
            day(&t.planned_end),
            day(&t.actual_start),
            day(&t.actual_end),
            "  ".repeat(level),
            t.title
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatusData;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft { title: title.to_string(), details: None, dates: TaskStatusData::new() }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title", 6), "a lon…");
    }

    #[test]
    fn test_intents_add_edit_delete() {
        let mut db = Database::default();
        let root = db
            .apply(LayoutIntent::AddRootTask { step_id: Some("s1".into()), draft: draft("Root") })
            .unwrap();
        let second = db
            .apply(LayoutIntent::AddRootTask { step_id: Some("s1".into()), draft: draft("Second") })
            .unwrap();
        let child = db
            .apply(LayoutIntent::AddSubtask { parent_id: root.clone(), draft: draft("Child") })
            .unwrap();

        assert_eq!(db.get(&root).unwrap().position, 1);
        assert_eq!(db.get(&second).unwrap().position, 2);
        let child_task = db.get(&child).unwrap();
        assert_eq!(child_task.parent_task_id.as_deref(), Some(root.as_str()));
        assert_eq!(child_task.step_id.as_deref(), Some("s1"));
        assert_eq!(child_task.position, 1);
        assert_eq!(child_task.status, "Planned");

        let changes = TaskChanges {
            actual_start: Some(Some("2024-01-01".into())),
            ..TaskChanges::default()
        };
        db.apply(LayoutIntent::EditTask { task_id: child.clone(), changes }).unwrap();
        assert_eq!(db.get(&child).unwrap().status, "In Progress");

        db.apply(LayoutIntent::DeleteTask { task_id: root.clone() }).unwrap();
        assert!(db.get(&root).is_none());
        assert!(db.get(&child).is_none());
        assert!(db.get(&second).is_some());
    }

    #[test]
    fn test_unknown_task_intents_fail() {
        let mut db = Database::default();
        let err = db
            .apply(LayoutIntent::AddSubtask { parent_id: "nope".into(), draft: draft("x") })
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTask(_)));
        assert!(db.apply(LayoutIntent::DeleteTask { task_id: "nope".into() }).is_err());
        assert!(db.tasks.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        assert!(Database::load(&path).unwrap().tasks.is_empty());

        let mut db = Database::default();
        db.apply(LayoutIntent::AddRootTask { step_id: None, draft: draft("Kickoff") }).unwrap();
        db.save(&path).unwrap();

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].title, "Kickoff");
    }

    #[test]
    fn test_load_rejects_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Database::load(&path), Err(Error::Json(_))));
    }
}
