//! Table filter and sort state.
//!
//! `FilterSortState` is transient view state for one table: a set of selected
//! values per column plus at most one sorted column. Filters are OR within a
//! column and AND across columns; an empty selection lets every row through.
//! The derived view is recomputed from the rows on every read.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::error::{Error, Result};
use crate::fields::{SortDirection, TaskColumn};
use crate::status::{compute_status, TaskStatusResult};
use crate::task::Task;

/// A statically declared column identifier.
pub trait TableColumn: Copy + Eq + Ord + Hash + fmt::Debug {
    fn id(self) -> &'static str;
}

impl TableColumn for TaskColumn {
    fn id(self) -> &'static str {
        match self {
            TaskColumn::Title => "title",
            TaskColumn::Step => "step",
            TaskColumn::Status => "status",
            TaskColumn::PlannedStart => "planned-start",
            TaskColumn::PlannedEnd => "planned-end",
            TaskColumn::ActualStart => "actual-start",
            TaskColumn::ActualEnd => "actual-end",
        }
    }
}

impl TaskColumn {
    /// Resolve a column from its command-line identifier.
    pub fn parse(s: &str) -> Result<Self> {
        <TaskColumn as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| Error::UnknownColumn(s.trim().to_string()))
    }
}

/// Comparable cell value. Missing values order before everything else.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Number(i64),
    Date(NaiveDate),
    Text(String),
}

/// A row that a table over columns `C` can filter and sort.
pub trait TableRow<C> {
    /// Value matched against the column's selected-value set.
    fn filter_value(&self, column: C) -> String;
    /// Value the column sorts by.
    fn sort_value(&self, column: C) -> SortValue;
}

/// The single active sort, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<C> {
    pub column: Option<C>,
    pub direction: Option<SortDirection>,
}

impl<C> Default for SortState<C> {
    fn default() -> Self {
        SortState { column: None, direction: None }
    }
}

/// Filter and sort state for one table view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSortState<C: TableColumn> {
    filters: BTreeMap<C, BTreeSet<String>>,
    sort: SortState<C>,
}

impl<C: TableColumn> FilterSortState<C> {
    /// Fresh state over a fixed column set: no filters, no sort.
    pub fn new(columns: impl IntoIterator<Item = C>) -> Self {
        FilterSortState {
            filters: columns.into_iter().map(|c| (c, BTreeSet::new())).collect(),
            sort: SortState::default(),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = C> + '_ {
        self.filters.keys().copied()
    }

    /// Selected values for a column, `None` if the column is not part of this table.
    pub fn selected(&self, column: C) -> Option<&BTreeSet<String>> {
        self.filters.get(&column)
    }

    pub fn sort(&self) -> SortState<C> {
        self.sort
    }

    fn check(&self, column: C) -> Result<()> {
        if self.filters.contains_key(&column) {
            Ok(())
        } else {
            Err(Error::UnknownColumn(column.id().to_string()))
        }
    }

    /// Replace one column's selected values. Other columns and the sort are untouched.
    pub fn set_filter<I, S>(&mut self, column: C, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check(column)?;
        let values = values.into_iter().map(Into::into).collect();
        self.filters.insert(column, values);
        Ok(())
    }

    /// Sort by exactly this column and direction, or clear the sort when `direction` is `None`.
    pub fn set_sort(&mut self, column: C, direction: Option<SortDirection>) -> Result<()> {
        self.check(column)?;
        self.sort = match direction {
            Some(d) => SortState { column: Some(column), direction: Some(d) },
            None => SortState::default(),
        };
        Ok(())
    }

    /// Advance the sort cycle for a column. Switching to another column starts at ascending.
    pub fn cycle_sort(&mut self, column: C) -> Result<Option<SortDirection>> {
        let current = if self.sort.column == Some(column) {
            self.sort.direction
        } else {
            None
        };
        let next = SortDirection::cycle(current);
        self.set_sort(column, next)?;
        Ok(next)
    }

    pub fn clear_filters(&mut self) {
        for values in self.filters.values_mut() {
            values.clear();
        }
    }

    pub fn clear_all(&mut self) {
        self.clear_filters();
        self.sort = SortState::default();
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters.values().any(|v| !v.is_empty())
    }

    /// Whether a row passes every non-empty column filter.
    pub fn matches<R: TableRow<C>>(&self, row: &R) -> bool {
        self.filters
            .iter()
            .filter(|(_, selected)| !selected.is_empty())
            .all(|(&column, selected)| selected.contains(&row.filter_value(column)))
    }

    /// Filtered and stably sorted view of `rows`.
    pub fn apply<'a, R: TableRow<C>>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let filtered = rows.iter().filter(|r| self.matches(*r));
        let (Some(column), Some(direction)) = (self.sort.column, self.sort.direction) else {
            return filtered.collect();
        };
        let mut keyed: Vec<(SortValue, &R)> =
            filtered.map(|r| (r.sort_value(column), r)).collect();
        match direction {
            SortDirection::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
            SortDirection::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
        }
        keyed.into_iter().map(|(_, r)| r).collect()
    }
}

/// One entry of a column's filter drop-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        FilterOption { value: value.into(), label: label.into() }
    }
}

/// Label of the option that selects rows with an empty cell.
pub const NONE_LABEL: &str = "(none)";

/// Distinct values of a column, in order of first appearance.
pub fn distinct_options<C: Copy, R: TableRow<C>>(rows: &[R], column: C) -> Vec<FilterOption> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for row in rows {
        let value = row.filter_value(column);
        if seen.insert(value.clone()) {
            let label = if value.is_empty() { NONE_LABEL.to_string() } else { value.clone() };
            out.push(FilterOption { value, label });
        }
    }
    out
}

/// Presentation order of a filter drop-down.
///
/// Selected options come first in their existing order, then the rest
/// alphabetically by label. A non-empty `search` keeps only options whose
/// label contains it, ignoring case. The selection itself is not touched.
pub fn filter_options(
    options: &[FilterOption],
    selected: &BTreeSet<String>,
    search: &str,
) -> Vec<FilterOption> {
    let needle = search.trim().to_lowercase();
    let visible = |o: &&FilterOption| needle.is_empty() || o.label.to_lowercase().contains(&needle);

    let mut out: Vec<FilterOption> = options
        .iter()
        .filter(|o| selected.contains(&o.value))
        .filter(visible)
        .cloned()
        .collect();
    let mut rest: Vec<FilterOption> = options
        .iter()
        .filter(|o| !selected.contains(&o.value))
        .filter(visible)
        .cloned()
        .collect();
    rest.sort_by(|a, b| {
        a.label
            .to_lowercase()
            .cmp(&b.label.to_lowercase())
            .then_with(|| a.label.cmp(&b.label))
    });
    out.extend(rest);
    out
}

/// A task paired with its derived status, as shown in the task table.
#[derive(Debug, Clone)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    pub status: TaskStatusResult,
}

impl<'a> TaskRow<'a> {
    pub fn new(task: &'a Task, today: NaiveDate) -> Self {
        TaskRow { task, status: compute_status(&task.status_data(), today) }
    }

    /// Rows for every task, in input order.
    pub fn build(tasks: &'a [Task], today: NaiveDate) -> Vec<TaskRow<'a>> {
        tasks.iter().map(|t| TaskRow::new(t, today)).collect()
    }

    fn date(&self, column: TaskColumn) -> Option<NaiveDate> {
        let value = match column {
            TaskColumn::PlannedStart => &self.task.planned_start,
            TaskColumn::PlannedEnd => &self.task.planned_end,
            TaskColumn::ActualStart => &self.task.actual_start,
            TaskColumn::ActualEnd => &self.task.actual_end,
            _ => return None,
        };
        value.as_ref().and_then(|d| d.to_date())
    }
}

/// Text cells sort case-insensitively.
fn text_key(s: &str) -> SortValue {
    SortValue::Text(s.to_lowercase())
}

impl TableRow<TaskColumn> for TaskRow<'_> {
    fn filter_value(&self, column: TaskColumn) -> String {
        match column {
            TaskColumn::Title => self.task.title.clone(),
            TaskColumn::Step => self.task.step_id.clone().unwrap_or_default(),
            TaskColumn::Status => self.status.status.label().to_string(),
            _ => self.date(column).map(|d| d.to_string()).unwrap_or_default(),
        }
    }

    fn sort_value(&self, column: TaskColumn) -> SortValue {
        match column {
            TaskColumn::Title => text_key(&self.task.title),
            TaskColumn::Step => self.task.step_id.as_deref().map_or(SortValue::Missing, text_key),
            TaskColumn::Status => text_key(self.status.status.label()),
            _ => self.date(column).map(SortValue::Date).unwrap_or(SortValue::Missing),
        }
    }
}

/// Parse `COLUMN=V1,V2` into a column and its selected values.
///
/// The token [`NONE_LABEL`] selects rows whose cell is empty.
pub fn parse_filter_spec(spec: &str) -> Result<(TaskColumn, Vec<String>)> {
    let (column, values) = spec
        .split_once('=')
        .ok_or_else(|| Error::InvalidFilter(spec.to_string()))?;
    let column = TaskColumn::parse(column)?;
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| if v == NONE_LABEL { String::new() } else { v.to_string() })
        .collect();
    Ok((column, values))
}

/// Parse `COLUMN[:asc|desc]`; the direction defaults to ascending.
pub fn parse_sort_spec(spec: &str) -> Result<(TaskColumn, SortDirection)> {
    let (column, direction) = match spec.split_once(':') {
        Some((c, d)) => (c, d.trim()),
        None => (spec, "asc"),
    };
    let direction = <SortDirection as ValueEnum>::from_str(direction, true)
        .map_err(|_| Error::InvalidSort(spec.to_string()))?;
    Ok((TaskColumn::parse(column)?, direction))
}
