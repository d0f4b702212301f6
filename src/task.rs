//! Task data structure and date input normalisation.
//!
//! Dates reach the core either as typed dates or as strings straight from the
//! record store. `DateValue` holds either form and normalises to a calendar
//! day (time-of-day discarded) only when a comparison needs it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// A date as supplied by a caller: a typed date or an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Date(NaiveDate),
    Text(String),
}

impl DateValue {
    /// Normalise to a calendar day. Blank or malformed strings count as absent.
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Date(d) => Some(*d),
            DateValue::Text(s) if s.trim().is_empty() => None,
            DateValue::Text(s) => match parse_date(s) {
                Ok(d) => Some(d),
                Err(_) => {
                    warn!(value = %s, "ignoring malformed date");
                    None
                }
            },
        }
    }
}

impl From<NaiveDate> for DateValue {
    fn from(d: NaiveDate) -> Self {
        DateValue::Date(d)
    }
}

impl From<&str> for DateValue {
    fn from(s: &str) -> Self {
        DateValue::Text(s.to_string())
    }
}

impl From<String> for DateValue {
    fn from(s: String) -> Self {
        DateValue::Text(s)
    }
}

/// Parse `YYYY-MM-DD`, an RFC 3339 timestamp or a naive timestamp into the
/// calendar day it falls on.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(Error::InvalidDate(s.to_string()))
}

/// The four dates the status cascade looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusData {
    pub planned_start: Option<DateValue>,
    pub planned_end: Option<DateValue>,
    pub actual_start: Option<DateValue>,
    pub actual_end: Option<DateValue>,
}

impl TaskStatusData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn planned_start(mut self, d: impl Into<DateValue>) -> Self {
        self.planned_start = Some(d.into());
        self
    }

    pub fn planned_end(mut self, d: impl Into<DateValue>) -> Self {
        self.planned_end = Some(d.into());
        self
    }

    pub fn actual_start(mut self, d: impl Into<DateValue>) -> Self {
        self.actual_start = Some(d.into());
        self
    }

    pub fn actual_end(mut self, d: impl Into<DateValue>) -> Self {
        self.actual_end = Some(d.into());
        self
    }
}

/// A unit of implementation work.
///
/// `status` is the free-form label stored alongside the record; the displayed
/// status is always recomputed from the dates. `parent_task_id` makes the task
/// a subtask, and `position` orders it among its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub step_id: Option<String>,
    #[serde(default)]
    pub planned_start: Option<DateValue>,
    #[serde(default)]
    pub planned_end: Option<DateValue>,
    #[serde(default)]
    pub actual_start: Option<DateValue>,
    #[serde(default)]
    pub actual_end: Option<DateValue>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub created_at_utc: i64,
    #[serde(default)]
    pub updated_at_utc: i64,
}

impl Task {
    /// A bare task with no dates, parent or step.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            details: None,
            status: String::new(),
            step_id: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            parent_task_id: None,
            position: 0,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    /// Project the task onto the inputs of the status cascade.
    pub fn status_data(&self) -> TaskStatusData {
        TaskStatusData {
            planned_start: self.planned_start.clone(),
            planned_end: self.planned_end.clone(),
            actual_start: self.actual_start.clone(),
            actual_end: self.actual_end.clone(),
        }
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_task_id.is_some()
    }
}
