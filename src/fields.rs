//! Enumerations and field types shared across the engines.
//!
//! This module defines the closed sets the core works with: derived status
//! labels and their colour categories, sort directions, the task table's
//! columns and the weekly health classification.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Derived display status of a task, one per rule of the status cascade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum StatusLabel {
    OverdueNotComplete,
    OverdueNotStarted,
    CompletedLate,
    CompletedOnTime,
    InProgress,
    Planned,
}

impl StatusLabel {
    /// Every label, in cascade priority order.
    pub const ALL: [StatusLabel; 6] = [
        StatusLabel::OverdueNotComplete,
        StatusLabel::OverdueNotStarted,
        StatusLabel::CompletedLate,
        StatusLabel::CompletedOnTime,
        StatusLabel::InProgress,
        StatusLabel::Planned,
    ];

    /// Human-readable label as shown in task tables.
    pub fn label(self) -> &'static str {
        match self {
            StatusLabel::OverdueNotComplete => "Overdue - Not Complete on Time",
            StatusLabel::OverdueNotStarted => "Overdue - Not Started On Time",
            StatusLabel::CompletedLate => "Completed Late",
            StatusLabel::CompletedOnTime => "Completed on time",
            StatusLabel::InProgress => "In Progress",
            StatusLabel::Planned => "Planned",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Presentation category attached to a derived status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum StatusColor {
    Critical,
    Destructive,
    Success,
    Warning,
    Secondary,
}

impl StatusColor {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusColor::Critical => "critical",
            StatusColor::Destructive => "destructive",
            StatusColor::Success => "success",
            StatusColor::Warning => "warning",
            StatusColor::Secondary => "secondary",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of the single active sort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Advance the sort cycle: none -> ascending -> descending -> none.
    pub fn cycle(current: Option<SortDirection>) -> Option<SortDirection> {
        match current {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Columns of the implementation task table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum TaskColumn {
    Title,
    Step,
    Status,
    PlannedStart,
    PlannedEnd,
    ActualStart,
    ActualEnd,
}

/// Weekly binary health classification of a customer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Green,
    Red,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Health::Green => f.write_str("green"),
            Health::Red => f.write_str("red"),
        }
    }
}
