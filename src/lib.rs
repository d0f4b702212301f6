//! # pmtrack
//!
//! The rule engines behind an implementation-tracking and customer-health
//! dashboard. Raw rows are fetched elsewhere; everything here is a
//! synchronous transform over data already in memory.
//!
//! ## Components
//!
//! - **Status derivation** ([`status`]): maps a task's planned/actual start
//!   and end dates to one of six display statuses.
//! - **Table state** ([`table`]): per-column multi-value filters and a single
//!   sorted column, applied to rows as a derived view.
//! - **Hierarchical layout** ([`layout`]): orders a flat task list into
//!   root-then-children display rows for the Gantt view.
//! - **Weekly aggregation** ([`weekly`]): week pickers, health counts and
//!   metric trends from per-customer weekly rows.
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use pmtrack::status::compute_status;
//! use pmtrack::task::TaskStatusData;
//!
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let data = TaskStatusData::new()
//!     .planned_start("2024-01-01")
//!     .planned_end("2024-01-05")
//!     .actual_start("2024-01-02");
//! assert_eq!(
//!     compute_status(&data, today).status.label(),
//!     "Overdue - Not Complete on Time"
//! );
//! ```
//!
//! The `pmtrack` binary drives these engines over a local JSON store.

pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod flags;
pub mod layout;
pub mod status;
pub mod table;
pub mod task;
pub mod weekly;

pub use error::{Error, Result};
