//! Task status derivation.
//!
//! A task's display status is a pure function of its four dates and the
//! current day. Rules are evaluated in priority order and the first match
//! wins:
//!
//! 1. planned end reached without an actual end: overdue, not complete
//! 2. planned start reached without an actual start: overdue, not started
//! 3. finished after the planned end: completed late
//! 4. finished on or before the planned end: completed on time
//! 5. started but not finished: in progress
//! 6. otherwise: planned
//!
//! Boundaries are inclusive, so a task whose planned end is today already
//! counts as overdue.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::fields::{StatusColor, StatusLabel};
use crate::task::TaskStatusData;

/// Derived status of a task. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskStatusResult {
    pub status: StatusLabel,
    pub color: StatusColor,
    #[serde(rename = "bgColor")]
    pub bg_color: &'static str,
}

impl TaskStatusResult {
    fn of(status: StatusLabel) -> Self {
        let (color, bg_color) = match status {
            StatusLabel::OverdueNotComplete => (StatusColor::Critical, "bg-red-700 text-white"),
            StatusLabel::OverdueNotStarted => (StatusColor::Destructive, "bg-red-500 text-white"),
            StatusLabel::CompletedLate => (StatusColor::Destructive, "bg-orange-500 text-white"),
            StatusLabel::CompletedOnTime => (StatusColor::Success, "bg-green-500 text-white"),
            StatusLabel::InProgress => (StatusColor::Warning, "bg-yellow-400 text-black"),
            StatusLabel::Planned => (StatusColor::Secondary, "bg-gray-200 text-gray-800"),
        };
        TaskStatusResult { status, color, bg_color }
    }
}

/// Run the status cascade against an explicit "today".
pub fn compute_status(data: &TaskStatusData, today: NaiveDate) -> TaskStatusResult {
    let planned_start = data.planned_start.as_ref().and_then(|d| d.to_date());
    let planned_end = data.planned_end.as_ref().and_then(|d| d.to_date());
    let actual_start = data.actual_start.as_ref().and_then(|d| d.to_date());
    let actual_end = data.actual_end.as_ref().and_then(|d| d.to_date());

    let label = match (planned_start, planned_end, actual_start, actual_end) {
        (_, Some(pe), _, None) if pe <= today => StatusLabel::OverdueNotComplete,
        (Some(ps), _, None, _) if ps <= today => StatusLabel::OverdueNotStarted,
        (_, Some(pe), _, Some(ae)) if ae > pe => StatusLabel::CompletedLate,
        (_, Some(_), _, Some(_)) => StatusLabel::CompletedOnTime,
        (_, _, Some(_), None) => StatusLabel::InProgress,
        _ => StatusLabel::Planned,
    };
    TaskStatusResult::of(label)
}

/// Run the status cascade against the local calendar day at call time.
pub fn compute_status_now(data: &TaskStatusData) -> TaskStatusResult {
    compute_status(data, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DateValue;
    use chrono::Duration;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_absent_is_planned() {
        let r = compute_status(&TaskStatusData::new(), ymd(2024, 6, 1));
        assert_eq!(r.status, StatusLabel::Planned);
        assert_eq!(r.color, StatusColor::Secondary);
    }

    #[test]
    fn test_overdue_not_complete_dominates() {
        let data = TaskStatusData::new()
            .planned_start("2024-01-01")
            .planned_end("2024-01-05")
            .actual_start("2024-01-02");
        let r = compute_status(&data, ymd(2024, 6, 1));
        assert_eq!(r.status.label(), "Overdue - Not Complete on Time");
        assert_eq!(r.color, StatusColor::Critical);
    }

    #[test]
    fn test_planned_end_today_is_overdue() {
        let today = ymd(2024, 6, 1);
        let data = TaskStatusData::new().planned_end(today);
        assert_eq!(compute_status(&data, today).status, StatusLabel::OverdueNotComplete);
        let data = TaskStatusData::new().planned_end(today + Duration::days(1));
        assert_eq!(compute_status(&data, today).status, StatusLabel::Planned);
    }

    #[test]
    fn test_not_started_on_time() {
        let data = TaskStatusData::new()
            .planned_start("2024-05-31")
            .planned_end("2024-06-30");
        let r = compute_status(&data, ymd(2024, 6, 1));
        assert_eq!(r.status.label(), "Overdue - Not Started On Time");
        assert_eq!(r.color, StatusColor::Destructive);
    }

    #[test]
    fn test_completion_rules() {
        let today = ymd(2024, 6, 1);
        let late = TaskStatusData::new()
            .planned_end("2024-05-01")
            .actual_start("2024-04-01")
            .actual_end("2024-05-02");
        assert_eq!(compute_status(&late, today).status, StatusLabel::CompletedLate);

        let on_time = TaskStatusData::new()
            .planned_end("2024-05-01")
            .actual_start("2024-04-01")
            .actual_end("2024-05-01");
        let r = compute_status(&on_time, today);
        assert_eq!(r.status.label(), "Completed on time");
        assert_eq!(r.color, StatusColor::Success);
    }

    #[test]
    fn test_in_progress() {
        let data = TaskStatusData::new()
            .planned_start("2024-05-01")
            .planned_end("2024-07-01")
            .actual_start("2024-05-02");
        let r = compute_status(&data, ymd(2024, 6, 1));
        assert_eq!(r.status, StatusLabel::InProgress);
        assert_eq!(r.color, StatusColor::Warning);
    }

    #[test]
    fn test_time_of_day_is_discarded() {
        let data = TaskStatusData::new().planned_end("2024-06-01T23:59:00Z");
        assert_eq!(
            compute_status(&data, ymd(2024, 6, 1)).status,
            StatusLabel::OverdueNotComplete
        );
    }

    fn day_choice() -> impl Strategy<Value = Option<i64>> {
        prop_oneof![Just(None), Just(Some(-1)), Just(Some(0)), Just(Some(1))]
    }

    proptest! {
        #[test]
        fn test_cascade_is_exhaustive_and_stable(
            ps in day_choice(),
            pe in day_choice(),
            as_ in day_choice(),
            ae in day_choice(),
        ) {
            let today = ymd(2024, 6, 1);
            let at = |o: Option<i64>| o.map(|n| DateValue::Date(today + Duration::days(n)));
            let data = TaskStatusData {
                planned_start: at(ps),
                planned_end: at(pe),
                actual_start: at(as_),
                actual_end: at(ae),
            };
            let first = compute_status(&data, today);
            let second = compute_status(&data, today);
            prop_assert_eq!(first, second);
            prop_assert!(StatusLabel::ALL.contains(&first.status));
        }

        #[test]
        fn test_overdue_planned_end_wins(ps in day_choice(), as_ in day_choice()) {
            let today = ymd(2024, 6, 1);
            let at = |o: Option<i64>| o.map(|n| DateValue::Date(today + Duration::days(n)));
            let data = TaskStatusData {
                planned_start: at(ps),
                planned_end: Some(DateValue::Date(today - Duration::days(3))),
                actual_start: at(as_),
                actual_end: None,
            };
            prop_assert_eq!(compute_status(&data, today).status, StatusLabel::OverdueNotComplete);
        }
    }
}
