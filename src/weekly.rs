//! Weekly customer health aggregation.
//!
//! Raw rows come from the record store: per-customer metric values and health
//! reviews, each tagged with the reporting week (`date_from`..`date_to`) they
//! belong to. This module turns them into week pickers, summary counts and
//! per-metric trends for the BAU dashboards.
//!
//! Week boundaries are calendar days in Europe/London. A boundary stored as a
//! timestamp is converted to London time before its day is taken.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Europe::London;
use serde::{Deserialize, Serialize};

use crate::fields::Health;
use crate::task::DateValue;

/// Number of weeks a metric trend covers by default.
pub const TREND_WINDOW: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
}

/// One metric value for one customer and week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub customer_id: String,
    pub metric_key: String,
    #[serde(default)]
    pub value: Option<f64>,
    pub date_from: DateValue,
    pub date_to: DateValue,
}

/// A customer's health review for one week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReview {
    pub customer_id: String,
    pub health: Health,
    pub date_from: DateValue,
    pub date_to: DateValue,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A reporting week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekWindow {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl WeekWindow {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        WeekWindow { date_from, date_to }
    }

    fn of(date_from: &DateValue, date_to: &DateValue) -> Option<Self> {
        Some(WeekWindow { date_from: london_day(date_from)?, date_to: london_day(date_to)? })
    }

    /// `Week DD/MM/YYYY - DD/MM/YYYY`
    pub fn label(&self) -> String {
        format!("Week {} - {}", format_uk_date(self.date_from), format_uk_date(self.date_to))
    }
}

impl MetricRow {
    pub fn window(&self) -> Option<WeekWindow> {
        WeekWindow::of(&self.date_from, &self.date_to)
    }
}

impl HealthReview {
    pub fn window(&self) -> Option<WeekWindow> {
        WeekWindow::of(&self.date_from, &self.date_to)
    }
}

/// The London calendar day of a week boundary. Plain dates and timestamps
/// without an offset are taken as already local.
fn london_day(value: &DateValue) -> Option<NaiveDate> {
    if let DateValue::Text(s) = value {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
            return Some(dt.with_timezone(&London).date_naive());
        }
    }
    value.to_date()
}

/// Render a date as `DD/MM/YYYY`.
pub fn format_uk_date(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

/// An entry of the week picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekOption {
    pub window: WeekWindow,
    pub label: String,
}

/// Distinct weeks present in the metrics, most recent `date_to` first.
pub fn week_options(metrics: &[MetricRow]) -> Vec<WeekOption> {
    let windows: BTreeSet<WeekWindow> = metrics.iter().filter_map(MetricRow::window).collect();
    let mut windows: Vec<WeekWindow> = windows.into_iter().collect();
    windows.sort_by(|a, b| b.date_to.cmp(&a.date_to).then(b.date_from.cmp(&a.date_from)));
    windows
        .into_iter()
        .map(|window| WeekOption { label: window.label(), window })
        .collect()
}

/// Health counts for one week.
///
/// `unreviewed` is `total_count - reviewed_count` and is not clamped: it goes
/// negative when the roster is smaller than the set of reviews for the week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyHealthSummary {
    pub total_count: usize,
    pub green_count: usize,
    pub red_count: usize,
    pub reviewed_count: usize,
    pub unreviewed: i64,
}

pub fn weekly_health_summary(
    window: WeekWindow,
    reviews: &[HealthReview],
    roster: &[Customer],
) -> WeeklyHealthSummary {
    let (mut green_count, mut red_count) = (0usize, 0usize);
    for review in reviews.iter().filter(|r| r.window() == Some(window)) {
        match review.health {
            Health::Green => green_count += 1,
            Health::Red => red_count += 1,
        }
    }
    let total_count = roster.len();
    let reviewed_count = green_count + red_count;
    WeeklyHealthSummary {
        total_count,
        green_count,
        red_count,
        reviewed_count,
        unreviewed: total_count as i64 - reviewed_count as i64,
    }
}

/// Roster customers with no review for the week, in roster order.
pub fn unreviewed_customers<'a>(
    window: WeekWindow,
    reviews: &[HealthReview],
    roster: &'a [Customer],
) -> Vec<&'a Customer> {
    let reviewed: BTreeSet<&str> = reviews
        .iter()
        .filter(|r| r.window() == Some(window))
        .map(|r| r.customer_id.as_str())
        .collect();
    roster.iter().filter(|c| !reviewed.contains(c.id.as_str())).collect()
}

/// One point of a metric trend chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date_to: NaiveDate,
    pub value: Option<f64>,
}

/// The last [`TREND_WINDOW`] weeks of a customer's metric, oldest first.
pub fn metric_trend(metrics: &[MetricRow], customer_id: &str, metric_key: &str) -> Vec<TrendPoint> {
    metric_trend_with_limit(metrics, customer_id, metric_key, TREND_WINDOW)
}

pub fn metric_trend_with_limit(
    metrics: &[MetricRow],
    customer_id: &str,
    metric_key: &str,
    limit: usize,
) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = metrics
        .iter()
        .filter(|m| m.customer_id == customer_id && m.metric_key == metric_key)
        .filter_map(|m| {
            london_day(&m.date_to).map(|date_to| TrendPoint { date_to, value: m.value })
        })
        .collect();
    points.sort_by(|a, b| b.date_to.cmp(&a.date_to));
    points.truncate(limit);
    points.reverse();
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn metric(customer: &str, key: &str, value: f64, from: NaiveDate) -> MetricRow {
        MetricRow {
            customer_id: customer.to_string(),
            metric_key: key.to_string(),
            value: Some(value),
            date_from: from.into(),
            date_to: (from + Duration::days(6)).into(),
        }
    }

    fn review(customer: &str, health: Health, window: WeekWindow) -> HealthReview {
        HealthReview {
            customer_id: customer.to_string(),
            health,
            date_from: window.date_from.into(),
            date_to: window.date_to.into(),
            notes: None,
        }
    }

    fn roster(ids: &[&str]) -> Vec<Customer> {
        ids.iter()
            .map(|id| Customer { id: id.to_string(), name: id.to_uppercase() })
            .collect()
    }

    #[test]
    fn test_week_options_dedup_and_order() {
        let w1 = ymd(2024, 1, 1);
        let w2 = ymd(2024, 1, 8);
        let metrics = vec![
            metric("acme", "logins", 1.0, w1),
            metric("acme", "logins", 2.0, w2),
            metric("globex", "logins", 3.0, w1),
            MetricRow {
                customer_id: "acme".into(),
                metric_key: "alerts".into(),
                value: None,
                date_from: "2024-01-08".into(),
                date_to: "2024-01-14".into(),
            },
        ];
        let options = week_options(&metrics);
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Week 08/01/2024 - 14/01/2024", "Week 01/01/2024 - 07/01/2024"]);
    }

    #[test]
    fn test_timestamp_boundaries_use_london_day() {
        let summer = MetricRow {
            customer_id: "acme".into(),
            metric_key: "logins".into(),
            value: Some(1.0),
            date_from: "2024-06-23T23:30:00Z".into(),
            date_to: "2024-06-30T23:30:00Z".into(),
        };
        let winter = MetricRow {
            date_from: "2024-01-01T00:30:00Z".into(),
            date_to: "2024-01-07T23:30:00Z".into(),
            ..summer.clone()
        };
        let labels: Vec<String> =
            week_options(&[summer.clone(), winter]).into_iter().map(|o| o.label).collect();
        assert_eq!(
            labels,
            vec!["Week 24/06/2024 - 01/07/2024", "Week 01/01/2024 - 07/01/2024"]
        );

        let trend = metric_trend(&[summer], "acme", "logins");
        assert_eq!(trend[0].date_to, ymd(2024, 7, 1));
    }

    #[test]
    fn test_week_options_empty() {
        assert!(week_options(&[]).is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let window = WeekWindow::new(ymd(2024, 1, 1), ymd(2024, 1, 7));
        let other = WeekWindow::new(ymd(2024, 1, 8), ymd(2024, 1, 14));
        let reviews = vec![
            review("acme", Health::Green, window),
            review("globex", Health::Red, window),
            review("initech", Health::Green, window),
            review("acme", Health::Red, other),
        ];
        let customers = roster(&["acme", "globex", "initech", "umbrella", "hooli"]);
        let summary = weekly_health_summary(window, &reviews, &customers);
        assert_eq!(
            summary,
            WeeklyHealthSummary {
                total_count: 5,
                green_count: 2,
                red_count: 1,
                reviewed_count: 3,
                unreviewed: 2,
            }
        );
        assert_eq!(summary.reviewed_count as i64 + summary.unreviewed, summary.total_count as i64);

        let missing: Vec<&str> = unreviewed_customers(window, &reviews, &customers)
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(missing, vec!["umbrella", "hooli"]);
    }

    #[test]
    fn test_summary_for_empty_week_is_zero() {
        let window = WeekWindow::new(ymd(2024, 2, 5), ymd(2024, 2, 11));
        let summary = weekly_health_summary(window, &[], &[]);
        assert_eq!(summary, WeeklyHealthSummary::default());
    }

    #[test]
    fn test_unreviewed_is_not_clamped() {
        let window = WeekWindow::new(ymd(2024, 1, 1), ymd(2024, 1, 7));
        let reviews = vec![
            review("acme", Health::Green, window),
            review("globex", Health::Green, window),
        ];
        let summary = weekly_health_summary(window, &reviews, &roster(&["acme"]));
        assert_eq!(summary.unreviewed, -1);
    }

    #[test]
    fn test_trend_is_last_eight_ascending() {
        let start = ymd(2024, 1, 1);
        let mut metrics: Vec<MetricRow> = (0..10i64)
            .map(|i| metric("acme", "logins", i as f64, start + Duration::weeks(i)))
            .collect();
        metrics.reverse();
        metrics.push(metric("acme", "alerts", 99.0, start));
        metrics.push(metric("globex", "logins", 99.0, start));

        let trend = metric_trend(&metrics, "acme", "logins");
        assert_eq!(trend.len(), TREND_WINDOW);
        let values: Vec<f64> = trend.iter().filter_map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert!(trend.windows(2).all(|w| w[0].date_to < w[1].date_to));
    }

    #[test]
    fn test_trend_shorter_than_window() {
        let metrics = vec![
            metric("acme", "logins", 2.0, ymd(2024, 1, 8)),
            metric("acme", "logins", 1.0, ymd(2024, 1, 1)),
        ];
        let trend = metric_trend_with_limit(&metrics, "acme", "logins", 8);
        assert_eq!(trend.iter().map(|p| p.value).collect::<Vec<_>>(), vec![Some(1.0), Some(2.0)]);
    }
}
