//! Window arithmetic and dimensional grouping.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use triage_core::{DimensionKey, MergedAnomalyResult, Timestamp, format_timestamp};

/// A time range in epoch millis. `start > end` is a valid, empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// True when the window cannot contain any instant.
    pub fn is_degenerate(&self) -> bool {
        self.start > self.end
    }

    pub fn describe(&self) -> String {
        format!("{} .. {}", format_timestamp(self.start), format_timestamp(self.end))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Window used to fetch correlated anomalies for one dimension group.
///
/// Start is the latest of the run start and every member's start; end is the
/// earliest of the run end and every member's end. Members whose spans do not
/// all intersect give a degenerate window.
pub fn correlated_window(run: TimeWindow, group: &[MergedAnomalyResult]) -> TimeWindow {
    group.iter().fold(run, |window, anomaly| TimeWindow {
        start: window.start.max(anomaly.start_time),
        end: window.end.min(anomaly.end_time),
    })
}

/// Bucket anomalies by dimension key.
///
/// Buckets keep first-seen order and each bucket keeps the input order of its
/// members.
pub fn group_by_dimensions(
    anomalies: Vec<MergedAnomalyResult>,
) -> IndexMap<DimensionKey, Vec<MergedAnomalyResult>> {
    let mut groups: IndexMap<DimensionKey, Vec<MergedAnomalyResult>> = IndexMap::new();
    for anomaly in anomalies {
        groups
            .entry(anomaly.dimensions.clone())
            .or_default()
            .push(anomaly);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anomaly(id: u64, dims: DimensionKey, start: Timestamp, end: Timestamp) -> MergedAnomalyResult {
        MergedAnomalyResult::new(id, 1, dims, start, end)
    }

    fn country(c: &str) -> DimensionKey {
        DimensionKey::new().with("country", c)
    }

    #[test]
    fn correlated_window_narrows_to_group() {
        let group = vec![
            anomaly(1, country("US"), 10, 50),
            anomaly(2, country("US"), 20, 40),
        ];
        let window = correlated_window(TimeWindow::new(0, 100), &group);
        assert_eq!(window, TimeWindow::new(20, 40));
        assert!(!window.is_degenerate());
    }

    #[test]
    fn correlated_window_is_bounded_by_run() {
        let group = vec![anomaly(1, country("US"), -500, 5_000)];
        let window = correlated_window(TimeWindow::new(0, 100), &group);
        assert_eq!(window, TimeWindow::new(0, 100));
    }

    #[test]
    fn disjoint_members_give_degenerate_window() {
        let group = vec![
            anomaly(1, country("US"), 10, 20),
            anomaly(2, country("US"), 60, 80),
        ];
        let window = correlated_window(TimeWindow::new(0, 100), &group);
        assert_eq!(window, TimeWindow::new(60, 20));
        assert!(window.is_degenerate());
    }

    #[test]
    fn grouping_keeps_first_seen_and_member_order() {
        let anomalies = vec![
            anomaly(1, country("US"), 0, 10),
            anomaly(2, country("CA"), 0, 20),
            anomaly(3, country("US"), 0, 30),
            anomaly(4, DimensionKey::new(), 0, 40),
        ];
        let groups = group_by_dimensions(anomalies);

        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![country("US"), country("CA"), DimensionKey::new()]);

        let us: Vec<_> = groups[&country("US")].iter().map(|a| a.id).collect();
        assert_eq!(us, vec![1, 3]);

        let total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn display_formats() {
        let window = TimeWindow::new(0, 1000);
        assert_eq!(window.to_string(), "[0, 1000]");
        assert_eq!(
            window.describe(),
            "1970-01-01T00:00:00+00:00 .. 1970-01-01T00:00:01+00:00"
        );
    }
}
