//! Merged anomaly records produced by detection functions.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::dimension::DimensionKey;

/// Epoch milliseconds.
pub type Timestamp = i64;

/// Store-assigned identity of a merged anomaly.
pub type AnomalyId = u64;

/// Identity of an anomaly detection function.
pub type FunctionId = u64;

/// Render an epoch-millis timestamp for logs; falls back to the raw number.
pub fn format_timestamp(ts: Timestamp) -> String {
    match Utc.timestamp_millis_opt(ts).single() {
        Some(dt) => dt.to_rfc3339(),
        None => ts.to_string(),
    }
}

pub fn timestamp_from(dt: DateTime<Utc>) -> Timestamp {
    dt.timestamp_millis()
}

/// An anomaly as stored after merging raw detection results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedAnomalyResult {
    pub id: AnomalyId,
    pub function_id: FunctionId,
    #[serde(default)]
    pub dimensions: DimensionKey,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub weight: f64,
    /// The field the classification pipeline assigns.
    #[serde(default)]
    pub issue_type: Option<String>,
    /// Whether this record was merged into a parent anomaly.
    #[serde(default)]
    pub child: bool,
    /// Detection metadata opaque to classification.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl MergedAnomalyResult {
    pub fn new(
        id: AnomalyId,
        function_id: FunctionId,
        dimensions: DimensionKey,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            id,
            function_id,
            dimensions,
            start_time,
            end_time,
            score: 0.0,
            weight: 0.0,
            issue_type: None,
            child: false,
            properties: BTreeMap::new(),
        }
    }

    pub fn duration_millis(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Closed-interval overlap with `[start, end]`. Always false when `start > end`.
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        start <= end && self.start_time <= end && self.end_time >= start
    }

    /// Closed-interval overlap with another anomaly.
    pub fn overlaps_anomaly(&self, other: &MergedAnomalyResult) -> bool {
        self.start_time <= other.end_time && self.end_time >= other.start_time
    }
}

/// Total order by end time, ties broken by id.
///
/// Compares the timestamps directly, so arbitrarily far-apart end times
/// never overflow.
pub fn cmp_by_end_time(lhs: &MergedAnomalyResult, rhs: &MergedAnomalyResult) -> Ordering {
    lhs.end_time
        .cmp(&rhs.end_time)
        .then_with(|| lhs.id.cmp(&rhs.id))
}

/// Stable sort by [`cmp_by_end_time`].
pub fn sort_by_end_time(anomalies: &mut [MergedAnomalyResult]) {
    anomalies.sort_by(cmp_by_end_time);
}
