use triage_core::{AlertFilterSpec, MergedAnomalyResult};

use super::AlertFilter;
use crate::error::PluginError;
use crate::params::optional;

/// Qualifies anomalies meeting every configured lower bound.
///
/// Spec keys (all optional): `min_score`, `min_weight` (compared against the
/// absolute weight), `min_duration_ms`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdAlertFilter {
    pub min_score: Option<f64>,
    pub min_weight: Option<f64>,
    pub min_duration_ms: Option<i64>,
}

impl ThresholdAlertFilter {
    pub fn from_spec(spec: &AlertFilterSpec) -> Result<Self, PluginError> {
        let filter = Self {
            min_score: optional(spec, "min_score")?,
            min_weight: optional(spec, "min_weight")?,
            min_duration_ms: optional(spec, "min_duration_ms")?,
        };
        for (key, value) in [("min_score", filter.min_score), ("min_weight", filter.min_weight)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(PluginError::InvalidParam {
                    key: key.to_string(),
                    value: spec.get(key).cloned().unwrap_or_default(),
                    reason: "must be finite".to_string(),
                });
            }
        }
        Ok(filter)
    }
}

impl AlertFilter for ThresholdAlertFilter {
    fn name(&self) -> &str {
        "threshold"
    }

    fn is_qualified(&self, anomaly: &MergedAnomalyResult) -> bool {
        if let Some(min) = self.min_score {
            if anomaly.score < min {
                return false;
            }
        }
        if let Some(min) = self.min_weight {
            if anomaly.weight.abs() < min {
                return false;
            }
        }
        if let Some(min) = self.min_duration_ms {
            if anomaly.duration_millis() < min {
                return false;
            }
        }
        true
    }
}
