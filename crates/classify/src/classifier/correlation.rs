use std::collections::HashMap;

use triage_core::{ClassificationConfig, ClassifierSpec, FunctionId, MergedAnomalyResult};

use super::{AnomaliesByFunction, AnomalyClassifier};
use crate::error::PluginError;
use crate::params::optional;

const DEFAULT_CORRELATED_ISSUE_TYPE: &str = "CORRELATED";
const LABEL_PREFIX: &str = "label.";

/// Labels a main anomaly by the first correlated function that has an
/// overlapping anomaly in the same dimension group.
///
/// Spec keys:
/// - `correlated_issue_type`: label when a correlated anomaly overlaps (default `CORRELATED`)
/// - `label.<function_id>`: per-function override of that label
/// - `isolated_issue_type`: label when nothing overlaps; unset means such
///   anomalies are left alone
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationClassifier {
    pub correlated_issue_type: String,
    pub isolated_issue_type: Option<String>,
    pub labels: HashMap<FunctionId, String>,
}

impl Default for CorrelationClassifier {
    fn default() -> Self {
        Self {
            correlated_issue_type: DEFAULT_CORRELATED_ISSUE_TYPE.to_string(),
            isolated_issue_type: None,
            labels: HashMap::new(),
        }
    }
}

impl CorrelationClassifier {
    pub fn from_spec(spec: &ClassifierSpec) -> Result<Self, PluginError> {
        let mut labels = HashMap::new();
        for (key, value) in spec {
            let Some(raw_id) = key.strip_prefix(LABEL_PREFIX) else {
                continue;
            };
            let function_id = raw_id
                .parse::<FunctionId>()
                .map_err(|e| PluginError::InvalidParam {
                    key: key.clone(),
                    value: value.clone(),
                    reason: format!("bad function id: {e}"),
                })?;
            labels.insert(function_id, value.clone());
        }

        Ok(Self {
            correlated_issue_type: optional::<String>(spec, "correlated_issue_type")?
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CORRELATED_ISSUE_TYPE.to_string()),
            isolated_issue_type: optional::<String>(spec, "isolated_issue_type")?
                .filter(|s| !s.is_empty()),
            labels,
        })
    }

    fn label_for(&self, main: &MergedAnomalyResult, by_function: &AnomaliesByFunction, config: &ClassificationConfig) -> Option<String> {
        config
            .function_ids
            .iter()
            .filter(|id| **id != config.main_function_id)
            .find(|id| {
                by_function
                    .get(*id)
                    .is_some_and(|list| list.iter().any(|c| c.overlaps_anomaly(main)))
            })
            .map(|id| {
                self.labels
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| self.correlated_issue_type.clone())
            })
            .or_else(|| self.isolated_issue_type.clone())
    }
}

impl AnomalyClassifier for CorrelationClassifier {
    fn name(&self) -> &str {
        "correlation"
    }

    fn classify(
        &self,
        by_function: &AnomaliesByFunction,
        config: &ClassificationConfig,
    ) -> Result<Vec<MergedAnomalyResult>, PluginError> {
        let Some(main) = by_function.get(&config.main_function_id) else {
            return Ok(Vec::new());
        };

        Ok(main
            .iter()
            .filter_map(|anomaly| {
                self.label_for(anomaly, by_function, config).map(|label| {
                    let mut updated = anomaly.clone();
                    updated.issue_type = Some(label);
                    updated
                })
            })
            .collect())
    }
}
