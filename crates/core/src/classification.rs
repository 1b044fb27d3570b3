//! Classification configs: which functions feed a classifier and how far it has run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::anomaly::{FunctionId, Timestamp};

pub type ClassificationConfigId = u64;

/// Opaque classifier spec, interpreted by a classifier factory.
pub type ClassifierSpec = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub id: ClassificationConfigId,
    #[serde(default)]
    pub name: String,
    pub main_function_id: FunctionId,
    /// Correlated functions, consulted in this order.
    #[serde(default)]
    pub function_ids: Vec<FunctionId>,
    #[serde(default)]
    pub classifier_config: ClassifierSpec,
    /// End of the last window that completed successfully.
    #[serde(default)]
    pub end_time_watermark: Option<Timestamp>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ClassificationConfig {
    pub fn new(id: ClassificationConfigId, main_function_id: FunctionId) -> Self {
        Self {
            id,
            name: String::new(),
            main_function_id,
            function_ids: Vec::new(),
            classifier_config: ClassifierSpec::new(),
            end_time_watermark: None,
            active: true,
        }
    }

    pub fn with_correlated(mut self, function_ids: impl IntoIterator<Item = FunctionId>) -> Self {
        self.function_ids = function_ids.into_iter().collect();
        self
    }

    pub fn with_classifier(mut self, spec: ClassifierSpec) -> Self {
        self.classifier_config = spec;
        self
    }

    /// Advance the watermark to `window_end`; never moves it backwards.
    pub fn advance_watermark(&mut self, window_end: Timestamp) -> Timestamp {
        let next = match self.end_time_watermark {
            Some(current) => current.max(window_end),
            None => window_end,
        };
        self.end_time_watermark = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_is_monotonic() {
        let mut config = ClassificationConfig::new(1, 10);
        assert_eq!(config.advance_watermark(2000), 2000);
        assert_eq!(config.advance_watermark(1500), 2000);
        assert_eq!(config.advance_watermark(3000), 3000);
        assert_eq!(config.end_time_watermark, Some(3000));
    }

    #[test]
    fn deserializes_minimal_config() {
        let config: ClassificationConfig =
            serde_json::from_str(r#"{"id":4,"main_function_id":1,"function_ids":[2,3]}"#).unwrap();
        assert!(config.active);
        assert_eq!(config.function_ids, vec![2, 3]);
        assert!(config.end_time_watermark.is_none());
        assert!(config.classifier_config.is_empty());
    }
}
