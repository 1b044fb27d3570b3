//! Error types for classification runs and their plugins.

use std::fmt;

use thiserror::Error;
use triage_core::{AnomalyId, ClassificationConfigId, FunctionId, StoreError, Timestamp};

use crate::window::TimeWindow;

/// Failure raised by an alert filter or classifier, at construction or classify time.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown plugin type: {0}")]
    UnknownType(String),

    #[error("missing parameter: {0}")]
    MissingParam(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidParam {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Failed(String),
}

/// Step of a run that touched a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchMain,
    FetchCorrelated,
    UpdateAnomaly,
    UpdateWatermark,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::FetchMain => "fetch main anomalies",
            Stage::FetchCorrelated => "fetch correlated anomalies",
            Stage::UpdateAnomaly => "update anomaly",
            Stage::UpdateWatermark => "update watermark",
        };
        f.write_str(s)
    }
}

/// Anything that fails a classification run. Nothing is swallowed: the run
/// stops at the first error and the watermark stays where it was.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to load config for function {function_id}: {source}")]
    FunctionConfig {
        function_id: FunctionId,
        #[source]
        source: StoreError,
    },

    #[error("failed to build alert filter for function {function_id}: {source}")]
    AlertFilter {
        function_id: FunctionId,
        #[source]
        source: PluginError,
    },

    #[error("failed to build classifier for classification config {config_id}: {source}")]
    Classifier {
        config_id: ClassificationConfigId,
        #[source]
        source: PluginError,
    },

    #[error("store failure during {stage} (function {function_id}, window {window}{}): {source}", fmt_dimensions(.dimensions))]
    Store {
        stage: Stage,
        function_id: FunctionId,
        window: TimeWindow,
        dimensions: Option<String>,
        #[source]
        source: StoreError,
    },

    #[error("classifier failed for classification config {config_id}, dimensions {dimensions}: {source}")]
    Classification {
        config_id: ClassificationConfigId,
        dimensions: String,
        #[source]
        source: PluginError,
    },

    #[error("classifier for classification config {config_id} returned anomaly {anomaly_id}: {reason}")]
    ClassifierContract {
        config_id: ClassificationConfigId,
        anomaly_id: AnomalyId,
        reason: String,
    },

    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow { start: Timestamp, end: Timestamp },
}

fn fmt_dimensions(dimensions: &Option<String>) -> String {
    match dimensions {
        Some(d) => format!(", dimensions {d}"),
        None => String::new(),
    }
}

impl ClassifyError {
    /// Function unknown to the store, or a plugin that could not be built.
    pub fn is_config_load(&self) -> bool {
        matches!(
            self,
            ClassifyError::FunctionConfig { .. }
                | ClassifyError::AlertFilter { .. }
                | ClassifyError::Classifier { .. }
        )
    }

    pub fn is_store(&self) -> bool {
        matches!(self, ClassifyError::Store { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_message_names_stage_and_context() {
        let err = ClassifyError::Store {
            stage: Stage::FetchCorrelated,
            function_id: 2,
            window: TimeWindow::new(20, 40),
            dimensions: Some(r#"{"country":"US"}"#.to_string()),
            source: StoreError::Unavailable("connection refused".to_string()),
        };
        assert_eq!(
            err.to_string(),
            r#"store failure during fetch correlated anomalies (function 2, window [20, 40], dimensions {"country":"US"}): store unavailable: connection refused"#
        );
        assert!(err.is_store());
        assert!(!err.is_config_load());
    }

    #[test]
    fn unknown_function_is_config_load() {
        let err = ClassifyError::FunctionConfig {
            function_id: 7,
            source: StoreError::NotFound { entity: "anomaly function", id: 7 },
        };
        assert!(err.is_config_load());
        assert_eq!(
            err.to_string(),
            "failed to load config for function 7: anomaly function not found: 7"
        );
    }
}
