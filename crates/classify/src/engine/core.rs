use std::sync::Arc;

use serde::Serialize;
use triage_core::config::RunnerConfig;
use triage_core::{
    AnomalyFunctionStore, ClassificationConfigId, ClassificationConfigStore, MergedAnomalyStore,
    Timestamp,
};
use uuid::Uuid;

use crate::classifier::{AnomalyClassifierFactory, DefaultAnomalyClassifierFactory};
use crate::filter::{AlertFilterFactory, DefaultAlertFilterFactory};
use crate::window::TimeWindow;

/// Knobs that change how a run talks to the store and schedules work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Passed as the exclude-child flag on every anomaly query.
    pub exclude_child_anomalies: bool,
    /// Classify dimension groups on the rayon pool.
    pub parallel_groups: bool,
}

impl From<&RunnerConfig> for EngineOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            exclude_child_anomalies: config.exclude_child_anomalies,
            parallel_groups: config.parallel_groups,
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub config_id: ClassificationConfigId,
    pub window: TimeWindow,
    /// Qualified main anomalies in the window.
    pub main_anomalies: usize,
    /// Dimension groups classified.
    pub groups: usize,
    pub classifier_invocations: usize,
    /// Anomaly records written back.
    pub updated: usize,
    /// Watermark after the run.
    pub watermark: Timestamp,
}

/// Classifies main-function anomalies window by window.
///
/// Holds only shared handles to stores and plugin factories. All per-run
/// state (function cache, accumulated updates) is created inside
/// [`run`](ClassificationEngine::run), so one engine can serve concurrent
/// runs for different configs.
pub struct ClassificationEngine {
    pub(super) functions: Arc<dyn AnomalyFunctionStore>,
    pub(super) anomalies: Arc<dyn MergedAnomalyStore>,
    pub(super) configs: Arc<dyn ClassificationConfigStore>,
    pub(super) filters: Arc<dyn AlertFilterFactory>,
    pub(super) classifiers: Arc<dyn AnomalyClassifierFactory>,
    pub(super) options: EngineOptions,
}

impl ClassificationEngine {
    pub fn new(
        functions: Arc<dyn AnomalyFunctionStore>,
        anomalies: Arc<dyn MergedAnomalyStore>,
        configs: Arc<dyn ClassificationConfigStore>,
        filters: Arc<dyn AlertFilterFactory>,
        classifiers: Arc<dyn AnomalyClassifierFactory>,
    ) -> Self {
        Self {
            functions,
            anomalies,
            configs,
            filters,
            classifiers,
            options: EngineOptions::default(),
        }
    }

    /// Engine over a single store backing all three persistence traits,
    /// with the built-in plugin factories.
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: AnomalyFunctionStore + MergedAnomalyStore + ClassificationConfigStore + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(DefaultAlertFilterFactory),
            Arc::new(DefaultAnomalyClassifierFactory),
        )
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_alert_filters(mut self, filters: Arc<dyn AlertFilterFactory>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_classifiers(mut self, classifiers: Arc<dyn AnomalyClassifierFactory>) -> Self {
        self.classifiers = classifiers;
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }
}
