//! Windowed anomaly classification.
//!
//! A run takes a time window and a [`ClassificationConfig`]: it collects the
//! qualified anomalies of the main detection function, groups them by
//! [`DimensionKey`], gathers correlated anomalies per group and lets a
//! pluggable [`AnomalyClassifier`] assign each main anomaly its issue type.
//!
//! [`ClassificationConfig`]: triage_core::ClassificationConfig
//! [`DimensionKey`]: triage_core::DimensionKey

pub mod cache;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod filter;
mod params;
pub mod source;
pub mod task;
pub mod window;

pub use cache::{CachedFunction, FunctionConfigCache};
pub use classifier::{
    AnomalyClassifier, AnomalyClassifierFactory, AnomaliesByFunction, CorrelationClassifier,
    DefaultAnomalyClassifierFactory, DummyClassifier,
};
pub use engine::{ClassificationEngine, EngineOptions, RunSummary};
pub use error::{ClassifyError, PluginError, Stage};
pub use filter::{
    AlertFilter, AlertFilterFactory, DefaultAlertFilterFactory, DummyAlertFilter,
    ThresholdAlertFilter,
};
pub use source::CorrelatedSource;
pub use task::{ClassificationTaskInfo, ClassificationTaskRunner, TaskOutcome, plan_window};
pub use window::TimeWindow;
