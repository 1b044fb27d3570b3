//! Classifiers assign issue types to main-function anomalies.
//!
//! A classifier sees one dimension group at a time: the group's main
//! anomalies plus whatever correlated functions contributed, keyed by
//! function id. It returns the main anomalies whose issue type it decided;
//! anything it leaves out keeps its current issue type.

mod correlation;

pub use correlation::CorrelationClassifier;

use indexmap::IndexMap;
use triage_core::{ClassificationConfig, ClassifierSpec, FunctionId, MergedAnomalyResult};

use crate::error::PluginError;
use crate::params::plugin_type;

/// Anomalies of one dimension group keyed by source function.
///
/// The main function comes first, correlated functions follow in configured
/// order; functions that contributed nothing are absent.
pub type AnomaliesByFunction = IndexMap<FunctionId, Vec<MergedAnomalyResult>>;

pub trait AnomalyClassifier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Return main-function anomalies with their new issue type.
    ///
    /// Every returned record must come from `by_function[config.main_function_id]`;
    /// only `issue_type` changes are honored.
    fn classify(
        &self,
        by_function: &AnomaliesByFunction,
        config: &ClassificationConfig,
    ) -> Result<Vec<MergedAnomalyResult>, PluginError>;
}

pub trait AnomalyClassifierFactory: Send + Sync {
    fn from_spec(&self, spec: &ClassifierSpec) -> Result<Box<dyn AnomalyClassifier>, PluginError>;
}

/// Leaves every issue type untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyClassifier;

impl AnomalyClassifier for DummyClassifier {
    fn name(&self) -> &str {
        "dummy"
    }

    fn classify(
        &self,
        _by_function: &AnomaliesByFunction,
        _config: &ClassificationConfig,
    ) -> Result<Vec<MergedAnomalyResult>, PluginError> {
        Ok(Vec::new())
    }
}

/// Factory for the built-in classifiers, selected by the spec's `type` key.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAnomalyClassifierFactory;

impl AnomalyClassifierFactory for DefaultAnomalyClassifierFactory {
    fn from_spec(&self, spec: &ClassifierSpec) -> Result<Box<dyn AnomalyClassifier>, PluginError> {
        match plugin_type(spec).as_deref() {
            None | Some("dummy") => Ok(Box::new(DummyClassifier)),
            Some("correlation") => Ok(Box::new(CorrelationClassifier::from_spec(spec)?)),
            Some(other) => Err(PluginError::UnknownType(other.to_string())),
        }
    }
}
