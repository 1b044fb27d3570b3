//! Alert filters decide which anomalies are worth classifying.
//!
//! Filters are built once per function per run from the function's
//! [`AlertFilterSpec`] and must be pure: the same anomaly always gets the
//! same answer.

mod threshold;

pub use threshold::ThresholdAlertFilter;

use triage_core::{AlertFilterSpec, MergedAnomalyResult};

use crate::error::PluginError;
use crate::params::plugin_type;

/// Decides whether a single anomaly qualifies for downstream processing.
pub trait AlertFilter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn is_qualified(&self, anomaly: &MergedAnomalyResult) -> bool;
}

/// Builds alert filters from function specs.
pub trait AlertFilterFactory: Send + Sync {
    fn from_spec(&self, spec: &AlertFilterSpec) -> Result<Box<dyn AlertFilter>, PluginError>;
}

/// Keep only the anomalies `filter` qualifies, preserving order.
pub fn qualified(filter: &dyn AlertFilter, anomalies: Vec<MergedAnomalyResult>) -> Vec<MergedAnomalyResult> {
    anomalies
        .into_iter()
        .filter(|a| filter.is_qualified(a))
        .collect()
}

/// Qualifies every anomaly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyAlertFilter;

impl AlertFilter for DummyAlertFilter {
    fn name(&self) -> &str {
        "dummy"
    }

    fn is_qualified(&self, _anomaly: &MergedAnomalyResult) -> bool {
        true
    }
}

/// Factory for the built-in filters, selected by the spec's `type` key.
///
/// An empty spec or `type=dummy` gives [`DummyAlertFilter`];
/// `type=threshold` gives [`ThresholdAlertFilter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAlertFilterFactory;

impl AlertFilterFactory for DefaultAlertFilterFactory {
    fn from_spec(&self, spec: &AlertFilterSpec) -> Result<Box<dyn AlertFilter>, PluginError> {
        match plugin_type(spec).as_deref() {
            None | Some("dummy") => Ok(Box::new(DummyAlertFilter)),
            Some("threshold") => Ok(Box::new(ThresholdAlertFilter::from_spec(spec)?)),
            Some(other) => Err(PluginError::UnknownType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use triage_core::DimensionKey;

    use super::*;

    fn spec(pairs: &[(&str, &str)]) -> AlertFilterSpec {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_spec_builds_dummy() {
        let filter = DefaultAlertFilterFactory.from_spec(&spec(&[])).unwrap();
        assert_eq!(filter.name(), "dummy");
        let a = MergedAnomalyResult::new(1, 1, DimensionKey::new(), 0, 10);
        assert!(filter.is_qualified(&a));
    }

    #[test]
    fn threshold_type_is_selected() {
        let filter = DefaultAlertFilterFactory
            .from_spec(&spec(&[("type", "THRESHOLD"), ("min_score", "0.5")]))
            .unwrap();
        assert_eq!(filter.name(), "threshold");
    }

    #[test]
    fn unknown_type_fails() {
        let err = DefaultAlertFilterFactory
            .from_spec(&spec(&[("type", "alpha_beta")]))
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::UnknownType(ref t) if t == "alpha_beta"));
    }

    #[test]
    fn qualified_preserves_order() {
        struct EvenIds;
        impl AlertFilter for EvenIds {
            fn name(&self) -> &str { "even" }
            fn is_qualified(&self, anomaly: &MergedAnomalyResult) -> bool {
                anomaly.id % 2 == 0
            }
        }

        let anomalies = (1..=6)
            .rev()
            .map(|id| MergedAnomalyResult::new(id, 1, DimensionKey::new(), 0, 10))
            .collect();
        let kept: Vec<_> = qualified(&EvenIds, anomalies).iter().map(|a| a.id).collect();
        assert_eq!(kept, vec![6, 4, 2]);
    }
}
