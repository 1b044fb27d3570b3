//! Where a correlated function's anomalies come from.

use std::fmt;

use triage_core::FunctionConfig;

/// How correlated anomalies are obtained for one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatedSource {
    /// Active function: read its merged anomalies from the store.
    Stored,
    /// Inactive function: would need on-demand detection over the
    /// correlated window. Not wired up yet, so it contributes nothing.
    Adhoc,
}

impl CorrelatedSource {
    pub fn for_function(function: &FunctionConfig) -> Self {
        if function.is_active {
            CorrelatedSource::Stored
        } else {
            CorrelatedSource::Adhoc
        }
    }
}

impl fmt::Display for CorrelatedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelatedSource::Stored => f.write_str("stored"),
            CorrelatedSource::Adhoc => f.write_str("adhoc"),
        }
    }
}
