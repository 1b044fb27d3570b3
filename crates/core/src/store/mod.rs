//! Persistence seams consumed by classification.
//!
//! Each trait covers one store: detection function configs, merged
//! anomalies and classification configs. Implementations must provide
//! atomic single-record reads and updates; nothing here assumes
//! multi-record transactions.

mod memory;

pub use memory::{InMemoryStore, Snapshot};

use crate::anomaly::{FunctionId, MergedAnomalyResult, Timestamp};
use crate::classification::{ClassificationConfig, ClassificationConfigId};
use crate::error::StoreError;
use crate::function::FunctionConfig;

/// Read access to anomaly detection function configs.
pub trait AnomalyFunctionStore: Send + Sync {
    /// Fails with [`StoreError::NotFound`] when the id is unknown.
    fn find_function(&self, id: FunctionId) -> Result<FunctionConfig, StoreError>;
}

/// Read/update access to merged anomalies.
pub trait MergedAnomalyStore: Send + Sync {
    /// All anomalies of `function_id` overlapping the closed range `[start, end]`.
    fn find_overlapping(
        &self,
        function_id: FunctionId,
        start: Timestamp,
        end: Timestamp,
        exclude_child: bool,
    ) -> Result<Vec<MergedAnomalyResult>, StoreError>;

    /// Like [`find_overlapping`](Self::find_overlapping), restricted to anomalies
    /// whose canonical dimension string equals `dimensions`.
    fn find_overlapping_by_dimensions(
        &self,
        function_id: FunctionId,
        start: Timestamp,
        end: Timestamp,
        dimensions: &str,
        exclude_child: bool,
    ) -> Result<Vec<MergedAnomalyResult>, StoreError>;

    /// Replace the stored record with the same id.
    fn update(&self, anomaly: &MergedAnomalyResult) -> Result<(), StoreError>;
}

/// Read/update access to classification configs.
pub trait ClassificationConfigStore: Send + Sync {
    fn find_config(&self, id: ClassificationConfigId) -> Result<ClassificationConfig, StoreError>;

    /// Active configs, ordered by id.
    fn find_active_configs(&self) -> Result<Vec<ClassificationConfig>, StoreError>;

    fn update_config(&self, config: &ClassificationConfig) -> Result<(), StoreError>;
}
