//! In-memory store backed by an optional JSON snapshot file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AnomalyFunctionStore, ClassificationConfigStore, MergedAnomalyStore};
use crate::anomaly::{AnomalyId, FunctionId, MergedAnomalyResult, Timestamp};
use crate::classification::{ClassificationConfig, ClassificationConfigId};
use crate::error::StoreError;
use crate::function::FunctionConfig;

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub functions: Vec<FunctionConfig>,
    #[serde(default)]
    pub anomalies: Vec<MergedAnomalyResult>,
    #[serde(default)]
    pub classification_configs: Vec<ClassificationConfig>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            functions = snapshot.functions.len(),
            anomalies = snapshot.anomalies.len(),
            configs = snapshot.classification_configs.len(),
            "loaded store snapshot"
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        debug!(path = %path.display(), "saved store snapshot");
        Ok(())
    }
}

/// Store implementing every persistence trait over `RwLock`ed maps.
///
/// Maps are ordered by id so query results come back in a stable order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    functions: RwLock<BTreeMap<FunctionId, FunctionConfig>>,
    anomalies: RwLock<BTreeMap<AnomalyId, MergedAnomalyResult>>,
    configs: RwLock<BTreeMap<ClassificationConfigId, ClassificationConfig>>,
}

fn read<'a, T>(lock: &'a RwLock<T>, name: &str) -> Result<RwLockReadGuard<'a, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::LockPoisoned(name.to_string()))
}

fn write<'a, T>(lock: &'a RwLock<T>, name: &str) -> Result<RwLockWriteGuard<'a, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::LockPoisoned(name.to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        if let Ok(mut functions) = store.functions.write() {
            functions.extend(snapshot.functions.into_iter().map(|f| (f.id, f)));
        }
        if let Ok(mut anomalies) = store.anomalies.write() {
            anomalies.extend(snapshot.anomalies.into_iter().map(|a| (a.id, a)));
        }
        if let Ok(mut configs) = store.configs.write() {
            configs.extend(snapshot.classification_configs.into_iter().map(|c| (c.id, c)));
        }
        store
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::from_snapshot(Snapshot::load(path)?))
    }

    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            functions: read(&self.functions, "functions")?.values().cloned().collect(),
            anomalies: read(&self.anomalies, "anomalies")?.values().cloned().collect(),
            classification_configs: read(&self.configs, "configs")?.values().cloned().collect(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.snapshot()?.save(path)
    }

    pub fn insert_function(&self, function: FunctionConfig) -> Result<(), StoreError> {
        write(&self.functions, "functions")?.insert(function.id, function);
        Ok(())
    }

    pub fn insert_anomaly(&self, anomaly: MergedAnomalyResult) -> Result<(), StoreError> {
        write(&self.anomalies, "anomalies")?.insert(anomaly.id, anomaly);
        Ok(())
    }

    pub fn insert_config(&self, config: ClassificationConfig) -> Result<(), StoreError> {
        write(&self.configs, "configs")?.insert(config.id, config);
        Ok(())
    }

    pub fn anomaly(&self, id: AnomalyId) -> Result<MergedAnomalyResult, StoreError> {
        read(&self.anomalies, "anomalies")?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "anomaly", id })
    }

    fn query<F>(
        &self,
        function_id: FunctionId,
        start: Timestamp,
        end: Timestamp,
        exclude_child: bool,
        extra: F,
    ) -> Result<Vec<MergedAnomalyResult>, StoreError>
    where
        F: Fn(&MergedAnomalyResult) -> bool,
    {
        let anomalies = read(&self.anomalies, "anomalies")?;
        Ok(anomalies
            .values()
            .filter(|a| a.function_id == function_id)
            .filter(|a| !(exclude_child && a.child))
            .filter(|a| a.overlaps(start, end))
            .filter(|&a| extra(a))
            .cloned()
            .collect())
    }
}

impl AnomalyFunctionStore for InMemoryStore {
    fn find_function(&self, id: FunctionId) -> Result<FunctionConfig, StoreError> {
        read(&self.functions, "functions")?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "anomaly function", id })
    }
}

impl MergedAnomalyStore for InMemoryStore {
    fn find_overlapping(
        &self,
        function_id: FunctionId,
        start: Timestamp,
        end: Timestamp,
        exclude_child: bool,
    ) -> Result<Vec<MergedAnomalyResult>, StoreError> {
        self.query(function_id, start, end, exclude_child, |_| true)
    }

    fn find_overlapping_by_dimensions(
        &self,
        function_id: FunctionId,
        start: Timestamp,
        end: Timestamp,
        dimensions: &str,
        exclude_child: bool,
    ) -> Result<Vec<MergedAnomalyResult>, StoreError> {
        self.query(function_id, start, end, exclude_child, |a| {
            a.dimensions.canonical() == dimensions
        })
    }

    fn update(&self, anomaly: &MergedAnomalyResult) -> Result<(), StoreError> {
        let mut anomalies = write(&self.anomalies, "anomalies")?;
        match anomalies.get_mut(&anomaly.id) {
            Some(stored) => {
                *stored = anomaly.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound { entity: "anomaly", id: anomaly.id }),
        }
    }
}

impl ClassificationConfigStore for InMemoryStore {
    fn find_config(&self, id: ClassificationConfigId) -> Result<ClassificationConfig, StoreError> {
        read(&self.configs, "configs")?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "classification config", id })
    }

    fn find_active_configs(&self) -> Result<Vec<ClassificationConfig>, StoreError> {
        Ok(read(&self.configs, "configs")?
            .values()
            .filter(|c| c.active)
            .cloned()
            .collect())
    }

    fn update_config(&self, config: &ClassificationConfig) -> Result<(), StoreError> {
        write(&self.configs, "configs")?.insert(config.id, config.clone());
        Ok(())
    }
}
