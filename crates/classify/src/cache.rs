//! Run-scoped cache of function configs and their alert filters.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use triage_core::{AnomalyFunctionStore, FunctionConfig, FunctionId};

use crate::error::ClassifyError;
use crate::filter::{AlertFilter, AlertFilterFactory};
use crate::source::CorrelatedSource;

/// A function config together with the alert filter built from it.
pub struct CachedFunction {
    pub config: FunctionConfig,
    pub filter: Box<dyn AlertFilter>,
}

impl CachedFunction {
    pub fn source(&self) -> CorrelatedSource {
        CorrelatedSource::for_function(&self.config)
    }
}

/// Loads each function config and builds its filter at most once per run.
///
/// Owned by a single run and dropped with it; configs are re-read on the next
/// run. Entries are never evicted.
pub struct FunctionConfigCache {
    functions: Arc<dyn AnomalyFunctionStore>,
    filters: Arc<dyn AlertFilterFactory>,
    entries: HashMap<FunctionId, CachedFunction>,
}

impl FunctionConfigCache {
    pub fn new(functions: Arc<dyn AnomalyFunctionStore>, filters: Arc<dyn AlertFilterFactory>) -> Self {
        Self {
            functions,
            filters,
            entries: HashMap::new(),
        }
    }

    /// Return the cached entry, loading and building it on first access.
    pub fn resolve(&mut self, function_id: FunctionId) -> Result<&CachedFunction, ClassifyError> {
        match self.entries.entry(function_id) {
            Entry::Occupied(slot) => Ok(&*slot.into_mut()),
            Entry::Vacant(slot) => {
                let entry = load(self.functions.as_ref(), self.filters.as_ref(), function_id)?;
                Ok(&*slot.insert(entry))
            }
        }
    }

    /// Resolve every id in order; stops at the first failure.
    pub fn resolve_all<'a>(
        &mut self,
        function_ids: impl IntoIterator<Item = &'a FunctionId>,
    ) -> Result<(), ClassifyError> {
        for id in function_ids {
            self.resolve(*id)?;
        }
        Ok(())
    }

    /// Lookup without loading; `None` if not resolved yet.
    pub fn get(&self, function_id: FunctionId) -> Option<&CachedFunction> {
        self.entries.get(&function_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn load(
    functions: &dyn AnomalyFunctionStore,
    filters: &dyn AlertFilterFactory,
    function_id: FunctionId,
) -> Result<CachedFunction, ClassifyError> {
    let config = functions
        .find_function(function_id)
        .map_err(|source| ClassifyError::FunctionConfig { function_id, source })?;
    let filter = filters
        .from_spec(&config.alert_filter)
        .map_err(|source| ClassifyError::AlertFilter { function_id, source })?;
    debug!(
        function_id,
        name = %config.name,
        active = config.is_active,
        filter = filter.name(),
        "cached function config"
    );
    Ok(CachedFunction { config, filter })
}
