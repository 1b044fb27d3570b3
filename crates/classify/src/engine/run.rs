use std::collections::{HashMap, HashSet};
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};
use triage_core::{
    AnomalyId, ClassificationConfig, DimensionKey, FunctionId, MergedAnomalyResult,
    Timestamp, sort_by_end_time,
};
use uuid::Uuid;

use super::core::{ClassificationEngine, RunSummary};
use crate::cache::FunctionConfigCache;
use crate::classifier::{AnomaliesByFunction, AnomalyClassifier};
use crate::error::{ClassifyError, Stage};
use crate::filter::qualified;
use crate::source::CorrelatedSource;
use crate::window::{TimeWindow, correlated_window, group_by_dimensions};

/// Updates decided by a run, before anything is written.
struct Classified {
    main_anomalies: usize,
    groups: usize,
    classifier_invocations: usize,
    updates: Vec<MergedAnomalyResult>,
}

impl Classified {
    fn empty() -> Self {
        Self {
            main_anomalies: 0,
            groups: 0,
            classifier_invocations: 0,
            updates: Vec::new(),
        }
    }
}

impl ClassificationEngine {
    /// Classify the main anomalies of `config` in `[window_start, window_end]`.
    ///
    /// On success every classifier decision is written back and the config
    /// watermark is advanced to `window_end` (also when the window held no
    /// qualified anomalies). On failure nothing is written and `config` is
    /// left untouched.
    pub fn run(
        &self,
        window_start: Timestamp,
        window_end: Timestamp,
        config: &mut ClassificationConfig,
    ) -> Result<RunSummary, ClassifyError> {
        if window_start > window_end {
            return Err(ClassifyError::InvalidWindow {
                start: window_start,
                end: window_end,
            });
        }

        let window = TimeWindow::new(window_start, window_end);
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "classification_run",
            %run_id,
            config_id = config.id,
            main_function_id = config.main_function_id,
            %window
        );
        let _guard = span.enter();
        let started = Instant::now();

        let classified = RunState::new(self, config, window).classify()?;
        self.persist_updates(&classified.updates, config, window)?;
        let watermark = self.advance_watermark(config, window)?;

        info!(
            "Classification config {} done in {:.2}s: {} anomalies in {} groups, {} updated, watermark {}",
            config.id,
            started.elapsed().as_secs_f64(),
            classified.main_anomalies,
            classified.groups,
            classified.updates.len(),
            watermark
        );

        Ok(RunSummary {
            run_id,
            config_id: config.id,
            window,
            main_anomalies: classified.main_anomalies,
            groups: classified.groups,
            classifier_invocations: classified.classifier_invocations,
            updated: classified.updates.len(),
            watermark,
        })
    }

    fn persist_updates(
        &self,
        updates: &[MergedAnomalyResult],
        config: &ClassificationConfig,
        window: TimeWindow,
    ) -> Result<(), ClassifyError> {
        for anomaly in updates {
            self.anomalies
                .update(anomaly)
                .map_err(|source| ClassifyError::Store {
                    stage: Stage::UpdateAnomaly,
                    function_id: config.main_function_id,
                    window,
                    dimensions: Some(anomaly.dimensions.canonical()),
                    source,
                })?;
            debug!(
                anomaly_id = anomaly.id,
                issue_type = anomaly.issue_type.as_deref().unwrap_or(""),
                "updated issue type"
            );
        }
        Ok(())
    }

    /// Persist the advanced watermark, then commit it to the caller's config.
    fn advance_watermark(
        &self,
        config: &mut ClassificationConfig,
        window: TimeWindow,
    ) -> Result<Timestamp, ClassifyError> {
        let mut next = config.clone();
        let watermark = next.advance_watermark(window.end);
        if watermark != window.end {
            debug!(watermark, window_end = window.end, "window ends before watermark; keeping watermark");
        }
        self.configs
            .update_config(&next)
            .map_err(|source| ClassifyError::Store {
                stage: Stage::UpdateWatermark,
                function_id: config.main_function_id,
                window,
                dimensions: None,
                source,
            })?;
        *config = next;
        Ok(watermark)
    }
}

/// State owned by a single run.
struct RunState<'a> {
    engine: &'a ClassificationEngine,
    config: &'a ClassificationConfig,
    window: TimeWindow,
    cache: FunctionConfigCache,
}

impl<'a> RunState<'a> {
    fn new(engine: &'a ClassificationEngine, config: &'a ClassificationConfig, window: TimeWindow) -> Self {
        Self {
            engine,
            config,
            window,
            cache: FunctionConfigCache::new(engine.functions.clone(), engine.filters.clone()),
        }
    }

    fn classify(mut self) -> Result<Classified, ClassifyError> {
        let main = self.main_anomalies()?;
        if main.is_empty() {
            info!("Classification config {} has no qualified anomalies in {}", self.config.id, self.window);
            return Ok(Classified::empty());
        }

        info!(
            "Classification config {} gets {} anomalies to identify issue type.",
            self.config.id,
            main.len()
        );
        let main_anomalies = main.len();
        let groups: Vec<(DimensionKey, Vec<MergedAnomalyResult>)> =
            group_by_dimensions(main).into_iter().collect();

        // Every group reads the cache; fill it before any group runs.
        self.cache.resolve_all(&self.config.function_ids)?;
        self.warn_adhoc_functions();

        let classifier = self
            .engine
            .classifiers
            .from_spec(&self.config.classifier_config)
            .map_err(|source| ClassifyError::Classifier {
                config_id: self.config.id,
                source,
            })?;
        debug!(classifier = classifier.name(), groups = groups.len(), "classifying dimension groups");

        let this = &self;
        let classifier = classifier.as_ref();
        let per_group: Vec<Vec<MergedAnomalyResult>> =
            if this.engine.options.parallel_groups && groups.len() > 1 {
                groups
                    .par_iter()
                    .map(|(key, members)| this.classify_group(key, members, classifier))
                    .collect::<Result<Vec<_>, ClassifyError>>()?
            } else {
                groups
                    .iter()
                    .map(|(key, members)| this.classify_group(key, members, classifier))
                    .collect::<Result<Vec<_>, ClassifyError>>()?
            };

        Ok(Classified {
            main_anomalies,
            groups: groups.len(),
            classifier_invocations: groups.len(),
            updates: per_group.into_iter().flatten().collect(),
        })
    }

    /// Qualified main anomalies in the run window, ordered by end time.
    fn main_anomalies(&mut self) -> Result<Vec<MergedAnomalyResult>, ClassifyError> {
        let main_id = self.config.main_function_id;
        let window = self.window;
        let exclude_child = self.engine.options.exclude_child_anomalies;
        let entry = self.cache.resolve(main_id)?;

        let fetched = self
            .engine
            .anomalies
            .find_overlapping(main_id, window.start, window.end, exclude_child)
            .map_err(|source| ClassifyError::Store {
                stage: Stage::FetchMain,
                function_id: main_id,
                window,
                dimensions: None,
                source,
            })?;
        let fetched_count = fetched.len();
        let mut kept = qualified(entry.filter.as_ref(), fetched);
        sort_by_end_time(&mut kept);

        debug!(fetched = fetched_count, qualified = kept.len(), "main anomalies");
        Ok(kept)
    }

    fn warn_adhoc_functions(&self) {
        let mut seen = HashSet::new();
        for function_id in &self.config.function_ids {
            if !seen.insert(*function_id) {
                continue;
            }
            if let Some(entry) = self.cache.get(*function_id) {
                if entry.source() == CorrelatedSource::Adhoc {
                    warn!(
                        function_id,
                        name = %entry.config.name,
                        "correlated function is inactive; on-demand detection is not available, skipping"
                    );
                }
            }
        }
    }

    fn classify_group(
        &self,
        key: &DimensionKey,
        members: &[MergedAnomalyResult],
        classifier: &dyn AnomalyClassifier,
    ) -> Result<Vec<MergedAnomalyResult>, ClassifyError> {
        let main_id = self.config.main_function_id;
        let correlated_window = correlated_window(self.window, members);
        let dimensions = key.canonical();

        let mut by_function = AnomaliesByFunction::new();
        by_function.insert(main_id, members.to_vec());

        for function_id in &self.config.function_ids {
            if *function_id == main_id {
                continue;
            }
            let correlated = self.correlated_anomalies(*function_id, correlated_window, &dimensions)?;
            if !correlated.is_empty() {
                by_function.insert(*function_id, correlated);
            }
        }

        debug!(
            dimensions = %dimensions,
            members = members.len(),
            correlated_window = %correlated_window,
            sources = by_function.len(),
            "classifying group"
        );

        let returned = classifier
            .classify(&by_function, self.config)
            .map_err(|source| ClassifyError::Classification {
                config_id: self.config.id,
                dimensions: dimensions.clone(),
                source,
            })?;

        self.apply_decisions(members, returned)
    }

    /// Qualified anomalies of one correlated function in the group's window.
    fn correlated_anomalies(
        &self,
        function_id: FunctionId,
        window: TimeWindow,
        dimensions: &str,
    ) -> Result<Vec<MergedAnomalyResult>, ClassifyError> {
        let Some(entry) = self.cache.get(function_id) else {
            return Ok(Vec::new());
        };

        match entry.source() {
            // On-demand detection would go here.
            CorrelatedSource::Adhoc => Ok(Vec::new()),
            CorrelatedSource::Stored if window.is_degenerate() => {
                debug!(function_id, %window, "degenerate correlated window; nothing to fetch");
                Ok(Vec::new())
            }
            CorrelatedSource::Stored => {
                let fetched = self
                    .engine
                    .anomalies
                    .find_overlapping_by_dimensions(
                        function_id,
                        window.start,
                        window.end,
                        dimensions,
                        self.engine.options.exclude_child_anomalies,
                    )
                    .map_err(|source| ClassifyError::Store {
                        stage: Stage::FetchCorrelated,
                        function_id,
                        window,
                        dimensions: Some(dimensions.to_string()),
                        source,
                    })?;
                let mut kept = qualified(entry.filter.as_ref(), fetched);
                sort_by_end_time(&mut kept);
                Ok(kept)
            }
        }
    }

    /// Apply the classifier's issue types to the group's own records.
    ///
    /// Only `issue_type` is taken from a returned record. A record that is not
    /// one of `members` is a contract violation; repeated ids keep the last.
    fn apply_decisions(
        &self,
        members: &[MergedAnomalyResult],
        returned: Vec<MergedAnomalyResult>,
    ) -> Result<Vec<MergedAnomalyResult>, ClassifyError> {
        let main_id = self.config.main_function_id;
        let by_id: HashMap<AnomalyId, &MergedAnomalyResult> = members.iter().map(|a| (a.id, a)).collect();
        let mut decided: IndexMap<AnomalyId, MergedAnomalyResult> = IndexMap::new();

        for record in returned {
            if record.function_id != main_id {
                return Err(ClassifyError::ClassifierContract {
                    config_id: self.config.id,
                    anomaly_id: record.id,
                    reason: format!(
                        "belongs to function {}, not main function {}",
                        record.function_id, main_id
                    ),
                });
            }
            let Some(original) = by_id.get(&record.id) else {
                return Err(ClassifyError::ClassifierContract {
                    config_id: self.config.id,
                    anomaly_id: record.id,
                    reason: "not a main anomaly of the classified dimension group".to_string(),
                });
            };
            let mut updated = (*original).clone();
            updated.issue_type = record.issue_type;
            decided.insert(updated.id, updated);
        }

        Ok(decided.into_values().collect())
    }
}
