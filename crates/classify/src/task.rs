//! Task-level wrapper: what a host scheduler hands over and gets back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use triage_core::config::RunnerConfig;
use triage_core::{ClassificationConfig, Timestamp, format_timestamp};

use crate::engine::{ClassificationEngine, RunSummary};
use crate::error::ClassifyError;
use crate::window::TimeWindow;

/// One unit of classification work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTaskInfo {
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub config: ClassificationConfig,
}

impl ClassificationTaskInfo {
    pub fn new(window: TimeWindow, config: ClassificationConfig) -> Self {
        Self {
            window_start: window.start,
            window_end: window.end,
            config,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.window_start, self.window_end)
    }

    /// Plan the next task for `config`, or `None` if it is caught up.
    pub fn plan(config: &ClassificationConfig, now: Timestamp, runner: &RunnerConfig) -> Option<Self> {
        plan_window(config, now, runner.lookback_millis(), runner.max_window_millis())
            .map(|window| Self::new(window, config.clone()))
    }
}

/// Result of executing a task: the run summary and the config as persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub summary: RunSummary,
    pub config: ClassificationConfig,
}

/// Executes [`ClassificationTaskInfo`]s against a shared engine.
pub struct ClassificationTaskRunner {
    engine: Arc<ClassificationEngine>,
}

impl ClassificationTaskRunner {
    pub fn new(engine: Arc<ClassificationEngine>) -> Self {
        Self { engine }
    }

    pub fn execute(&self, info: ClassificationTaskInfo) -> Result<TaskOutcome, ClassifyError> {
        info!(
            config_id = info.config.id,
            "Setting up classification task for {} .. {}",
            format_timestamp(info.window_start),
            format_timestamp(info.window_end)
        );
        let mut config = info.config;
        let summary = self.engine.run(info.window_start, info.window_end, &mut config)?;
        Ok(TaskOutcome { summary, config })
    }
}

/// Next window to classify for `config` at time `now`.
///
/// Starts at the watermark, or `lookback` before `now` when there is none.
/// Ends at `now`, capped to `max_window` after the start when `max_window`
/// is positive. `None` when the watermark has already reached `now`.
pub fn plan_window(
    config: &ClassificationConfig,
    now: Timestamp,
    lookback: i64,
    max_window: i64,
) -> Option<TimeWindow> {
    let start = config
        .end_time_watermark
        .unwrap_or_else(|| now.saturating_sub(lookback));
    if start >= now {
        return None;
    }
    let end = if max_window > 0 {
        now.min(start.saturating_add(max_window))
    } else {
        now
    };
    Some(TimeWindow::new(start, end))
}

#[cfg(test)]
mod tests {
    use triage_core::{DimensionKey, FunctionConfig, InMemoryStore, MergedAnomalyResult};

    use super::*;

    const HOUR: i64 = 3_600_000;

    #[test]
    fn plan_starts_from_watermark() {
        let mut config = ClassificationConfig::new(1, 1);
        config.end_time_watermark = Some(10 * HOUR);
        assert_eq!(plan_window(&config, 12 * HOUR, HOUR, 0), Some(TimeWindow::new(10 * HOUR, 12 * HOUR)));
    }

    #[test]
    fn plan_uses_lookback_without_watermark() {
        let config = ClassificationConfig::new(1, 1);
        assert_eq!(plan_window(&config, 12 * HOUR, 3 * HOUR, 0), Some(TimeWindow::new(9 * HOUR, 12 * HOUR)));
    }

    #[test]
    fn plan_caps_window_length() {
        let mut config = ClassificationConfig::new(1, 1);
        config.end_time_watermark = Some(0);
        assert_eq!(plan_window(&config, 48 * HOUR, HOUR, 24 * HOUR), Some(TimeWindow::new(0, 24 * HOUR)));
    }

    #[test]
    fn caught_up_config_has_no_window() {
        let mut config = ClassificationConfig::new(1, 1);
        config.end_time_watermark = Some(5 * HOUR);
        assert_eq!(plan_window(&config, 5 * HOUR, HOUR, 0), None);
        assert!(ClassificationTaskInfo::plan(&config, 4 * HOUR, &RunnerConfig::default()).is_none());
    }

    #[test]
    fn task_info_json_shape() {
        let info = ClassificationTaskInfo::new(TimeWindow::new(1000, 2000), ClassificationConfig::new(3, 1));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["window_start"], 1000);
        assert_eq!(json["window_end"], 2000);
        assert_eq!(json["config"]["main_function_id"], 1);

        let back: ClassificationTaskInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back.window(), TimeWindow::new(1000, 2000));
    }

    #[test]
    fn runner_returns_advanced_config() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_function(FunctionConfig::new(1, "main")).unwrap();
        store
            .insert_anomaly(MergedAnomalyResult::new(1, 1, DimensionKey::new().with("country", "US"), 1100, 1900))
            .unwrap();
        let config = ClassificationConfig::new(3, 1);
        store.insert_config(config.clone()).unwrap();

        let runner = ClassificationTaskRunner::new(Arc::new(ClassificationEngine::with_store(store)));
        let outcome = runner
            .execute(ClassificationTaskInfo::new(TimeWindow::new(1000, 2000), config))
            .unwrap();

        assert_eq!(outcome.summary.main_anomalies, 1);
        assert_eq!(outcome.summary.updated, 0);
        assert_eq!(outcome.config.end_time_watermark, Some(2000));
    }
}
