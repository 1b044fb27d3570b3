//! End-to-end runs against the in-memory store and the built-in plugins.

use std::sync::Arc;

use triage_classify::{
    ClassificationEngine, ClassificationTaskInfo, ClassificationTaskRunner, TimeWindow,
};
use triage_core::{
    ClassificationConfig, ClassificationConfigStore, ClassifierSpec, DimensionKey, FunctionConfig,
    InMemoryStore, MergedAnomalyResult, Snapshot,
};

/// Resolve the example snapshot relative to the workspace root.
fn example_snapshot() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/examples/triage-store.json")
}

fn correlation_spec(pairs: &[(&str, &str)]) -> ClassifierSpec {
    let mut spec: ClassifierSpec = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    spec.insert("type".to_string(), "correlation".to_string());
    spec
}

// ── Reference scenario ──────────────────────────────────────

#[test]
fn correlated_anomaly_marks_main_anomaly() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_function(FunctionConfig::new(1, "main")).unwrap();
    store.insert_function(FunctionConfig::new(2, "correlated")).unwrap();

    let us = DimensionKey::new().with("country", "US");
    store.insert_anomaly(MergedAnomalyResult::new(10, 1, us.clone(), 1100, 1900)).unwrap();
    store.insert_anomaly(MergedAnomalyResult::new(20, 2, us, 1150, 1850)).unwrap();

    let mut config = ClassificationConfig::new(1, 1)
        .with_correlated([2])
        .with_classifier(correlation_spec(&[]));
    store.insert_config(config.clone()).unwrap();

    let engine = ClassificationEngine::with_store(store.clone());
    let summary = engine.run(1000, 2000, &mut config).unwrap();

    assert_eq!(summary.main_anomalies, 1);
    assert_eq!(summary.groups, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.watermark, 2000);
    assert_eq!(store.anomaly(10).unwrap().issue_type.as_deref(), Some("CORRELATED"));
    assert_eq!(store.anomaly(20).unwrap().issue_type, None);
    assert_eq!(store.find_config(1).unwrap().end_time_watermark, Some(2000));
}

// ── Example snapshot ────────────────────────────────────────

#[test]
fn example_snapshot_classifies_and_persists() {
    let dir = tempfile::TempDir::new().expect("create tempdir");
    let path = dir.path().join("store.json");
    Snapshot::load(&example_snapshot()).unwrap().save(&path).unwrap();

    let store = Arc::new(InMemoryStore::open(&path).unwrap());
    let runner = ClassificationTaskRunner::new(Arc::new(ClassificationEngine::with_store(store.clone())));
    let config = store.find_config(1).unwrap();

    let outcome = runner
        .execute(ClassificationTaskInfo::new(TimeWindow::new(1000, 2000), config))
        .unwrap();

    // 103 is below the main filter's min_score.
    assert_eq!(outcome.summary.main_anomalies, 2);
    assert_eq!(outcome.summary.groups, 2);
    assert_eq!(outcome.summary.updated, 2);

    // US overlaps the payment function; DE only has the inactive CDN function.
    assert_eq!(store.anomaly(101).unwrap().issue_type.as_deref(), Some("PAYMENT_OUTAGE"));
    assert_eq!(store.anomaly(102).unwrap().issue_type.as_deref(), Some("ISOLATED"));
    assert_eq!(store.anomaly(103).unwrap().issue_type, None);

    store.save(&path).unwrap();
    let reopened = InMemoryStore::open(&path).unwrap();
    assert_eq!(reopened.anomaly(101).unwrap().issue_type.as_deref(), Some("PAYMENT_OUTAGE"));
    assert_eq!(reopened.find_config(1).unwrap().end_time_watermark, Some(2000));
}

#[test]
fn planned_windows_walk_forward_from_watermark() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_function(FunctionConfig::new(1, "main")).unwrap();
    let mut config = ClassificationConfig::new(5, 1);
    config.end_time_watermark = Some(0);
    store.insert_config(config.clone()).unwrap();

    let runner = ClassificationTaskRunner::new(Arc::new(ClassificationEngine::with_store(store.clone())));
    let runner_config = triage_core::config::RunnerConfig {
        max_window_minutes: 1,
        ..Default::default()
    };

    let now = 150_000;
    let mut windows = Vec::new();
    while let Some(task) = ClassificationTaskInfo::plan(&config, now, &runner_config) {
        windows.push(task.window());
        config = runner.execute(task).unwrap().config;
    }

    assert_eq!(
        windows,
        vec![
            TimeWindow::new(0, 60_000),
            TimeWindow::new(60_000, 120_000),
            TimeWindow::new(120_000, 150_000),
        ]
    );
    assert_eq!(store.find_config(5).unwrap().end_time_watermark, Some(150_000));
}
