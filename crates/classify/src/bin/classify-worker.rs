//! classify-worker — runs anomaly classification against a store snapshot.
//!
//! Loads the JSON snapshot, runs one classification config (or every active
//! one) over an explicit or planned window, and writes the snapshot back.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{error, info};

use triage_classify::{
    ClassificationEngine, ClassificationTaskInfo, ClassificationTaskRunner, EngineOptions, TimeWindow,
};
use triage_core::config::{Config, load_dotenv};
use triage_core::{ClassificationConfigStore, InMemoryStore, timestamp_from};

// ── CLI ─────────────────────────────────────────────────────────────

/// Classification worker — assigns issue types to main-function anomalies.
#[derive(Parser, Debug)]
#[command(name = "classify-worker", version, about)]
struct Cli {
    /// Path to the JSON store snapshot (defaults to the configured store file).
    #[arg(long, env = "TRIAGE_STORE_FILE")]
    store: Option<PathBuf>,

    /// Classification config to run.
    #[arg(long, conflicts_with = "all", required_unless_present = "all")]
    config_id: Option<u64>,

    /// Run every active classification config.
    #[arg(long)]
    all: bool,

    /// Window start in epoch millis (requires --window-end).
    #[arg(long, requires = "window_end")]
    window_start: Option<i64>,

    /// Window end in epoch millis (requires --window-start).
    #[arg(long, requires = "window_start")]
    window_end: Option<i64>,

    /// Classify dimension groups in parallel.
    #[arg(long)]
    parallel: bool,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let store_path = cli.store.clone().unwrap_or_else(|| config.store.store_file.clone());
    let store = Arc::new(
        InMemoryStore::open(&store_path)
            .with_context(|| format!("failed to open store {}", store_path.display()))?,
    );

    let mut options = EngineOptions::from(&config.runner);
    options.parallel_groups |= cli.parallel;
    let engine = Arc::new(ClassificationEngine::with_store(store.clone()).with_options(options));
    let runner = ClassificationTaskRunner::new(engine);

    let configs = match cli.config_id {
        Some(id) => vec![store.find_config(id).with_context(|| format!("classification config {id}"))?],
        None => store.find_active_configs()?,
    };
    if configs.is_empty() {
        info!("no active classification configs");
        return Ok(());
    }

    let explicit = match (cli.window_start, cli.window_end) {
        (Some(start), Some(end)) => Some(TimeWindow::new(start, end)),
        _ => None,
    };
    let now = timestamp_from(chrono::Utc::now());

    let mut failures = 0usize;
    for classification in configs {
        let task = match explicit {
            Some(window) => Some(ClassificationTaskInfo::new(window, classification.clone())),
            None => ClassificationTaskInfo::plan(&classification, now, &config.runner),
        };
        let Some(task) = task else {
            info!(config_id = classification.id, "classification config is up to date");
            continue;
        };

        match runner.execute(task) {
            Ok(outcome) => info!(
                config_id = outcome.config.id,
                run_id = %outcome.summary.run_id,
                groups = outcome.summary.groups,
                updated = outcome.summary.updated,
                watermark = outcome.summary.watermark,
                "classification run complete"
            ),
            Err(e) => {
                failures += 1;
                error!(config_id = classification.id, error = %e, "classification run failed");
            }
        }
    }

    store
        .save(&store_path)
        .with_context(|| format!("failed to save store {}", store_path.display()))?;

    if failures > 0 {
        bail!("{failures} classification run(s) failed");
    }
    Ok(())
}
