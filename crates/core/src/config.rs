use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| parse_bool(&v).unwrap_or(default))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub store: StoreConfig,
    pub runner: RunnerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TRIAGE_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TRIAGE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            store: StoreConfig::from_env_profiled(p),
            runner: RunnerConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  store:   data_dir={}, file={}",
            self.store.data_dir.display(),
            self.store.store_file.display()
        );
        tracing::info!(
            "  runner:  parallel_groups={}, exclude_child={}, lookback={}m, max_window={}m",
            self.runner.parallel_groups,
            self.runner.exclude_child_anomalies,
            self.runner.lookback_minutes,
            self.runner.max_window_minutes
        );
    }
}

// ── Store ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    /// JSON snapshot backing the in-memory store.
    pub store_file: PathBuf,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        let data_dir = PathBuf::from(profiled_env_or(p, "DATA_DIR", "data"));
        let store_file = profiled_env_opt(p, "STORE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("triage-store.json"));
        Self { data_dir, store_file }
    }
}

// ── Runner ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Classify dimension groups concurrently.
    pub parallel_groups: bool,
    /// Drop child anomalies from store queries.
    pub exclude_child_anomalies: bool,
    /// Window start used when a classification config has no watermark yet.
    pub lookback_minutes: u64,
    /// Upper bound on the length of a single planned window.
    pub max_window_minutes: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel_groups: false,
            exclude_child_anomalies: false,
            lookback_minutes: 1440,
            max_window_minutes: 1440,
        }
    }
}

impl RunnerConfig {
    fn from_env_profiled(p: &str) -> Self {
        let defaults = Self::default();
        Self {
            parallel_groups: profiled_env_bool(p, "CLASSIFY_PARALLEL_GROUPS", defaults.parallel_groups),
            exclude_child_anomalies: profiled_env_bool(
                p,
                "CLASSIFY_EXCLUDE_CHILD",
                defaults.exclude_child_anomalies,
            ),
            lookback_minutes: profiled_env_u64(p, "CLASSIFY_LOOKBACK_MINUTES", defaults.lookback_minutes),
            max_window_minutes: profiled_env_u64(
                p,
                "CLASSIFY_MAX_WINDOW_MINUTES",
                defaults.max_window_minutes,
            ),
        }
    }

    pub fn lookback_millis(&self) -> i64 {
        minutes_to_millis(self.lookback_minutes)
    }

    pub fn max_window_millis(&self) -> i64 {
        minutes_to_millis(self.max_window_minutes)
    }
}

fn minutes_to_millis(minutes: u64) -> i64 {
    i64::try_from(minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(60_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn runner_defaults() {
        let runner = RunnerConfig::default();
        assert!(!runner.parallel_groups);
        assert!(!runner.exclude_child_anomalies);
        assert_eq!(runner.lookback_millis(), 86_400_000);
        assert_eq!(runner.max_window_millis(), 86_400_000);
    }

    #[test]
    fn minutes_to_millis_saturates() {
        assert_eq!(minutes_to_millis(u64::MAX), i64::MAX);
    }

    #[test]
    fn profile_label_defaults() {
        let config = Config {
            profile: String::new(),
            store: StoreConfig {
                data_dir: PathBuf::from("data"),
                store_file: PathBuf::from("data/triage-store.json"),
            },
            runner: RunnerConfig::default(),
        };
        assert_eq!(config.profile_label(), "default");
    }
}
