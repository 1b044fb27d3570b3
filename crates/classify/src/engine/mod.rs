//! Classification engine -- drives one windowed classification run.
//!
//! Split into focused submodules:
//! - `core`: engine struct, options, run summary and constructors
//! - `run`: the run itself (fetch, filter, group, correlate, classify, persist)

mod core;
mod run;

pub use self::core::{ClassificationEngine, EngineOptions, RunSummary};
