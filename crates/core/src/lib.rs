pub mod anomaly;
pub mod classification;
pub mod config;
pub mod dimension;
pub mod error;
pub mod function;
pub mod store;

pub use anomaly::*;
pub use classification::*;
pub use config::Config;
pub use dimension::DimensionKey;
pub use error::*;
pub use function::*;
pub use store::{
    AnomalyFunctionStore, ClassificationConfigStore, InMemoryStore, MergedAnomalyStore, Snapshot,
};
