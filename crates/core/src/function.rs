//! Anomaly detection function configuration, as read by classification.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::anomaly::FunctionId;

/// Opaque alert filter spec, interpreted by an alert filter factory.
pub type AlertFilterSpec = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub id: FunctionId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub alert_filter: AlertFilterSpec,
}

fn default_active() -> bool {
    true
}

impl FunctionConfig {
    pub fn new(id: FunctionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_active: true,
            alert_filter: AlertFilterSpec::new(),
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_alert_filter(mut self, spec: AlertFilterSpec) -> Self {
        self.alert_filter = spec;
        self
    }
}
