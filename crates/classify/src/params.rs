//! Typed access to the string maps plugins are built from.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::PluginError;

/// Key naming the plugin implementation in a spec.
pub(crate) const TYPE_KEY: &str = "type";

/// Lower-cased plugin type, `None` when absent or blank.
pub(crate) fn plugin_type(spec: &HashMap<String, String>) -> Option<String> {
    spec.get(TYPE_KEY)
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
}

/// Parse an optional parameter; present-but-malformed is an error.
pub(crate) fn optional<T>(spec: &HashMap<String, String>, key: &str) -> Result<Option<T>, PluginError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match spec.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| PluginError::InvalidParam {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
