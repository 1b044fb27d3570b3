//! Order-independent dimension identity used to group anomalies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical set of dimension name/value pairs.
///
/// Backed by a sorted map, so two keys built from the same pairs in any
/// insertion order compare equal, hash equal and produce the same
/// [`canonical`](DimensionKey::canonical) string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionKey(BTreeMap<String, String>);

impl DimensionKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical string form: a JSON object with keys in sorted order,
    /// e.g. `{"country":"US","device":"mobile"}`. The empty key is `{}`.
    pub fn canonical(&self) -> String {
        // A map of strings always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for DimensionKey {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map(Self)
    }
}

impl<K, V> FromIterator<(K, V)> for DimensionKey
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn insertion_order_does_not_matter() {
        let a = DimensionKey::new().with("country", "US").with("device", "mobile");
        let b = DimensionKey::new().with("device", "mobile").with("country", "US");

        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn canonical_is_sorted_json() {
        let key: DimensionKey = [("page", "home"), ("country", "US")].into_iter().collect();
        assert_eq!(key.canonical(), r#"{"country":"US","page":"home"}"#);
        assert_eq!(key.to_string(), key.canonical());
        assert_eq!(DimensionKey::new().canonical(), "{}");
    }

    #[test]
    fn parses_canonical_form() {
        let key = DimensionKey::new().with("country", "US");
        let parsed: DimensionKey = key.canonical().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("not json".parse::<DimensionKey>().is_err());
    }

    #[test]
    fn different_values_are_different_keys() {
        let us = DimensionKey::new().with("country", "US");
        let ca = DimensionKey::new().with("country", "CA");
        assert_ne!(us, ca);
        assert_ne!(us.canonical(), ca.canonical());
        assert_eq!(us.get("country"), Some("US"));
        assert_eq!(us.get("device"), None);
    }
}
