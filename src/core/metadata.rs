//! Metadata scopes and composite registration keys.
//!
//! Every registration in a [`Container`](super::Container) is identified by a
//! name plus a metadata mapping. Metadata partitions rule families that share
//! names, and lookups select a family by passing a metadata filter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the required state name(s) of a transition.
pub const FROM_KEY: &str = "from";

/// Metadata key holding the target state name of a transition.
pub const TO_KEY: &str = "to";

/// An ordered mapping from metadata keys to JSON values.
///
/// Used both as the metadata half of a [`CompositeKey`] and as a lookup
/// filter. A key's metadata *covers* a filter when every filter entry is
/// present with an equal value; the empty filter is covered by everything.
/// A `null` filter entry also matches a key that lacks the entry.
///
/// # Example
///
/// ```rust
/// use statewise::core::Metadata;
///
/// let stored = Metadata::new().with("key", "base").with("from", "in_dock");
/// let filter = Metadata::new().with("key", "base");
///
/// assert!(stored.covers(&filter));
/// assert!(!filter.covers(&stored));
/// assert!(stored.covers(&Metadata::new()));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that every entry of `filter` is present here with an equal value.
    ///
    /// An absent entry reads as `null`.
    pub fn covers(&self, filter: &Metadata) -> bool {
        filter
            .0
            .iter()
            .all(|(key, value)| self.0.get(key).unwrap_or(&Value::Null) == value)
    }

    /// Merge `overrides` on top of `self`; entries in `overrides` win.
    pub fn merged(&self, overrides: &Metadata) -> Metadata {
        let mut merged = self.clone();
        for (key, value) in &overrides.0 {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Copy of this metadata with the named keys removed.
    pub fn without(&self, keys: &[&str]) -> Metadata {
        Metadata(
            self.0
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

/// Identity of one registration within a single container.
///
/// Registering the same `(name, metadata)` pair twice overwrites the prior
/// entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeKey {
    pub name: String,
    pub metadata: Metadata,
}

impl CompositeKey {
    pub fn new(name: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            name: name.into(),
            metadata,
        }
    }

    /// Whether this key answers a lookup for `name` under `filter`.
    pub fn matches(&self, name: &str, filter: &Metadata) -> bool {
        self.name == name && self.metadata.covers(filter)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.metadata)
    }
}

/// Build [`Metadata`] from `key => value` pairs.
///
/// # Example
///
/// ```rust
/// use statewise::metadata;
///
/// let scope = metadata! { "key" => "paddleboat" };
/// assert_eq!(scope.get("key").and_then(|v| v.as_str()), Some("paddleboat"));
///
/// let empty = metadata! {};
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! metadata {
    () => {
        $crate::core::Metadata::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::core::Metadata::new()$(.with($key, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_is_always_covered() {
        assert!(Metadata::new().covers(&Metadata::new()));
        assert!(metadata! { "key" => "base" }.covers(&Metadata::new()));
    }

    #[test]
    fn covers_requires_equal_values() {
        let stored = metadata! { "key" => "base", "level" => 2 };

        assert!(stored.covers(&metadata! { "key" => "base" }));
        assert!(stored.covers(&metadata! { "level" => 2, "key" => "base" }));
        assert!(!stored.covers(&metadata! { "key" => "sailboat" }));
        assert!(!stored.covers(&metadata! { "missing" => "base" }));
    }

    #[test]
    fn null_filter_entry_matches_absent_key() {
        let stored = metadata! { "key" => "base" };

        assert!(stored.covers(&metadata! { "missing" => Value::Null }));
        assert!(Metadata::new().covers(&metadata! { "key" => Value::Null }));
        assert!(!stored.covers(&metadata! { "key" => Value::Null }));
    }

    #[test]
    fn merged_prefers_overrides() {
        let scope = metadata! { "key" => "base", "family" => "boats" };
        let merged = scope.merged(&metadata! { "key" => "galley" });

        assert_eq!(merged.get("key"), Some(&json!("galley")));
        assert_eq!(merged.get("family"), Some(&json!("boats")));
        assert_eq!(scope.get("key"), Some(&json!("base")));
    }

    #[test]
    fn without_strips_reserved_keys() {
        let stored = metadata! { "key" => "base", FROM_KEY => "in_dock", TO_KEY => "on_water" };

        assert_eq!(stored.without(&[FROM_KEY, TO_KEY]), metadata! { "key" => "base" });
    }

    #[test]
    fn composite_key_matches_name_and_filter() {
        let key = CompositeKey::new("dock", metadata! { "key" => "base" });

        assert!(key.matches("dock", &Metadata::new()));
        assert!(key.matches("dock", &metadata! { "key" => "base" }));
        assert!(!key.matches("undock", &Metadata::new()));
        assert!(!key.matches("dock", &metadata! { "key" => "paddleboat" }));
    }

    #[test]
    fn metadata_serializes_as_plain_object() {
        let meta = metadata! { "from" => json!(["a", "b"]), "to" => "c" };
        let encoded = serde_json::to_value(&meta).unwrap();

        assert_eq!(encoded, json!({ "from": ["a", "b"], "to": "c" }));
        let decoded: Metadata = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn display_lists_entries() {
        let key = CompositeKey::new("undock", metadata! { "key" => "base" });
        assert_eq!(key.to_string(), "undock {key: \"base\"}");
    }
}
