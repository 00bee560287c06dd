//! Named state predicates over a record.
//!
//! A state is not a tag stored on the record: it is a predicate evaluated
//! against the record whenever it is asked for.

use crate::core::{Container, Metadata};
use std::sync::Arc;

/// Predicate over the record only.
pub type PlainPredicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

/// Predicate that also receives the registry it is being evaluated through,
/// so it can be derived from other named states.
pub type ResolvingPredicate<R> = Box<dyn Fn(&R, &StateRegistry<R>) -> bool + Send + Sync>;

/// A registered state predicate.
///
/// The variant is chosen at registration time; nothing inspects closure
/// signatures at call time.
pub enum Predicate<R> {
    Plain(PlainPredicate<R>),
    Resolving(ResolvingPredicate<R>),
}

impl<R> Predicate<R> {
    pub fn plain<F>(predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self::Plain(Box::new(predicate))
    }

    pub fn resolving<F>(predicate: F) -> Self
    where
        F: Fn(&R, &StateRegistry<R>) -> bool + Send + Sync + 'static,
    {
        Self::Resolving(Box::new(predicate))
    }

    /// Evaluate against `record`, passing `registry` to resolving predicates.
    pub fn check(&self, record: &R, registry: &StateRegistry<R>) -> bool {
        match self {
            Self::Plain(predicate) => predicate(record),
            Self::Resolving(predicate) => predicate(record, registry),
        }
    }
}

/// Registers and evaluates named predicates, backed by one [`Container`].
///
/// Cloning a registry is cheap and yields a handle to the same container.
///
/// # Example
///
/// ```rust
/// use statewise::core::Metadata;
/// use statewise::registry::{Predicate, StateRegistry};
/// use serde_json::{json, Value};
///
/// let states = StateRegistry::<Value>::new();
/// states.define("in_dock", Metadata::new(), Predicate::plain(|b: &Value| b["docked"] == json!(true)));
/// states.define(
///     "on_water",
///     Metadata::new(),
///     Predicate::resolving(|b: &Value, s: &StateRegistry<Value>| !s.evaluate("in_dock", b, &Metadata::new())),
/// );
///
/// let boat = json!({ "docked": false });
/// assert!(states.evaluate("on_water", &boat, &Metadata::new()));
/// assert!(!states.evaluate("in_dock", &boat, &Metadata::new()));
/// assert!(!states.evaluate("sinking", &boat, &Metadata::new()));
/// ```
pub struct StateRegistry<R> {
    container: Arc<Container<Predicate<R>>>,
}

impl<R> StateRegistry<R> {
    /// Create a registry with no parents.
    pub fn new() -> Self {
        Self::from_container(Arc::new(Container::new()))
    }

    /// Create a registry on top of an existing container.
    pub fn from_container(container: Arc<Container<Predicate<R>>>) -> Self {
        Self { container }
    }

    /// The container backing this registry, for composition links.
    pub fn container(&self) -> &Arc<Container<Predicate<R>>> {
        &self.container
    }

    /// Register `predicate` under `(name, metadata)`, overwriting any
    /// previous predicate with the same key in this registry.
    pub fn define(&self, name: impl Into<String>, metadata: Metadata, predicate: Predicate<R>) {
        self.container.register(name, metadata, predicate);
    }

    /// Evaluate the state `name` against `record`.
    ///
    /// Resolves through the fallback chain per name. A state that resolves
    /// nowhere evaluates to `false`.
    pub fn evaluate(&self, name: &str, record: &R, filter: &Metadata) -> bool {
        match self.container.lookup(name, filter) {
            Some(predicate) => {
                let holds = predicate.check(record, self);
                tracing::trace!(state = name, %filter, holds, "evaluated state");
                holds
            }
            None => {
                tracing::trace!(state = name, %filter, "state not declared");
                false
            }
        }
    }

    /// Every declared state name whose predicate holds for `record`.
    pub fn matching_states(&self, record: &R) -> Vec<String> {
        let unscoped = Metadata::new();
        self.container
            .names()
            .into_iter()
            .filter(|name| self.evaluate(name, record, &unscoped))
            .collect()
    }

    /// Every declared state name, deduplicated, in first-declared order.
    pub fn declared_names(&self) -> Vec<String> {
        self.container.names()
    }
}

impl<R> Clone for StateRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            container: Arc::clone(&self.container),
        }
    }
}

impl<R> Default for StateRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;
    use serde_json::{json, Value};

    fn has(key: &'static str) -> Predicate<Value> {
        Predicate::plain(move |r: &Value| r.get(key).is_some())
    }

    #[test]
    fn undeclared_state_is_false() {
        let states = StateRegistry::<Value>::new();
        assert!(!states.evaluate("anything", &json!({}), &Metadata::new()));
    }

    #[test]
    fn plain_and_resolving_predicates_coexist() {
        let states = StateRegistry::<Value>::new();
        states.define("a", Metadata::new(), has("a"));
        states.define(
            "a_and_b",
            Metadata::new(),
            Predicate::resolving(|r: &Value, s: &StateRegistry<Value>| {
                s.evaluate("a", r, &Metadata::new()) && r.get("b").is_some()
            }),
        );

        assert!(states.evaluate("a_and_b", &json!({ "a": 1, "b": 2 }), &Metadata::new()));
        assert!(!states.evaluate("a_and_b", &json!({ "b": 2 }), &Metadata::new()));
    }

    #[test]
    fn resolver_handle_is_the_evaluating_registry() {
        let parent = StateRegistry::<Value>::new();
        parent.define(
            "ready",
            Metadata::new(),
            Predicate::resolving(|r: &Value, s: &StateRegistry<Value>| {
                s.evaluate("engine_on", r, &Metadata::new())
            }),
        );
        let child = StateRegistry::from_container(Arc::new(Container::with_parents([
            Arc::clone(parent.container()),
        ])));
        child.define("engine_on", Metadata::new(), Predicate::plain(|_: &Value| true));

        assert!(child.evaluate("ready", &json!({}), &Metadata::new()));
        assert!(!parent.evaluate("ready", &json!({}), &Metadata::new()));
    }

    #[test]
    fn metadata_families_evaluate_independently() {
        let states = StateRegistry::<Value>::new();
        states.define("ready", metadata! { "key" => "a" }, has("a"));
        states.define("ready", metadata! { "key" => "b" }, has("b"));
        let record = json!({ "b": true });

        assert!(!states.evaluate("ready", &record, &metadata! { "key" => "a" }));
        assert!(states.evaluate("ready", &record, &metadata! { "key" => "b" }));
    }

    #[test]
    fn matching_states_deduplicates_names() {
        let parent = StateRegistry::<Value>::new();
        parent.define("a", Metadata::new(), has("a"));
        parent.define("c", Metadata::new(), has("c"));
        let child = StateRegistry::from_container(Arc::new(Container::with_parents([
            Arc::clone(parent.container()),
        ])));
        child.define("a", Metadata::new(), has("a"));
        child.define("b", Metadata::new(), has("b"));

        let mut matched = child.matching_states(&json!({ "a": 1, "b": 2 }));
        matched.sort();
        assert_eq!(matched, vec!["a", "b"]);

        let mut names = child.declared_names();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn redefining_replaces_predicate() {
        let states = StateRegistry::<Value>::new();
        states.define("open", Metadata::new(), Predicate::plain(|_: &Value| false));
        states.define("open", Metadata::new(), Predicate::plain(|_: &Value| true));

        assert!(states.evaluate("open", &json!({}), &Metadata::new()));
        assert_eq!(states.declared_names(), vec!["open"]);
    }
}
