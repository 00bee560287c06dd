//! Composition units pairing a state registry with a transition registry.

use crate::core::{Container, Metadata};
use crate::machine::scope::Scope;
use crate::registry::{
    DefinitionError, Params, Path, Predicate, StateRegistry, Transform, TransitionError,
    TransitionRegistry,
};
use std::sync::Arc;

/// A named bundle of state and transition declarations.
///
/// A machine is both the unit new rules are declared on and the handle
/// records are evaluated and transformed through. Machines built with
/// [`Machine::composed_of`] see every parent's declarations through
/// container fallback without copying them.
///
/// Cloning a machine yields another handle to the same definitions.
///
/// # Example
///
/// ```rust
/// use statewise::{Machine, Path, TransitionError};
/// use serde_json::{json, Value};
///
/// let boat = Machine::<Value>::new();
/// boat.state("on_water", |b| b["docked"] != json!(true))
///     .state("in_dock", |b| b["docked"] == json!(true))
///     .transition("undock", Path::new("in_dock", "on_water"), |mut b, _| {
///         b["docked"] = json!(false);
///         Ok(b)
///     });
///
/// let afloat = boat.call("undock", &json!({ "docked": true })).unwrap();
/// assert_eq!(afloat, json!({ "docked": false }));
/// assert!(matches!(
///     boat.call("undock", &afloat),
///     Err(TransitionError::GuardNotSatisfied { .. })
/// ));
/// ```
pub struct Machine<R> {
    states: StateRegistry<R>,
    transitions: TransitionRegistry<R>,
}

impl<R: Clone + 'static> Machine<R> {
    /// Create a machine with no parents.
    pub fn new() -> Self {
        Self::composed_of(&[])
    }

    /// Create a machine falling back to `parents`, in the order given.
    ///
    /// Earlier parents take precedence when several declare the same name.
    pub fn composed_of(parents: &[&Machine<R>]) -> Self {
        let state_container = Container::with_parents(
            parents
                .iter()
                .map(|parent| Arc::clone(parent.states.container())),
        );
        let transition_container = Container::with_parents(
            parents
                .iter()
                .map(|parent| Arc::clone(parent.transitions.container())),
        );
        let states = StateRegistry::from_container(Arc::new(state_container));
        let transitions =
            TransitionRegistry::from_container(Arc::new(transition_container), states.clone());
        Self {
            states,
            transitions,
        }
    }

    /// Append `parent` to this machine's fallback chain.
    ///
    /// Linking a parent twice is a no-op. A parent that already falls back
    /// to this machine is refused and nothing is linked.
    pub fn link(&self, parent: &Machine<R>) -> Result<(), DefinitionError> {
        let states = self.states.container();
        let transitions = self.transitions.container();
        if !states.can_link(parent.states.container())
            || !transitions.can_link(parent.transitions.container())
        {
            tracing::warn!("refused cyclic machine composition");
            return Err(DefinitionError::CyclicComposition);
        }
        states
            .link(Arc::clone(parent.states.container()))
            .map_err(|_| DefinitionError::CyclicComposition)?;
        transitions
            .link(Arc::clone(parent.transitions.container()))
            .map_err(|_| DefinitionError::CyclicComposition)?;
        Ok(())
    }

    /// Registration handle that tags every declaration with `metadata`.
    pub fn scope(&self, metadata: Metadata) -> Scope<'_, R> {
        Scope::new(self, metadata)
    }

    /// Declare a state from a predicate over the record.
    pub fn state<F>(&self, name: &str, predicate: F) -> &Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.states.define(name, Metadata::new(), Predicate::plain(predicate));
        self
    }

    /// Declare a state whose predicate may consult other states.
    pub fn state_with_resolver<F>(&self, name: &str, predicate: F) -> &Self
    where
        F: Fn(&R, &StateRegistry<R>) -> bool + Send + Sync + 'static,
    {
        self.states.define(name, Metadata::new(), Predicate::resolving(predicate));
        self
    }

    /// Declare a transition that transforms the record.
    pub fn transition<F>(&self, event: &str, path: Path, transform: F) -> &Self
    where
        F: Fn(R, &Params) -> Result<R, TransitionError> + Send + Sync + 'static,
    {
        self.transitions.define(event, &path, Metadata::new(), Transform::plain(transform));
        self
    }

    /// Declare a transition whose transform may consult states or call
    /// other transitions through the dispatching registry.
    pub fn transition_with_resolver<F>(&self, event: &str, path: Path, transform: F) -> &Self
    where
        F: Fn(R, &TransitionRegistry<R>, &Params) -> Result<R, TransitionError>
            + Send
            + Sync
            + 'static,
    {
        self.transitions.define(event, &path, Metadata::new(), Transform::resolving(transform));
        self
    }

    pub fn state_registry(&self) -> &StateRegistry<R> {
        &self.states
    }

    pub fn transition_registry(&self) -> &TransitionRegistry<R> {
        &self.transitions
    }

    pub fn is_state(&self, name: &str, record: &R) -> bool {
        self.states.evaluate(name, record, &Metadata::new())
    }

    pub fn is_state_in(&self, name: &str, record: &R, metadata: &Metadata) -> bool {
        self.states.evaluate(name, record, metadata)
    }

    /// Names of every declared state that holds for `record`.
    pub fn states(&self, record: &R) -> Vec<String> {
        self.states.matching_states(record)
    }

    pub fn state_names(&self) -> Vec<String> {
        self.states.declared_names()
    }

    pub fn can_transition(&self, event: &str, record: &R) -> bool {
        self.transitions.is_available(event, record, &Metadata::new())
    }

    pub fn can_transition_in(&self, event: &str, record: &R, metadata: &Metadata) -> bool {
        self.transitions.is_available(event, record, metadata)
    }

    /// Every declared transition, across all composition levels, whose
    /// metadata covers `metadata` and whose guard holds for `record`.
    pub fn transitions(&self, record: &R, metadata: &Metadata) -> Vec<(String, Metadata)> {
        self.transitions
            .available_transitions(record, metadata)
            .into_iter()
            .map(|key| (key.name, key.metadata))
            .collect()
    }

    pub fn transition_names(&self) -> Vec<String> {
        self.transitions.declared_events()
    }

    /// Apply `event` to a copy of `record`. See [`TransitionRegistry::call`].
    pub fn call(&self, event: &str, record: &R) -> Result<R, TransitionError> {
        self.transitions.call(event, record, &Metadata::new(), &Params::new())
    }

    pub fn call_in(
        &self,
        event: &str,
        record: &R,
        metadata: &Metadata,
    ) -> Result<R, TransitionError> {
        self.transitions.call(event, record, metadata, &Params::new())
    }

    pub fn call_with(
        &self,
        event: &str,
        record: &R,
        metadata: &Metadata,
        params: &Params,
    ) -> Result<R, TransitionError> {
        self.transitions.call(event, record, metadata, params)
    }

    /// Apply `event` if it is declared and applicable, otherwise return a
    /// copy of `record`. See [`TransitionRegistry::safe_call`].
    pub fn safe_call(&self, event: &str, record: &R) -> Result<R, TransitionError> {
        self.transitions.safe_call(event, record, &Metadata::new(), &Params::new())
    }

    pub fn safe_call_in(
        &self,
        event: &str,
        record: &R,
        metadata: &Metadata,
    ) -> Result<R, TransitionError> {
        self.transitions.safe_call(event, record, metadata, &Params::new())
    }

    pub fn safe_call_with(
        &self,
        event: &str,
        record: &R,
        metadata: &Metadata,
        params: &Params,
    ) -> Result<R, TransitionError> {
        self.transitions.safe_call(event, record, metadata, params)
    }
}

impl<R: Clone + 'static> Default for Machine<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Machine<R> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
            transitions: self.transitions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;
    use serde_json::{json, Value};

    fn flag(name: &'static str) -> impl Fn(&Value) -> bool + Send + Sync + 'static {
        move |r: &Value| r[name] == json!(true)
    }

    #[test]
    fn child_sees_parent_declarations() {
        let parent = Machine::<Value>::new();
        parent.state("open", flag("open"));
        let child = Machine::composed_of(&[&parent]);
        child.state("locked", flag("locked"));

        assert!(child.is_state("open", &json!({ "open": true })));
        let mut names = child.state_names();
        names.sort();
        assert_eq!(names, vec!["locked", "open"]);
        assert_eq!(parent.state_names(), vec!["open"]);
    }

    #[test]
    fn first_parent_wins_in_diamond() {
        let root = Machine::<Value>::new();
        root.state("x", |_| false);
        let left = Machine::composed_of(&[&root]);
        left.state("x", |_| true);
        let right = Machine::composed_of(&[&root]);
        right.state("x", |_| false);
        right.state("y", |_| true);

        let bottom = Machine::composed_of(&[&left, &right]);
        assert!(bottom.is_state("x", &json!({})));
        assert!(bottom.is_state("y", &json!({})));

        let reversed = Machine::composed_of(&[&right, &left]);
        assert!(!reversed.is_state("x", &json!({})));
    }

    #[test]
    fn link_is_idempotent_and_acyclic() {
        let parent = Machine::<Value>::new();
        let child = Machine::composed_of(&[&parent]);

        child.link(&parent).unwrap();
        assert_eq!(child.state_registry().container().parents().len(), 1);
        assert_eq!(child.transition_registry().container().parents().len(), 1);
        assert_eq!(parent.link(&child), Err(DefinitionError::CyclicComposition));
        assert!(parent.state_registry().container().parents().is_empty());
    }

    #[test]
    fn linked_parent_is_consulted_after_existing_ones() {
        let first = Machine::<Value>::new();
        first.state("x", |_| true);
        let second = Machine::<Value>::new();
        second.state("x", |_| false);
        let child = Machine::composed_of(&[&first]);
        child.link(&second).unwrap();

        assert!(child.is_state("x", &json!({})));
    }

    #[test]
    fn transitions_lists_every_level() {
        let parent = Machine::<Value>::new();
        parent
            .state("a", |r| r.get("some_key").is_some())
            .state("c", |r| r.get("some_key3").is_some())
            .transition("switch", Path::new("a", "b"), |r, _| Ok(r));
        let child = Machine::composed_of(&[&parent]);
        child
            .state("b", |r| r.get("some_key2").is_some())
            .transition("switch", Path::new("b", "c"), |r, _| Ok(r));

        let listed = child.transitions(&json!({ "some_key": 1, "some_key2": 2 }), &Metadata::new());
        assert!(listed.contains(&(
            "switch".to_string(),
            metadata! { "from" => "a", "to" => "b" }
        )));
        assert!(listed.contains(&(
            "switch".to_string(),
            metadata! { "from" => "b", "to" => "c" }
        )));
        assert_eq!(child.transition_names(), vec!["switch"]);
    }

    #[test]
    fn transitions_respects_metadata_filter() {
        let machine = Machine::<Value>::new();
        machine.state("a", |_| true);
        machine
            .scope(metadata! { "key" => "some" })
            .transition("go", Path::new("a", "b"), |r, _| Ok(r));
        machine.transition("go", Path::new("a", "c"), |r, _| Ok(r));

        // The scoped guard only resolves once a scoped "a" exists.
        assert_eq!(machine.transitions(&json!({}), &Metadata::new()).len(), 1);
        assert!(machine
            .transitions(&json!({}), &metadata! { "key" => "some" })
            .is_empty());

        machine.scope(metadata! { "key" => "some" }).state("a", |_| true);
        assert_eq!(machine.transitions(&json!({}), &Metadata::new()).len(), 2);
        assert_eq!(
            machine
                .transitions(&json!({}), &metadata! { "key" => "some" })
                .len(),
            1
        );
    }

    #[test]
    fn transition_without_matching_metadata_is_unavailable() {
        let machine = Machine::<Value>::new();
        machine
            .state("a", |r| r.get("some_key2").is_some())
            .transition("test2", Path::new("a", "b"), |r, _| Ok(r));

        let record = json!({ "some_key2": 1 });
        assert!(machine.can_transition("test2", &record));
        assert!(!machine.can_transition_in("test2", &record, &metadata! { "key" => "some" }));
    }

    #[test]
    fn safe_call_is_a_no_op_when_inapplicable() {
        let machine = Machine::<Value>::new();
        machine.transition("test", Path::new("a", "b"), |_, _| {
            Err(TransitionError::action("must not run"))
        });
        let record = json!({ "some": "test_object" });

        assert_eq!(machine.safe_call("test", &record).unwrap(), record);
        assert_eq!(machine.safe_call("missing", &record).unwrap(), record);
    }

    #[test]
    fn states_reports_every_holding_state() {
        let machine = Machine::<Value>::new();
        machine
            .state("a", |r| r.get("a").is_some())
            .state("b", |r| r.get("b").is_some())
            .state_with_resolver("a_or_b", |r, s| {
                s.evaluate("a", r, &Metadata::new()) || s.evaluate("b", r, &Metadata::new())
            });

        assert_eq!(machine.states(&json!({ "b": 1 })), vec!["b", "a_or_b"]);
    }

    #[test]
    fn null_filter_selects_unscoped_states() {
        let machine = Machine::<Value>::new();
        machine.state("a", |_| true);

        assert!(machine.is_state_in("a", &json!({}), &metadata! { "k" => Value::Null }));
        assert!(!machine.is_state_in("a", &json!({}), &metadata! { "k" => "v" }));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn machine_is_shareable_across_threads() {
        assert_send_sync::<Machine<Value>>();

        let machine = Arc::new(Machine::<Value>::new());
        machine
            .state("in_dock", flag("docked"))
            .state("on_water", |r| r["docked"] != json!(true))
            .transition("undock", Path::new("in_dock", "on_water"), |mut r, _| {
                r["docked"] = json!(false);
                Ok(r)
            });
        let docked = json!({ "docked": true });

        std::thread::scope(|s| {
            for _ in 0..8 {
                let machine = Arc::clone(&machine);
                let docked = &docked;
                s.spawn(move || {
                    for _ in 0..1000 {
                        let afloat = machine.call("undock", docked).unwrap();
                        assert!(machine.is_state("on_water", &afloat));
                        assert_eq!(machine.safe_call("undock", &afloat).unwrap(), afloat);
                    }
                });
            }
        });

        assert_eq!(docked, json!({ "docked": true }));
    }
}
