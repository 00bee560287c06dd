//! Explicit metadata scopes for declarations.

use crate::core::Metadata;
use crate::machine::unit::Machine;
use crate::registry::{
    Params, Path, Predicate, StateRegistry, Transform, TransitionError, TransitionRegistry,
};

/// Registration handle that tags every declaration with fixed metadata.
///
/// Several rule families can live side by side in one machine, each
/// declared through its own scope and selected at call time by passing
/// matching metadata.
///
/// # Example
///
/// ```rust
/// use statewise::{metadata, Machine};
/// use serde_json::{json, Value};
///
/// let machine = Machine::<Value>::new();
/// machine
///     .scope(metadata! { "key" => "paddleboat" })
///     .state("ready", |b| b["paddles"] == json!("on water"));
/// machine
///     .scope(metadata! { "key" => "sailboat" })
///     .state("ready", |b| b["sail"] == json!("ready"));
///
/// let boat = json!({ "sail": "ready" });
/// assert!(machine.is_state_in("ready", &boat, &metadata! { "key" => "sailboat" }));
/// assert!(!machine.is_state_in("ready", &boat, &metadata! { "key" => "paddleboat" }));
/// ```
pub struct Scope<'a, R> {
    machine: &'a Machine<R>,
    metadata: Metadata,
}

impl<'a, R: Clone + 'static> Scope<'a, R> {
    pub(crate) fn new(machine: &'a Machine<R>, metadata: Metadata) -> Self {
        Self { machine, metadata }
    }

    /// Metadata attached to every declaration made through this scope.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Narrow this scope; entries in `extra` override the current ones.
    pub fn refine(&self, extra: &Metadata) -> Scope<'a, R> {
        Scope::new(self.machine, self.metadata.merged(extra))
    }

    pub fn state<F>(&self, name: &str, predicate: F) -> &Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.machine.state_registry().define(
            name,
            self.metadata.clone(),
            Predicate::plain(predicate),
        );
        self
    }

    pub fn state_with_resolver<F>(&self, name: &str, predicate: F) -> &Self
    where
        F: Fn(&R, &StateRegistry<R>) -> bool + Send + Sync + 'static,
    {
        self.machine.state_registry().define(
            name,
            self.metadata.clone(),
            Predicate::resolving(predicate),
        );
        self
    }

    pub fn transition<F>(&self, event: &str, path: Path, transform: F) -> &Self
    where
        F: Fn(R, &Params) -> Result<R, TransitionError> + Send + Sync + 'static,
    {
        self.machine.transition_registry().define(
            event,
            &path,
            self.metadata.clone(),
            Transform::plain(transform),
        );
        self
    }

    pub fn transition_with_resolver<F>(&self, event: &str, path: Path, transform: F) -> &Self
    where
        F: Fn(R, &TransitionRegistry<R>, &Params) -> Result<R, TransitionError>
            + Send
            + Sync
            + 'static,
    {
        self.machine.transition_registry().define(
            event,
            &path,
            self.metadata.clone(),
            Transform::resolving(transform),
        );
        self
    }
}
