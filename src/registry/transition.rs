//! Guarded record transforms selected by event name.

use crate::core::{CompositeKey, Container, Metadata, FROM_KEY, TO_KEY};
use crate::registry::error::{DefinitionError, TransitionError};
use crate::registry::state::StateRegistry;
use serde_json::Value;
use std::sync::Arc;

/// Extra call-time parameters forwarded to a transform.
pub type Params = serde_json::Map<String, Value>;

/// Transform of the record only.
pub type PlainTransform<R> = Box<dyn Fn(R, &Params) -> Result<R, TransitionError> + Send + Sync>;

/// Transform that also receives the registry it was dispatched through, so
/// it can evaluate states or call other transitions.
pub type ResolvingTransform<R> =
    Box<dyn Fn(R, &TransitionRegistry<R>, &Params) -> Result<R, TransitionError> + Send + Sync>;

/// A registered transition body.
pub enum Transform<R> {
    Plain(PlainTransform<R>),
    Resolving(ResolvingTransform<R>),
}

impl<R> Transform<R> {
    pub fn plain<F>(transform: F) -> Self
    where
        F: Fn(R, &Params) -> Result<R, TransitionError> + Send + Sync + 'static,
    {
        Self::Plain(Box::new(transform))
    }

    pub fn resolving<F>(transform: F) -> Self
    where
        F: Fn(R, &TransitionRegistry<R>, &Params) -> Result<R, TransitionError>
            + Send
            + Sync
            + 'static,
    {
        Self::Resolving(Box::new(transform))
    }

    fn apply(
        &self,
        record: R,
        registry: &TransitionRegistry<R>,
        params: &Params,
    ) -> Result<R, TransitionError> {
        match self {
            Self::Plain(transform) => transform(record, params),
            Self::Resolving(transform) => transform(record, registry, params),
        }
    }
}

/// Source states and target state of a transition.
///
/// A transition may require several source states at once; its guard is
/// their conjunction, checked in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    from: Vec<String>,
    to: String,
}

impl Path {
    /// Transition from one state to another.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: vec![from.into()],
            to: to.into(),
        }
    }

    /// Transition requiring every state in `from` to hold.
    pub fn all<I, S>(from: I, to: impl Into<String>) -> Result<Self, DefinitionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let from: Vec<String> = from.into_iter().map(Into::into).collect();
        let to = to.into();
        if from.is_empty() {
            return Err(DefinitionError::EmptyGuard { to });
        }
        Ok(Self { from, to })
    }

    pub fn from_states(&self) -> &[String] {
        &self.from
    }

    pub fn to_state(&self) -> &str {
        &self.to
    }

    /// Merge this path into `metadata` under the reserved keys.
    ///
    /// A single source state is stored as a string, a conjunction as an array.
    fn stamp(&self, metadata: Metadata) -> Metadata {
        let from = match self.from.as_slice() {
            [single] => Value::String(single.clone()),
            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
        };
        metadata.with(FROM_KEY, from).with(TO_KEY, self.to.clone())
    }
}

/// Source state names recorded in a transition key's metadata.
pub fn guard_states(key: &CompositeKey) -> Vec<String> {
    match key.metadata.get(FROM_KEY) {
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Target state name recorded in a transition key's metadata.
pub fn target_state(key: &CompositeKey) -> Option<&str> {
    key.metadata.get(TO_KEY).and_then(Value::as_str)
}

/// Registers and dispatches guarded transforms, backed by one [`Container`]
/// and the [`StateRegistry`] used to evaluate guards.
///
/// Dispatch resolves candidates with level shadowing: the nearest
/// composition level declaring any matching entry for an event hides every
/// ancestor entry for it, even when none of its guards hold.
pub struct TransitionRegistry<R> {
    container: Arc<Container<Transform<R>>>,
    states: StateRegistry<R>,
}

impl<R: Clone> TransitionRegistry<R> {
    /// Create a registry with no parents, guarded by `states`.
    pub fn new(states: StateRegistry<R>) -> Self {
        Self::from_container(Arc::new(Container::new()), states)
    }

    pub fn from_container(
        container: Arc<Container<Transform<R>>>,
        states: StateRegistry<R>,
    ) -> Self {
        Self { container, states }
    }

    /// The container backing this registry, for composition links.
    pub fn container(&self) -> &Arc<Container<Transform<R>>> {
        &self.container
    }

    /// The state registry guards are evaluated against.
    pub fn states(&self) -> &StateRegistry<R> {
        &self.states
    }

    /// Register one transition candidate for `event`.
    ///
    /// The path is stored in the key's metadata, so candidates sharing an
    /// event and metadata but differing in path coexist.
    pub fn define(
        &self,
        event: impl Into<String>,
        path: &Path,
        metadata: Metadata,
        transform: Transform<R>,
    ) {
        self.container.register(event, path.stamp(metadata), transform);
    }

    /// Candidate keys for `event` under `filter`, subject to level shadowing.
    pub fn candidates(&self, event: &str, filter: &Metadata) -> Vec<CompositeKey> {
        self.container.matching_keys(event, filter)
    }

    /// Whether every source state of `key` holds for `record`.
    ///
    /// Source states are evaluated under the candidate's own metadata with
    /// the reserved path keys removed.
    pub fn guard_holds(&self, key: &CompositeKey, record: &R) -> bool {
        let scope = key.metadata.without(&[FROM_KEY, TO_KEY]);
        guard_states(key)
            .iter()
            .all(|state| self.states.evaluate(state, record, &scope))
    }

    /// First candidate, in resolution order, whose guard holds.
    pub fn first_matching_candidate(
        &self,
        event: &str,
        record: &R,
        filter: &Metadata,
    ) -> Option<CompositeKey> {
        self.candidates(event, filter)
            .into_iter()
            .find(|key| self.guard_holds(key, record))
    }

    /// Whether `event` could be called on `record` right now.
    pub fn is_available(&self, event: &str, record: &R, filter: &Metadata) -> bool {
        self.first_matching_candidate(event, record, filter).is_some()
    }

    /// Dispatch `event` against a copy of `record`.
    ///
    /// Fails with [`TransitionError::UndeclaredEvent`] when no candidate
    /// exists and [`TransitionError::GuardNotSatisfied`] when no candidate's
    /// guard holds. Errors raised by the transform are returned unchanged.
    pub fn call(
        &self,
        event: &str,
        record: &R,
        filter: &Metadata,
        params: &Params,
    ) -> Result<R, TransitionError> {
        let key = self.resolve(event, record, filter)?;
        self.invoke(&key, record, params)
    }

    /// Dispatch `event`, returning a copy of `record` unchanged when the
    /// event is undeclared or no guard holds.
    ///
    /// Only an error raised by a matched transform is returned.
    pub fn safe_call(
        &self,
        event: &str,
        record: &R,
        filter: &Metadata,
        params: &Params,
    ) -> Result<R, TransitionError> {
        match self.resolve(event, record, filter) {
            Ok(key) => self.invoke(&key, record, params),
            Err(err) => {
                tracing::debug!(event, %filter, reason = %err, "safe call left record unchanged");
                Ok(record.clone())
            }
        }
    }

    /// Every declared transition, across all levels and without shadowing,
    /// whose metadata covers `filter` and whose guard holds for `record`.
    pub fn available_transitions(&self, record: &R, filter: &Metadata) -> Vec<CompositeKey> {
        self.container
            .all_keys()
            .into_iter()
            .filter(|key| key.metadata.covers(filter) && self.guard_holds(key, record))
            .collect()
    }

    /// Every declared event name, deduplicated, in first-declared order.
    pub fn declared_events(&self) -> Vec<String> {
        self.container.names()
    }

    fn resolve(
        &self,
        event: &str,
        record: &R,
        filter: &Metadata,
    ) -> Result<CompositeKey, TransitionError> {
        let candidates = self.candidates(event, filter);
        if candidates.is_empty() {
            tracing::debug!(event, %filter, "transition not declared");
            return Err(TransitionError::UndeclaredEvent {
                event: event.to_string(),
                metadata: filter.clone(),
            });
        }
        match self.first_matching_candidate(event, record, filter) {
            Some(key) => {
                tracing::debug!(event, candidate = %key.metadata, "transition matched");
                Ok(key)
            }
            None => {
                tracing::debug!(
                    event,
                    %filter,
                    candidates = candidates.len(),
                    "no guard satisfied"
                );
                Err(TransitionError::GuardNotSatisfied {
                    event: event.to_string(),
                    metadata: filter.clone(),
                })
            }
        }
    }

    fn invoke(
        &self,
        key: &CompositeKey,
        record: &R,
        params: &Params,
    ) -> Result<R, TransitionError> {
        // Candidates come from the same chain, so the key always resolves.
        let transform = self
            .container
            .get_by_key(key)
            .ok_or_else(|| TransitionError::UndeclaredEvent {
                event: key.name.clone(),
                metadata: key.metadata.clone(),
            })?;
        transform.apply(record.clone(), self, params)
    }
}

impl<R> Clone for TransitionRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            container: Arc::clone(&self.container),
            states: self.states.clone(),
        }
    }
}
