//! State and transition registries.
//!
//! Each registry wraps one [`Container`](crate::core::Container):
//! - [`StateRegistry`] resolves a state name to its predicate and evaluates it
//! - [`TransitionRegistry`] resolves an event to its candidates, checks their
//!   guards through a `StateRegistry`, and applies the first match
//!
//! Callables never mutate registry state, so evaluation and dispatch only
//! take read locks once definitions are in place.

mod error;
mod state;
mod transition;

pub use error::{ActionError, DefinitionError, TransitionError};
pub use state::{PlainPredicate, Predicate, ResolvingPredicate, StateRegistry};
pub use transition::{
    guard_states, target_state, Params, Path, PlainTransform, ResolvingTransform, Transform,
    TransitionRegistry,
};
