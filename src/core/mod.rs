//! Core storage for predicate-driven machines.
//!
//! This module contains the resolution primitives every registry builds on:
//! - [`Metadata`] scopes and [`CompositeKey`] registration identities
//! - [`Container`], a keyed store with ordered fallback parents
//!
//! Nothing here evaluates user callables; it only decides which stored
//! value a name resolves to.

mod container;
mod metadata;

pub use container::{Container, LinkRefusal};
pub use metadata::{CompositeKey, Metadata, FROM_KEY, TO_KEY};
