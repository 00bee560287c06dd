//! Composition units and declaration scopes.
//!
//! A [`Machine`] is built once, either fresh or composed from existing
//! machines, and populated through its declaration methods or through a
//! [`Scope`] that tags declarations with metadata.

mod scope;
mod unit;

pub use scope::Scope;
pub use unit::Machine;
