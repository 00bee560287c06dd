//! Statewise: predicate-driven state machines
//!
//! States are not tags stored on a record. A state is a named predicate
//! evaluated against the record whenever it is asked for, and a transition
//! is a guarded transform selected by matching the record's current states
//! against declared `from`/`to` rules.
//!
//! # Core Concepts
//!
//! - **Container**: keyed store with ordered fallback parents
//! - **Metadata**: scopes that let several rule families share names
//! - **StateRegistry**: resolves and evaluates named predicates
//! - **TransitionRegistry**: resolves events to guarded transforms, with
//!   strict (`call`) and permissive (`safe_call`) dispatch
//! - **Machine**: a composition unit that can be composed from others
//!
//! The engine owns no records. Every call receives the caller's record by
//! reference and returns a fresh copy.
//!
//! # Example
//!
//! ```rust
//! use statewise::{metadata, Machine, Path};
//! use serde_json::{json, Value};
//!
//! let boat = Machine::<Value>::new();
//! boat.scope(metadata! { "key" => "base" })
//!     .state("on_water", |b| b["docked"] != json!(true))
//!     .state("in_dock", |b| b["docked"] == json!(true))
//!     .transition("undock", Path::new("in_dock", "on_water"), |mut b, _| {
//!         b["docked"] = json!(false);
//!         Ok(b)
//!     });
//!
//! let rowboat = Machine::composed_of(&[&boat]);
//! rowboat.state("oars_out", |b| b["oars"] == json!("out"));
//!
//! let record = rowboat.call("undock", &json!({ "docked": true })).unwrap();
//! assert!(rowboat.is_state_in("on_water", &record, &metadata! { "key" => "base" }));
//! assert_eq!(rowboat.safe_call("undock", &record).unwrap(), record);
//! ```

pub mod core;
pub mod machine;
pub mod registry;
pub mod validation;

// Re-export commonly used types
pub use crate::core::{CompositeKey, Container, Metadata};
pub use crate::machine::{Machine, Scope};
pub use crate::registry::{
    DefinitionError, Params, Path, StateRegistry, TransitionError, TransitionRegistry,
};
