//! Definition checks that report every problem at once.
//!
//! Dispatch treats an unresolvable guard state as "does not hold" and never
//! looks at target states, so typos in declarations only surface as
//! transitions that silently never fire. These checks walk every declared
//! transition and accumulate ALL findings with Stillwater's `Validation`
//! instead of stopping at the first one.
//!
//! # Example
//!
//! ```rust
//! use statewise::validation::{check_definitions, DefinitionIssue};
//! use statewise::{Machine, Path};
//! use serde_json::Value;
//! use stillwater::validation::Validation;
//!
//! let machine = Machine::<Value>::new();
//! machine
//!     .state("in_dock", |_| true)
//!     .transition("undock", Path::new("in_dock", "on_watr"), |b, _| Ok(b))
//!     .transition("sail", Path::new("on_water", "sailing"), |b, _| Ok(b));
//!
//! match check_definitions(&machine) {
//!     Validation::Failure(issues) => assert_eq!(issues.len(), 3),
//!     Validation::Success(_) => panic!("expected issues"),
//! }
//! ```

use crate::core::{CompositeKey, FROM_KEY, TO_KEY};
use crate::machine::Machine;
use crate::registry::{guard_states, target_state};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A problem found in a machine's declarations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionIssue {
    #[error("Transition '{event}' guards on state '{state}', which does not resolve under its metadata")]
    UnresolvedGuardState { event: String, state: String },

    #[error("Transition '{event}' targets state '{state}', which is never declared")]
    UndeclaredTargetState { event: String, state: String },
}

/// Result of checking a machine's declarations.
pub type DefinitionReport = Validation<(), NonEmptyVec<DefinitionIssue>>;

/// Check every declared transition of `machine`, across all composition
/// levels, accumulating every issue found.
///
/// Guard states must resolve through the machine's state registry under
/// the transition's own metadata, the same way dispatch evaluates them.
/// Target states only need to be declared somewhere, under any metadata.
pub fn check_definitions<R: Clone + 'static>(machine: &Machine<R>) -> DefinitionReport {
    let declared = machine.state_names();
    let mut checks: Vec<DefinitionReport> = Vec::new();

    for key in machine.transition_registry().container().all_keys() {
        checks.extend(check_guard_states(machine, &key));
        checks.push(check_target_state(&key, &declared));
    }

    let report = Validation::all_vec(checks).map(|_| ());
    if let Validation::Failure(issues) = &report {
        tracing::debug!(issues = issues.len(), "machine definitions have issues");
    }
    report
}

fn check_guard_states<R: Clone + 'static>(
    machine: &Machine<R>,
    key: &CompositeKey,
) -> Vec<DefinitionReport> {
    let scope = key.metadata.without(&[FROM_KEY, TO_KEY]);
    let states = machine.state_registry().container();
    guard_states(key)
        .into_iter()
        .map(|state| {
            if states.lookup(&state, &scope).is_some() {
                Validation::success(())
            } else {
                Validation::fail(DefinitionIssue::UnresolvedGuardState {
                    event: key.name.clone(),
                    state,
                })
            }
        })
        .collect()
}

fn check_target_state(key: &CompositeKey, declared: &[String]) -> DefinitionReport {
    match target_state(key) {
        Some(state) if !declared.iter().any(|name| name == state) => {
            Validation::fail(DefinitionIssue::UndeclaredTargetState {
                event: key.name.clone(),
                state: state.to_string(),
            })
        }
        _ => Validation::success(()),
    }
}
