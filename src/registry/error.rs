//! Errors raised while defining machines and dispatching transitions.

use crate::core::Metadata;
use thiserror::Error;

/// Boxed error raised by a user-supplied transform.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when calling a transition.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// No entry for the event exists anywhere in the fallback chain.
    #[error("No transition '{event}' declared for metadata {metadata}")]
    UndeclaredEvent { event: String, metadata: Metadata },

    /// Candidates exist but none of their guards hold for the record.
    #[error("No guard of transition '{event}' holds for metadata {metadata}")]
    GuardNotSatisfied { event: String, metadata: Metadata },

    /// The transform itself failed; the inner error is returned as raised.
    #[error("Transition action failed: {0}")]
    Action(#[source] ActionError),
}

impl TransitionError {
    /// Wrap an error raised inside a transform.
    pub fn action(error: impl Into<ActionError>) -> Self {
        Self::Action(error.into())
    }

    /// Whether this is a dispatch failure that `safe_call` downgrades to a no-op.
    pub fn is_inapplicable(&self) -> bool {
        matches!(
            self,
            Self::UndeclaredEvent { .. } | Self::GuardNotSatisfied { .. }
        )
    }
}

/// Errors that can occur while assembling a machine definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionError {
    #[error("Linking this parent would make the composition cyclic")]
    CyclicComposition,

    #[error("Transition to '{to}' requires at least one source state")]
    EmptyGuard { to: String },
}
