//! Configuration errors raised while linking phases

use crate::core::path::PathError;
use thiserror::Error;

/// A declaration could not be turned into a concrete model
///
/// Every variant is a configuration problem: none of them is retried and
/// all of them are reported before the affected phase is fitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error(transparent)]
    MalformedPath(#[from] PathError),

    #[error("phase '{phase}' has no estimate for '{path}'")]
    UnresolvedReference { phase: String, path: String },

    #[error("phase {step} cannot reference {target}: only earlier phases may be referenced")]
    ForwardReference { step: usize, target: String },

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("no result available for phase {0}")]
    MissingResult(usize),

    #[error("duplicate phase name '{0}'")]
    DuplicatePhase(String),

    #[error("'{0}' is reserved for the previous phase and cannot name a phase")]
    ReservedPhaseName(String),

    #[error("alignment of '{0}' forms a cycle")]
    CyclicAlignment(String),

    #[error("'{path}' is aligned to '{target}', which is not declared")]
    UnknownAlignmentTarget { path: String, target: String },

    #[error("'{path}' is aligned to '{target}', which resolved to absent")]
    ContradictoryAlignment { path: String, target: String },

    #[error("'{path}' passes the posterior of phase '{phase}', which reports no uncertainty")]
    MissingUncertainty { phase: String, path: String },

    #[error("invalid prior for '{path}': {reason}")]
    InvalidPrior { path: String, reason: String },
}

/// The error raised for a reference to a path a result does not hold
pub type UnresolvedReferenceError = LinkError;

impl LinkError {
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, LinkError::UnresolvedReference { .. })
    }
}
