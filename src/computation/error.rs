//! Defines the errors that abort a call.
use crate::analysis::ResolutionError;
use crate::graph::BoxError;
use crate::validation::Diagnostics;
use thiserror::Error;

/// The single fatal cause of a failed call. No partial results accompany it.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The request could not be turned into a plan; nothing ran.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// A `Fail`-importance validator rejected a node's value.
    #[error("Validation failed for node '{node}' ({validator}): {message}")]
    ValidationFailure {
        node: String,
        validator: String,
        message: String,
        diagnostics: Diagnostics,
    },
    /// A node computation returned an error.
    #[error("Computation of node '{node}' failed: {source}")]
    Compute {
        node: String,
        #[source]
        source: BoxError,
    },
    #[error("Structural mismatch: {msg}")]
    Mismatch { msg: String },
}

impl ExecutionError {
    /// The node the error is attributed to, if any.
    pub fn node(&self) -> Option<&str> {
        match self {
            ExecutionError::Resolution(ResolutionError::UnresolvedDependency {
                required_by, ..
            }) => required_by.as_deref(),
            ExecutionError::ValidationFailure { node, .. }
            | ExecutionError::Compute { node, .. } => Some(node),
            _ => None,
        }
    }
}
