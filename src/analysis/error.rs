//! Defines the errors detected while resolving a request into a plan.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Nothing to execute: no outputs were requested")]
    NoOutputsRequested,
    /// A traversed name is neither overridden nor defined by a node.
    #[error("Unresolved dependency '{name}'{}", required_by_suffix(.required_by))]
    UnresolvedDependency { name: String, required_by: Option<String> },
    /// `cycle` starts and ends with the same name.
    #[error("Cycle detected: {}", .cycle.join(" -> "))]
    CyclicGraph { cycle: Vec<String> },
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(node) => format!(" required by '{}'", node),
        None => String::new(),
    }
}
