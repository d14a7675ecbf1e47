//! Defines the error types raised while building or querying the graph.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node '{name}' is defined more than once")]
    DuplicateNode { name: String },
    #[error("Node '{name}' does not exist in the graph")]
    UnknownNode { name: String },
}
