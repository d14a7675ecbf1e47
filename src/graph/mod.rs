//! Defines the core data structures for the dataflow graph.
pub mod dag;
pub mod edge;
pub mod error;
pub mod module;
pub mod node;

// Re-export key types for convenient access
pub use dag::{Graph, NodeId};
pub use edge::Edge;
pub use error::GraphError;
pub use module::Module;
pub use node::{BoxError, DataType, MissingInput, Node, NodeFn, NodeInputs, Tags};
