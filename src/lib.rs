//! A dataflow execution engine.
//!
//! Named computations (`Node`s) are collected into `Module`s and built once
//! into an immutable `Graph`. Each request names the outputs it wants and may
//! override any name with a value; the resolver computes the minimal plan, and
//! the engine runs it, executing each node's data-quality validators inline.
//!
//! ```
//! use dataflow_core::{DataType, Driver, Module, Node};
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! let module = Module::new("simple").node(Node::identity("b", DataType::Integer, "a"));
//! let driver = Driver::new(HashMap::new(), [module]).unwrap();
//! let inputs = HashMap::from([("a".to_string(), json!(1))]);
//! let results = driver.raw_execute(&["b"], &inputs).unwrap();
//! assert_eq!(results["b"], json!(1));
//! ```

pub mod analysis;
pub mod computation;
pub mod config;
pub mod driver;
pub mod graph;
pub mod validation;

pub use analysis::{ExecutionPlan, ResolutionError};
pub use computation::{ExecutionError, ExecutionReport, ValidationWarning, WarningKind};
pub use config::ExecutionConfig;
pub use driver::{Driver, DriverError, VariableInfo};
pub use graph::{BoxError, DataType, Graph, GraphError, Module, Node, NodeInputs, Tags};
pub use validation::{DataValidator, Importance, InvalidImportanceError, ValidationResult};
