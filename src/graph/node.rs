//! Defines the `Node` and its associated types, representing a single
//! named computation in the dataflow graph.

use crate::validation::DataValidator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The error type a node computation may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Free-form metadata attached to a node (e.g. `{"owner": "risk"}`).
pub type Tags = BTreeMap<String, String>;

/// The callable behind a node. It receives the bound values of the node's
/// declared dependencies and produces the node's value.
pub type NodeFn = Arc<dyn Fn(&NodeInputs<'_>) -> Result<Value, BoxError> + Send + Sync>;

/// Describes the type of value a node produces.
///
/// Validators use this descriptor (through `DataValidator::applies_to`) to
/// decide whether they can run against a node at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    Text,
    /// An ordered, homogeneous collection of values (e.g. a column).
    Series,
    /// A keyed collection of values (e.g. a row or a small table).
    Record,
    /// No static guarantee about the produced value.
    Any,
}

impl DataType {
    /// `true` for scalar numeric types.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Text => "text",
            DataType::Series => "series",
            DataType::Record => "record",
            DataType::Any => "any",
        };
        f.write_str(s)
    }
}

/// Error returned by [`NodeInputs::require`] when a dependency is not bound.
#[derive(Debug, thiserror::Error)]
#[error("input '{0}' is not bound")]
pub struct MissingInput(pub String);

/// The already-bound values handed to a node computation or a validator,
/// in the order the names were declared.
#[derive(Debug, Default)]
pub struct NodeInputs<'a> {
    entries: SmallVec<[(&'a str, &'a Value); 4]>,
}

impl<'a> NodeInputs<'a> {
    pub(crate) fn push(&mut self, name: &'a str, value: &'a Value) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Like `get`, but usable with `?` inside a node computation.
    pub fn require(&self, name: &str) -> Result<&'a Value, MissingInput> {
        self.get(name).ok_or_else(|| MissingInput(name.to_string()))
    }

    /// Values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &'a Value> + '_ {
        self.entries.iter().map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named unit of computation.
///
/// A node is the "skeleton" of the dataflow. It declares what it needs and
/// how to compute its value, but never holds the value itself (bound values
/// live in the per-call `computation::Ledger`).
#[derive(Clone)]
pub struct Node {
    name: String,
    result_type: DataType,
    dependencies: Vec<String>,
    validators: Vec<Arc<dyn DataValidator>>,
    tags: Tags,
    compute: NodeFn,
}

impl Node {
    pub fn new<I, S, F>(
        name: impl Into<String>,
        result_type: DataType,
        dependencies: I,
        compute: F,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&NodeInputs<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            result_type,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            validators: Vec::new(),
            tags: Tags::new(),
            compute: Arc::new(compute),
        }
    }

    /// A node that forwards the value of a single dependency unchanged.
    pub fn identity(
        name: impl Into<String>,
        result_type: DataType,
        source: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let key = source.clone();
        Self::new(name, result_type, [source], move |inputs| Ok(inputs.require(&key)?.clone()))
    }

    pub fn with_validator(mut self, validator: impl DataValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn with_shared_validator(mut self, validator: Arc<dyn DataValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    // --- Accessors ---
    pub fn name(&self) -> &str { &self.name }
    pub fn result_type(&self) -> DataType { self.result_type }
    pub fn dependency_names(&self) -> &[String] { &self.dependencies }
    pub fn validators(&self) -> &[Arc<dyn DataValidator>] { &self.validators }
    pub fn tags(&self) -> &Tags { &self.tags }

    /// The union of every attached validator's `dependencies()`, in validator
    /// declaration order, without duplicates.
    pub fn validator_dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for validator in &self.validators {
            for dep in validator.dependencies() {
                if !names.contains(&dep) {
                    names.push(dep);
                }
            }
        }
        names
    }

    pub(crate) fn compute(&self, inputs: &NodeInputs<'_>) -> Result<Value, BoxError> {
        (self.compute)(inputs)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("result_type", &self.result_type)
            .field("dependencies", &self.dependencies)
            .field(
                "validators",
                &self.validators.iter().map(|v| v.description()).collect::<Vec<_>>(),
            )
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}
