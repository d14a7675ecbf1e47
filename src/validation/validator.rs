//! The data-quality validator contract.
use super::error::InvalidImportanceError;
use crate::graph::{DataType, NodeInputs};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form diagnostic information attached to a validation result.
pub type Diagnostics = BTreeMap<String, Value>;

/// How a failed validation affects the execution that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Record the failure and keep executing.
    Warn,
    /// Abort the whole execution.
    Fail,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Warn => "warn",
            Importance::Fail => "fail",
        }
    }
}

impl FromStr for Importance {
    type Err = InvalidImportanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Importance::Warn),
            "fail" => Ok(Importance::Fail),
            _ => Err(InvalidImportanceError { value: s.to_string() }),
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one validator invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the value passed the check.
    pub passes: bool,
    /// Error or success message.
    pub message: String,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl ValidationResult {
    pub fn pass(message: impl Into<String>) -> Self {
        Self { passes: true, message: message.into(), diagnostics: Diagnostics::new() }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { passes: false, message: message.into(), diagnostics: Diagnostics::new() }
    }

    pub fn with_diagnostic(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.diagnostics.insert(key.into(), value.into());
        self
    }
}

/// A pluggable quality check attached to a node.
///
/// Implementors fix their `importance` when they are constructed; parsing an
/// importance from text goes through `Importance::from_str`, so an invalid
/// level can never reach execution.
pub trait DataValidator: Send + Sync {
    /// Whether a failure warns or aborts.
    fn importance(&self) -> Importance;

    /// Whether this validator can run against values of `data_type`.
    fn applies_to(&self, data_type: &DataType) -> bool;

    /// A human-readable description, e.g.
    /// `Checks whether the entire dataset lies between 0 and 1.`
    fn description(&self) -> String;

    /// Performs the validation.
    fn validate(&self, value: &Value) -> ValidationResult;

    /// Performs the validation with the bound values of `dependencies()`.
    /// Validators that compare against another node (e.g. the previous run's
    /// output) override this one.
    fn validate_with_dependencies(
        &self,
        value: &Value,
        _dependencies: &NodeInputs<'_>,
    ) -> ValidationResult {
        self.validate(value)
    }

    /// Configuration items this validator needs, usually passed at construction.
    fn required_config(&self) -> Vec<String> {
        Vec::new()
    }

    /// Names of nodes this validator needs beyond the node it is attached to.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}
