//! Defines the error types for the validation module.
use crate::graph::DataType;
use thiserror::Error;

/// Raised when a validator is constructed with an importance level other
/// than `warn` or `fail`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Importance level must be one of: warn, fail (got '{value}')")]
pub struct InvalidImportanceError {
    pub value: String,
}

/// Errors raised while constructing a default validator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidatorConfigError {
    #[error(transparent)]
    InvalidImportance(#[from] InvalidImportanceError),
    #[error("No default validator is registered for arg '{arg}' and type '{data_type}'")]
    NoDefaultValidator { arg: String, data_type: DataType },
    #[error("Invalid range ({min}, {max}): min must not exceed max")]
    InvalidRange { min: f64, max: f64 },
    #[error("Invalid parameter for '{arg}': {reason}")]
    InvalidParameter { arg: String, reason: String },
}
