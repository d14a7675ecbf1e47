//! Data-quality validators.
//!
//! A validator is attached to a node at build time and runs against the
//! node's value during execution. Its `Importance` alone decides whether a
//! failed check is recorded as a warning or aborts the call.

pub use self::error::{InvalidImportanceError, ValidatorConfigError};
pub use self::rules::{
    default_validator, DataInRangeValidatorPrimitives, DataInRangeValidatorSeries, Range,
};
pub use self::validator::{DataValidator, Diagnostics, Importance, ValidationResult};

mod error;
pub mod rules;
mod validator;
