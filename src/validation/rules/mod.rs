//! Built-in validators and the lookup that picks one by argument name and
//! data type.
pub mod range;

pub use range::{DataInRangeValidatorPrimitives, DataInRangeValidatorSeries, Range};

use super::error::ValidatorConfigError;
use super::validator::{DataValidator, Importance};
use crate::graph::DataType;
use serde_json::Value;
use std::sync::Arc;

type Build = fn(&Value, Importance) -> Result<Arc<dyn DataValidator>, ValidatorConfigError>;

/// A registered default validator: the single argument it is configured
/// with, the types it applies to, and how to build it.
pub struct DefaultValidator {
    pub arg: &'static str,
    pub applies_to: fn(&DataType) -> bool,
    build: Build,
}

/// Candidates in resolution order.
pub static AVAILABLE_DEFAULT_VALIDATORS: &[DefaultValidator] = &[
    DefaultValidator {
        arg: DataInRangeValidatorSeries::arg(),
        applies_to: DataInRangeValidatorSeries::applies_to_type,
        build: |param, importance| {
            let range = Range::from_value(param)?;
            Ok(Arc::new(DataInRangeValidatorSeries::new(range, importance.as_str())?))
        },
    },
    DefaultValidator {
        arg: DataInRangeValidatorPrimitives::arg(),
        applies_to: DataInRangeValidatorPrimitives::applies_to_type,
        build: |param, importance| {
            let range = Range::from_value(param)?;
            Ok(Arc::new(DataInRangeValidatorPrimitives::new(range, importance.as_str())?))
        },
    },
];

/// Builds the first default validator whose `arg` matches and which applies
/// to `data_type`.
///
/// `importance` is parsed before anything else, so an invalid level fails
/// even when no candidate would match.
pub fn default_validator(
    arg: &str,
    data_type: DataType,
    param: &Value,
    importance: &str,
) -> Result<Arc<dyn DataValidator>, ValidatorConfigError> {
    let importance: Importance = importance.parse()?;
    let candidate = AVAILABLE_DEFAULT_VALIDATORS
        .iter()
        .find(|c| c.arg == arg && (c.applies_to)(&data_type))
        .ok_or_else(|| ValidatorConfigError::NoDefaultValidator {
            arg: arg.to_string(),
            data_type,
        })?;
    (candidate.build)(param, importance)
}
