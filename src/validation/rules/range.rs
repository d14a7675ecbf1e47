//! Inclusive range checks for numeric scalars and numeric series.

use crate::graph::DataType;
use crate::validation::error::{InvalidImportanceError, ValidatorConfigError};
use crate::validation::validator::{DataValidator, Importance, ValidationResult};
use serde_json::{json, Value};
use std::fmt;

/// An inclusive `[min, max]` interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Result<Self, ValidatorConfigError> {
        if min > max {
            return Err(ValidatorConfigError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Parses `[min, max]`.
    pub fn from_value(value: &Value) -> Result<Self, ValidatorConfigError> {
        let invalid = |reason: &str| ValidatorConfigError::InvalidParameter {
            arg: "range".to_string(),
            reason: reason.to_string(),
        };
        let bounds = value.as_array().ok_or_else(|| invalid("expected a [min, max] array"))?;
        match bounds.as_slice() {
            [min, max] => {
                let min = min.as_f64().ok_or_else(|| invalid("min is not a number"))?;
                let max = max.as_f64().ok_or_else(|| invalid("max is not a number"))?;
                Self::new(min, max)
            }
            _ => Err(invalid("expected exactly two bounds")),
        }
    }

    #[inline]
    pub fn contains(&self, x: f64) -> bool {
        self.min <= x && x <= self.max
    }

    fn to_value(self) -> Value {
        json!([self.min, self.max])
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.min, self.max)
    }
}

/// Checks that a single numeric data point lies within a range.
#[derive(Debug, Clone)]
pub struct DataInRangeValidatorPrimitives {
    range: Range,
    importance: Importance,
}

impl DataInRangeValidatorPrimitives {
    pub fn new(range: Range, importance: &str) -> Result<Self, InvalidImportanceError> {
        Ok(Self { range, importance: importance.parse()? })
    }

    pub const fn arg() -> &'static str {
        "range"
    }

    pub fn applies_to_type(data_type: &DataType) -> bool {
        data_type.is_numeric()
    }
}

impl DataValidator for DataInRangeValidatorPrimitives {
    fn importance(&self) -> Importance {
        self.importance
    }

    fn applies_to(&self, data_type: &DataType) -> bool {
        Self::applies_to_type(data_type)
    }

    fn description(&self) -> String {
        format!("Validates that the datapoint falls within the range {}", self.range)
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let Some(x) = value.as_f64() else {
            return ValidationResult::fail(format!("Data point {} is not numeric", value))
                .with_diagnostic("range", self.range.to_value())
                .with_diagnostic("value", value.clone());
        };
        let result = if self.range.contains(x) {
            ValidationResult::pass(format!(
                "Data point {} falls within acceptable range: {}",
                value, self.range
            ))
        } else {
            ValidationResult::fail(format!(
                "Data point {} does not fall within acceptable range: {}",
                value, self.range
            ))
        };
        result
            .with_diagnostic("range", self.range.to_value())
            .with_diagnostic("value", value.clone())
    }
}

/// Checks that every element of a numeric series lies within a range.
#[derive(Debug, Clone)]
pub struct DataInRangeValidatorSeries {
    range: Range,
    importance: Importance,
}

impl DataInRangeValidatorSeries {
    pub fn new(range: Range, importance: &str) -> Result<Self, InvalidImportanceError> {
        Ok(Self { range, importance: importance.parse()? })
    }

    pub const fn arg() -> &'static str {
        "range"
    }

    pub fn applies_to_type(data_type: &DataType) -> bool {
        *data_type == DataType::Series
    }
}

impl DataValidator for DataInRangeValidatorSeries {
    fn importance(&self) -> Importance {
        self.importance
    }

    fn applies_to(&self, data_type: &DataType) -> bool {
        Self::applies_to_type(data_type)
    }

    fn description(&self) -> String {
        format!("Validates that every value of the series falls within the range {}", self.range)
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let Some(items) = value.as_array() else {
            return ValidationResult::fail(format!("Expected a series, got {}", value))
                .with_diagnostic("range", self.range.to_value());
        };
        // Non-numeric entries count as out of range.
        let in_range = items
            .iter()
            .filter(|item| item.as_f64().is_some_and(|x| self.range.contains(x)))
            .count();
        let out_range = items.len() - in_range;

        let message = format!(
            "Series contains {} values in range {}, and {} outside.",
            in_range, self.range, out_range
        );
        let result = if out_range == 0 {
            ValidationResult::pass(message)
        } else {
            ValidationResult::fail(message)
        };
        result
            .with_diagnostic("range", self.range.to_value())
            .with_diagnostic("in_range", in_range)
            .with_diagnostic("out_range", out_range)
            .with_diagnostic("data_size", items.len())
    }
}
