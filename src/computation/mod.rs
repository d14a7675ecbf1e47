//! Executes resolved plans.
pub mod engine;
pub mod error;
pub mod ledger;

pub use engine::ComputationEngine;
pub use error::ExecutionError;
pub use ledger::{ExecutionReport, Ledger, Overrides, ValidationWarning, WarningKind};
