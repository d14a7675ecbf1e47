//! Turns a request (outputs + override names) into an execution plan.
pub mod error;
pub mod plan;
pub mod topology;

pub use error::ResolutionError;
pub use plan::{ExecutionPlan, PlanStep, StepKind};
pub use topology::resolve;
