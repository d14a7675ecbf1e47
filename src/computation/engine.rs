//! Executes a resolved plan, running validators inline.
use crate::analysis::{ExecutionPlan, StepKind};
use crate::computation::error::ExecutionError;
use crate::computation::ledger::{
    ExecutionReport, Ledger, Overrides, ValidationWarning, WarningKind,
};
use crate::graph::{Graph, Node, NodeInputs};
use crate::validation::{Diagnostics, Importance};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde_json::Value;
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a finished step hands back to be bound.
struct StepOutput<'o> {
    value: Cow<'o, Value>,
    warnings: Vec<ValidationWarning>,
}

/// `Ok(None)` means the step never started because an earlier step failed.
type StepOutcome<'o> = Result<Option<StepOutput<'o>>, ExecutionError>;

/// Runs plans against one graph.
///
/// Without a pool, steps run strictly in plan order on the calling thread.
/// With a pool, the plan is executed wave by wave and the steps of a wave run
/// concurrently on the pool. A step's value is bound (and so becomes visible to
/// later waves) only once the whole wave has finished and its `Fail`
/// validators have passed.
pub struct ComputationEngine<'a> {
    graph: &'a Graph,
    pool: Option<&'a ThreadPool>,
}

impl<'a> ComputationEngine<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph, pool: None }
    }

    pub fn with_pool(graph: &'a Graph, pool: &'a ThreadPool) -> Self {
        Self { graph, pool: Some(pool) }
    }

    /// Executes `plan` and returns exactly the `requested` outputs.
    ///
    /// Any fatal error drops every value bound so far.
    pub fn run<'o, S: AsRef<str>>(
        &self,
        plan: &ExecutionPlan,
        overrides: Overrides<'o>,
        requested: &[S],
    ) -> Result<ExecutionReport, ExecutionError> {
        info!("Executing {} steps for {} requested outputs", plan.len(), requested.len());
        let mut ledger = Ledger::with_steps(plan.len());
        // Lowest plan index that has failed so far.
        let first_failed = AtomicUsize::new(usize::MAX);

        match self.pool {
            Some(pool) => {
                for wave in plan.waves() {
                    let shared: &Ledger<'o> = &ledger;
                    let outcomes: Vec<StepOutcome<'o>> = pool.install(|| {
                        wave.par_iter()
                            .map(|&idx| self.run_step(plan, idx, overrides, shared, &first_failed))
                            .collect()
                    });
                    // Commit in plan order so the reported error and the
                    // warnings do not depend on thread timing.
                    for (&idx, outcome) in wave.iter().zip(outcomes) {
                        Self::commit(&mut ledger, idx, outcome)?;
                    }
                }
            }
            None => {
                for idx in 0..plan.len() {
                    let outcome = self.run_step(plan, idx, overrides, &ledger, &first_failed);
                    Self::commit(&mut ledger, idx, outcome)?;
                }
            }
        }

        Self::collect(plan, requested, ledger)
    }

    fn commit<'o>(
        ledger: &mut Ledger<'o>,
        idx: usize,
        outcome: StepOutcome<'o>,
    ) -> Result<(), ExecutionError> {
        if let Some(output) = outcome? {
            ledger.insert(idx, output.value);
            ledger.record(output.warnings);
        }
        Ok(())
    }

    fn run_step<'o>(
        &self,
        plan: &ExecutionPlan,
        idx: usize,
        overrides: Overrides<'o>,
        ledger: &Ledger<'o>,
        first_failed: &AtomicUsize,
    ) -> StepOutcome<'o> {
        // Steps before the lowest failure still run, so the error committed
        // first is always the earliest one in plan order.
        if idx > first_failed.load(Ordering::Acquire) {
            return Ok(None);
        }
        let outcome = self.execute_step(plan, idx, overrides, ledger);
        if let Err(e) = &outcome {
            error!("{}", e);
            first_failed.fetch_min(idx, Ordering::AcqRel);
        }
        outcome.map(Some)
    }

    fn execute_step<'o>(
        &self,
        plan: &ExecutionPlan,
        idx: usize,
        overrides: Overrides<'o>,
        ledger: &Ledger<'o>,
    ) -> Result<StepOutput<'o>, ExecutionError> {
        let step = &plan.steps()[idx];
        match step.kind {
            StepKind::Override => {
                let value = overrides.get(&step.name).ok_or_else(|| ExecutionError::Mismatch {
                    msg: format!("no override value for '{}'", step.name),
                })?;
                debug!("Binding override '{}'", step.name);
                Ok(StepOutput { value: Cow::Borrowed(value), warnings: Vec::new() })
            }
            StepKind::Compute(id) => {
                let node = self.graph.node(id);
                let names = node.dependency_names().iter().map(String::as_str);
                let inputs = Self::gather(plan, ledger, names)?;
                let value = panic::catch_unwind(AssertUnwindSafe(|| node.compute(&inputs)))
                    .unwrap_or_else(|payload| Err(panic_message(payload).into()))
                    .map_err(|source| ExecutionError::Compute {
                        node: node.name().to_string(),
                        source,
                    })?;
                let warnings = Self::validate(node, &value, plan, ledger)?;
                Ok(StepOutput { value: Cow::Owned(value), warnings })
            }
        }
    }

    /// Looks up the bound values of `names`, in order.
    fn gather<'l, I>(
        plan: &ExecutionPlan,
        ledger: &'l Ledger<'_>,
        names: I,
    ) -> Result<NodeInputs<'l>, ExecutionError>
    where
        I: IntoIterator<Item = &'l str>,
    {
        let mut inputs = NodeInputs::default();
        for name in names {
            let value = plan
                .position(name)
                .and_then(|idx| ledger.get(idx))
                .ok_or_else(|| ExecutionError::Mismatch {
                    msg: format!("'{}' is not bound yet", name),
                })?;
            inputs.push(name, value);
        }
        Ok(inputs)
    }

    /// Runs the node's validators in declaration order.
    fn validate(
        node: &Node,
        value: &Value,
        plan: &ExecutionPlan,
        ledger: &Ledger<'_>,
    ) -> Result<Vec<ValidationWarning>, ExecutionError> {
        let mut warnings = Vec::new();
        let result_type = node.result_type();

        for validator in node.validators() {
            let description = validator.description();
            if !validator.applies_to(&result_type) {
                debug!(
                    "Skipping validator '{}' on '{}': not applicable to {}",
                    description,
                    node.name(),
                    result_type
                );
                warnings.push(ValidationWarning {
                    node: node.name().to_string(),
                    validator: description,
                    kind: WarningKind::Inapplicable,
                    message: format!("Validator does not apply to type '{}'", result_type),
                    diagnostics: Diagnostics::new(),
                });
                continue;
            }

            let dependency_names = validator.dependencies();
            let names = dependency_names.iter().map(String::as_str);
            let dependencies = Self::gather(plan, ledger, names)?;
            let result = validator.validate_with_dependencies(value, &dependencies);
            if result.passes {
                continue;
            }

            match validator.importance() {
                Importance::Warn => {
                    warn!(
                        "Validation of '{}' failed ({}): {}",
                        node.name(),
                        description,
                        result.message
                    );
                    warnings.push(ValidationWarning {
                        node: node.name().to_string(),
                        validator: description,
                        kind: WarningKind::Failed,
                        message: result.message,
                        diagnostics: result.diagnostics,
                    });
                }
                Importance::Fail => {
                    return Err(ExecutionError::ValidationFailure {
                        node: node.name().to_string(),
                        validator: description,
                        message: result.message,
                        diagnostics: result.diagnostics,
                    });
                }
            }
        }
        Ok(warnings)
    }

    fn collect<S: AsRef<str>>(
        plan: &ExecutionPlan,
        requested: &[S],
        mut ledger: Ledger<'_>,
    ) -> Result<ExecutionReport, ExecutionError> {
        let mut outputs = HashMap::with_capacity(requested.len());
        for name in requested {
            let name = name.as_ref();
            if outputs.contains_key(name) {
                continue;
            }
            let value = plan
                .position(name)
                .and_then(|idx| ledger.take(idx))
                .ok_or_else(|| ExecutionError::Mismatch {
                    msg: format!("requested output '{}' was never bound", name),
                })?;
            outputs.insert(name.to_string(), value);
        }
        Ok(ExecutionReport { outputs, warnings: ledger.into_warnings() })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolve;
    use crate::graph::{BoxError, DataType, Module};
    use crate::validation::{DataValidator, ValidationResult};
    use rstest::rstest;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct Positive(Importance);

    impl DataValidator for Positive {
        fn importance(&self) -> Importance { self.0 }
        fn applies_to(&self, data_type: &DataType) -> bool { data_type.is_numeric() }
        fn description(&self) -> String { "Checks the value is positive".to_string() }
        fn validate(&self, value: &Value) -> ValidationResult {
            if value.as_f64().is_some_and(|x| x > 0.0) {
                ValidationResult::pass("positive")
            } else {
                ValidationResult::fail(format!("{} is not positive", value))
                    .with_diagnostic("value", value.clone())
            }
        }
    }

    fn counted(name: &str, deps: &[&str], counter: &Arc<AtomicUsize>, value: Value) -> Node {
        let counter = Arc::clone(counter);
        Node::new(name, DataType::Integer, deps.to_vec(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        })
    }

    fn sum(name: &str, deps: &[&str]) -> Node {
        Node::new(name, DataType::Integer, deps.to_vec(), |inputs| {
            Ok(json!(inputs.values().filter_map(Value::as_i64).sum::<i64>()))
        })
    }

    fn pool() -> ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    fn execute(
        graph: &Graph,
        pool: Option<&ThreadPool>,
        requested: &[&str],
        call: &HashMap<String, Value>,
    ) -> Result<ExecutionReport, ExecutionError> {
        let defaults = HashMap::new();
        let overrides = Overrides::new(call, &defaults);
        let plan = resolve(graph, requested, |n| overrides.contains(n))?;
        let engine = match pool {
            Some(pool) => ComputationEngine::with_pool(graph, pool),
            None => ComputationEngine::new(graph),
        };
        engine.run(&plan, overrides, requested)
    }

    #[rstest]
    #[case::sequential(false)]
    #[case::parallel(true)]
    fn test_only_requested_outputs_are_returned(#[case] parallel: bool) {
        let graph = Graph::from_modules([Module::new("m")
            .node(sum("a", &[]))
            .node(Node::new("one", DataType::Integer, Vec::<String>::new(), |_| Ok(json!(1))))
            .node(sum("b", &["one", "one"]))
            .node(sum("c", &["b", "one"]))])
        .unwrap();
        let pool = pool();
        let pool = parallel.then_some(&pool);
        let report = execute(&graph, pool, &["c", "a"], &HashMap::new()).unwrap();

        let expected = HashMap::from([("c".to_string(), json!(3)), ("a".to_string(), json!(0))]);
        assert_eq!(report.outputs, expected);
        assert!(report.warnings.is_empty());
    }

    #[rstest]
    #[case::sequential(false)]
    #[case::parallel(true)]
    fn test_each_node_runs_once(#[case] parallel: bool) {
        let calls = Arc::new(AtomicUsize::new(0));
        let graph = Graph::from_modules([Module::new("m")
            .node(counted("root", &[], &calls, json!(2)))
            .node(sum("left", &["root"]))
            .node(sum("right", &["root"]))
            .node(sum("top", &["left", "right", "root"]))])
        .unwrap();
        let pool = pool();
        let pool = parallel.then_some(&pool);
        let report = execute(&graph, pool, &["top", "left"], &HashMap::new()).unwrap();

        assert_eq!(report.outputs["top"], json!(6));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_override_skips_computation_and_validators() {
        let calls = Arc::new(AtomicUsize::new(0));
        let graph = Graph::from_modules([Module::new("m")
            .node(counted("x", &[], &calls, json!(5)).with_validator(Positive(Importance::Fail)))
            .node(sum("y", &["x"]))])
        .unwrap();
        // A value the validator would reject is accepted as an override.
        let call = HashMap::from([("x".to_string(), json!(-1))]);
        let report = execute(&graph, None, &["y"], &call).unwrap();

        assert_eq!(report.outputs["y"], json!(-1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[case::sequential(false)]
    #[case::parallel(true)]
    fn test_fail_validator_stops_dependents(#[case] parallel: bool) {
        let downstream = Arc::new(AtomicUsize::new(0));
        let graph = Graph::from_modules([Module::new("m")
            .node(sum("bad", &[]).with_validator(Positive(Importance::Fail)))
            .node(counted("after", &["bad"], &downstream, json!(1)))
            .node(Node::new("fine", DataType::Integer, Vec::<String>::new(), |_| Ok(json!(1))))])
        .unwrap();
        let pool = pool();
        let pool = parallel.then_some(&pool);
        let err = execute(&graph, pool, &["fine", "after"], &HashMap::new()).unwrap_err();

        match err {
            ExecutionError::ValidationFailure { node, message, diagnostics, .. } => {
                assert_eq!(node, "bad");
                assert_eq!(message, "0 is not positive");
                assert_eq!(diagnostics["value"], json!(0));
            }
            other => panic!("Wrong error type: {}", other),
        }
        assert_eq!(downstream.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_warn_validator_records_and_continues() {
        let graph = Graph::from_modules([Module::new("m")
            .node(sum("zero", &[]).with_validator(Positive(Importance::Warn)))
            .node(sum("total", &["zero"]))])
        .unwrap();
        let report = execute(&graph, None, &["total"], &HashMap::new()).unwrap();

        assert_eq!(report.outputs["total"], json!(0));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].node, "zero");
        assert_eq!(report.warnings[0].kind, WarningKind::Failed);
    }

    #[test]
    fn test_inapplicable_validator_is_noted() {
        let graph = Graph::from_modules([Module::new("m").node(
            Node::new("name", DataType::Text, Vec::<String>::new(), |_| Ok(json!("x")))
                .with_validator(Positive(Importance::Fail)),
        )])
        .unwrap();
        let report = execute(&graph, None, &["name"], &HashMap::new()).unwrap();

        assert_eq!(report.outputs["name"], json!("x"));
        assert_eq!(report.warnings[0].kind, WarningKind::Inapplicable);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[rstest]
    #[case::sequential(false)]
    #[case::parallel(true)]
    fn test_compute_error_is_fatal(#[case] parallel: bool) {
        let graph = Graph::from_modules([Module::new("m")
            .node(failing("explodes"))
            .node(sum("ok", &[]))])
        .unwrap();
        let pool = pool();
        let pool = parallel.then_some(&pool);
        let err = execute(&graph, pool, &["ok", "explodes"], &HashMap::new()).unwrap_err();

        assert_eq!(err.node(), Some("explodes"));
        assert_eq!(err.to_string(), "Computation of node 'explodes' failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    fn failing(name: &str) -> Node {
        Node::new(name, DataType::Any, Vec::<String>::new(), |_| -> Result<Value, BoxError> {
            Err(Box::new(Boom))
        })
    }

    #[rstest]
    #[case::sequential(false)]
    #[case::parallel(true)]
    fn test_earliest_failure_in_plan_order_is_reported(#[case] parallel: bool) {
        // One wave; `s2` fails while `s0` still holds a worker, before `s1` starts.
        let slow = Node::new("s0", DataType::Integer, Vec::<String>::new(), |_| {
            std::thread::sleep(std::time::Duration::from_millis(300));
            Ok(json!(0))
        });
        let graph = Graph::from_modules([Module::new("m")
            .node(slow)
            .node(failing("s1"))
            .node(failing("s2"))
            .node(sum("s3", &[]))])
        .unwrap();
        let pool = pool();
        let pool = parallel.then_some(&pool);
        let requested = ["s0", "s1", "s2", "s3"];

        for _ in 0..3 {
            let err = execute(&graph, pool, &requested, &HashMap::new()).unwrap_err();
            assert_eq!(err.node(), Some("s1"));
        }
    }

    #[rstest]
    #[case::sequential(false)]
    #[case::parallel(true)]
    fn test_panicking_node_is_a_compute_error(#[case] parallel: bool) {
        let graph = Graph::from_modules([Module::new("m")
            .node(Node::new("panics", DataType::Any, Vec::<String>::new(), |_| panic!("bad input")))
            .node(sum("ok", &[]))])
        .unwrap();
        let pool = pool();
        let pool = parallel.then_some(&pool);
        let err = execute(&graph, pool, &["ok", "panics"], &HashMap::new()).unwrap_err();

        assert!(matches!(err, ExecutionError::Compute { .. }));
        assert_eq!(err.to_string(), "Computation of node 'panics' failed: panicked: bad input");
    }

    struct NotBelow(&'static str);

    impl DataValidator for NotBelow {
        fn importance(&self) -> Importance { Importance::Fail }
        fn applies_to(&self, _: &DataType) -> bool { true }
        fn description(&self) -> String { format!("Checks the value is not below {}", self.0) }
        fn validate(&self, _: &Value) -> ValidationResult { ValidationResult::pass("no reference") }
        fn validate_with_dependencies(
            &self,
            value: &Value,
            deps: &NodeInputs<'_>,
        ) -> ValidationResult {
            match (value.as_f64(), deps.get(self.0).and_then(Value::as_f64)) {
                (Some(v), Some(r)) if v < r => {
                    ValidationResult::fail(format!("{} dropped below {}", v, r))
                }
                _ => ValidationResult::pass("ok"),
            }
        }
        fn dependencies(&self) -> Vec<String> { vec![self.0.to_string()] }
    }

    #[test]
    fn test_validator_receives_its_dependencies() {
        let graph = Graph::from_modules([Module::new("m")
            .node(Node::new("revenue", DataType::Float, Vec::<String>::new(), |_| Ok(json!(90.0)))
                .with_validator(NotBelow("revenue_last_run")))])
        .unwrap();

        let call = HashMap::from([("revenue_last_run".to_string(), json!(80.0))]);
        assert!(execute(&graph, None, &["revenue"], &call).is_ok());

        let call = HashMap::from([("revenue_last_run".to_string(), json!(100.0))]);
        let err = execute(&graph, None, &["revenue"], &call).unwrap_err();
        match err {
            ExecutionError::ValidationFailure { message, .. } => {
                assert_eq!(message, "90 dropped below 100")
            }
            other => panic!("Wrong error type: {}", other),
        }
    }
}
