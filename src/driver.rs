//! The public entry point: builds the graph once and executes requests against it.

use crate::analysis::{self, ExecutionPlan};
use crate::computation::{ComputationEngine, ExecutionError, ExecutionReport, Overrides};
use crate::config::ExecutionConfig;
use crate::graph::{DataType, Graph, GraphError, Module, Node, Tags};
use log::{debug, error};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// A read-only view of a node, for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub name: String,
    pub tags: Tags,
    pub result_type: DataType,
}

impl From<&Node> for VariableInfo {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name().to_string(),
            tags: node.tags().clone(),
            result_type: node.result_type(),
        }
    }
}

/// Holds the graph, the default overrides and the worker pool.
///
/// The driver is immutable after construction, so one driver can serve
/// concurrent calls; each call keeps its own bound values.
pub struct Driver {
    graph: Graph,
    defaults: HashMap<String, Value>,
    config: ExecutionConfig,
    pool: Option<ThreadPool>,
}

impl Driver {
    /// Builds a driver with the default execution config.
    ///
    /// `initial_overrides` apply to every call unless the call supplies a
    /// value under the same name.
    pub fn new(
        initial_overrides: HashMap<String, Value>,
        modules: impl IntoIterator<Item = Module>,
    ) -> Result<Self, DriverError> {
        Self::with_config(initial_overrides, modules, ExecutionConfig::default())
    }

    pub fn with_config(
        initial_overrides: HashMap<String, Value>,
        modules: impl IntoIterator<Item = Module>,
        config: ExecutionConfig,
    ) -> Result<Self, DriverError> {
        let graph = Graph::from_modules(modules)?;
        let pool = if config.parallel {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.worker_count().unwrap_or(0))
                .thread_name(|i| format!("dataflow-worker-{}", i))
                .build()?;
            debug!("Worker pool ready with {} threads", pool.current_num_threads());
            Some(pool)
        } else {
            None
        };
        Ok(Self { graph, defaults: initial_overrides, config, pool })
    }

    /// Computes `outputs` and returns exactly those values.
    ///
    /// `inputs` override same-named nodes (and the driver's defaults) for this
    /// call only.
    pub fn raw_execute<S: AsRef<str>>(
        &self,
        outputs: &[S],
        inputs: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>, ExecutionError> {
        self.raw_execute_with_report(outputs, inputs).map(|report| report.outputs)
    }

    /// Like `raw_execute`, also returning the warnings recorded by `Warn`
    /// validators and the validators that did not apply.
    pub fn raw_execute_with_report<S: AsRef<str>>(
        &self,
        outputs: &[S],
        inputs: &HashMap<String, Value>,
    ) -> Result<ExecutionReport, ExecutionError> {
        let overrides = Overrides::new(inputs, &self.defaults);
        let plan = self.resolve(outputs, overrides)?;
        let engine = match &self.pool {
            Some(pool) => ComputationEngine::with_pool(&self.graph, pool),
            None => ComputationEngine::new(&self.graph),
        };
        engine.run(&plan, overrides, outputs)
    }

    /// Resolves a request without running anything. Returns the names of the
    /// plan's steps in execution order.
    pub fn execution_plan<S: AsRef<str>>(
        &self,
        outputs: &[S],
        inputs: &HashMap<String, Value>,
    ) -> Result<Vec<String>, ExecutionError> {
        let plan = self.resolve(outputs, Overrides::new(inputs, &self.defaults))?;
        Ok(plan.names().map(str::to_string).collect())
    }

    fn resolve<S: AsRef<str>>(
        &self,
        outputs: &[S],
        overrides: Overrides<'_>,
    ) -> Result<ExecutionPlan, ExecutionError> {
        let plan = analysis::resolve(&self.graph, outputs, |name| overrides.contains(name))
            .map_err(|e| {
                error!("{}", e);
                ExecutionError::from(e)
            })?;
        for name in overrides.names().filter(|n| plan.position(n).is_none()) {
            debug!("Override '{}' is not needed for this request", name);
        }
        Ok(plan)
    }

    /// One entry per node, in graph order. Runs nothing.
    pub fn list_available_variables(&self) -> Vec<VariableInfo> {
        self.graph.nodes().map(VariableInfo::from).collect()
    }

    /// Nodes the named node transitively depends on.
    pub fn upstream_of(&self, name: &str) -> Result<Vec<VariableInfo>, GraphError> {
        Ok(self.graph.upstream_of(name)?.into_iter().map(VariableInfo::from).collect())
    }

    /// Nodes that transitively depend on the named node.
    pub fn downstream_of(&self, name: &str) -> Result<Vec<VariableInfo>, GraphError> {
        Ok(self.graph.downstream_of(name)?.into_iter().map(VariableInfo::from).collect())
    }

    pub fn graph(&self) -> &Graph { &self.graph }
    pub fn config(&self) -> &ExecutionConfig { &self.config }
}
