//! The execution plan produced by the resolver.

use crate::graph::NodeId;
use smallvec::SmallVec;
use std::collections::HashMap;

/// How a plan step obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Bound directly from the caller's overrides. No computation, no validators.
    Override,
    /// Computed by the node, then validated.
    Compute(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub name: String,
    pub kind: StepKind,
    /// Indices of earlier steps whose values must be bound before this one
    /// starts: the node's own inputs followed by its validators' inputs.
    pub waits_on: SmallVec<[usize; 4]>,
}

/// An ordered, minimal set of steps producing a requested set of outputs.
///
/// Every step appears after all the steps it waits on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    steps: Vec<PlanStep>,
    index: HashMap<String, usize>,
}

impl ExecutionPlan {
    pub(crate) fn from_steps(steps: Vec<PlanStep>) -> Self {
        let index = steps.iter().enumerate().map(|(i, s)| (s.name.clone(), i)).collect();
        Self { steps, index }
    }

    pub fn steps(&self) -> &[PlanStep] { &self.steps }
    pub fn len(&self) -> usize { self.steps.len() }
    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps.iter().map(|s| s.name.as_str())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Groups step indices into waves. Steps of one wave only wait on steps of
    /// earlier waves, so they may run concurrently. Within a wave, indices
    /// keep plan order.
    pub fn waves(&self) -> Vec<Vec<usize>> {
        let mut depth = vec![0usize; self.steps.len()];
        let mut waves: Vec<Vec<usize>> = Vec::new();

        for (i, step) in self.steps.iter().enumerate() {
            // Steps only wait on lower indices, so `depth` is final for them.
            let d = step.waits_on.iter().map(|&w| depth[w] + 1).max().unwrap_or(0);
            depth[i] = d;
            if waves.len() <= d {
                waves.resize_with(d + 1, Vec::new);
            }
            waves[d].push(i);
        }
        waves
    }
}
