use super::error::ResolutionError;
use super::plan::{ExecutionPlan, PlanStep, StepKind};
use crate::graph::{Graph, NodeId};
use log::debug;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Resolves the minimal execution plan for `requested` outputs.
///
/// Performs a depth-first search from each requested name (in request order)
/// over the node's `dependency_names`, then over its validators'
/// `dependencies()`. The post-order of that search is the plan: every
/// dependency appears before its consumer, and ties are broken by first
/// discovery, so identical inputs always yield the same plan.
///
/// A name for which `is_override` returns true is a leaf. The search never
/// descends into a same-named node, so its computation, its validators and its
/// dependency chain are all skipped.
///
/// Both failure modes (unresolved names and cycles) are detected here, before
/// anything is executed.
pub fn resolve<S, F>(
    graph: &Graph,
    requested: &[S],
    is_override: F,
) -> Result<ExecutionPlan, ResolutionError>
where
    S: AsRef<str>,
    F: Fn(&str) -> bool,
{
    if requested.is_empty() {
        return Err(ResolutionError::NoOutputsRequested);
    }

    let mut resolver = Resolver {
        graph,
        is_override,
        state: HashMap::new(),
        path: Vec::new(),
        steps: Vec::new(),
    };
    for name in requested {
        resolver.visit(name.as_ref())?;
    }

    let plan = ExecutionPlan::from_steps(resolver.steps);
    debug!("Resolved plan: [{}]", plan.names().collect::<Vec<_>>().join(", "));
    Ok(plan)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting, // Used for cycle detection
    Visited(usize),
}

struct Resolver<'g, F> {
    graph: &'g Graph,
    is_override: F,
    state: HashMap<String, VisitState>,
    /// Names currently on the DFS stack, to report the cycle itself.
    path: Vec<String>,
    steps: Vec<PlanStep>,
}

/// A node whose inputs are still being visited.
struct Frame {
    name: String,
    id: NodeId,
    /// Node inputs first, then what its validators need.
    deps: Vec<String>,
    next: usize,
    waits_on: SmallVec<[usize; 4]>,
}

impl Frame {
    fn wait_on(&mut self, idx: usize) {
        if !self.waits_on.contains(&idx) {
            self.waits_on.push(idx);
        }
    }
}

enum Entered {
    Bound(usize),
    Pending(Frame),
}

impl<'g, F: Fn(&str) -> bool> Resolver<'g, F> {
    /// Plans `name` and everything it needs.
    ///
    /// Iterative, so the depth of a dependency chain is bounded by the heap
    /// rather than the thread stack.
    fn visit(&mut self, name: &str) -> Result<(), ResolutionError> {
        let mut stack = match self.enter(name, None)? {
            Entered::Bound(_) => return Ok(()),
            Entered::Pending(frame) => vec![frame],
        };

        while let Some(top) = stack.last_mut() {
            if let Some(dep) = top.deps.get(top.next).cloned() {
                top.next += 1;
                let required_by = top.name.clone();
                match self.enter(&dep, Some(&required_by))? {
                    Entered::Bound(idx) => {
                        if let Some(top) = stack.last_mut() {
                            top.wait_on(idx);
                        }
                    }
                    Entered::Pending(frame) => stack.push(frame),
                }
                continue;
            }

            // Every input is planned, so the node itself goes next (post-order).
            if let Some(frame) = stack.pop() {
                self.path.pop();
                let idx = self.push(&frame.name, StepKind::Compute(frame.id), frame.waits_on);
                if let Some(parent) = stack.last_mut() {
                    parent.wait_on(idx);
                }
            }
        }
        Ok(())
    }

    /// Binds `name` immediately if it is already planned or overridden,
    /// otherwise marks it as being visited and returns its frame.
    fn enter(&mut self, name: &str, required_by: Option<&str>) -> Result<Entered, ResolutionError> {
        match self.state.get(name) {
            Some(VisitState::Visited(idx)) => return Ok(Entered::Bound(*idx)),
            Some(VisitState::Visiting) => {
                let start = self.path.iter().position(|n| n == name).unwrap_or(0);
                let mut cycle = self.path[start..].to_vec();
                cycle.push(name.to_string());
                return Err(ResolutionError::CyclicGraph { cycle });
            }
            None => {}
        }

        if (self.is_override)(name) {
            return Ok(Entered::Bound(self.push(name, StepKind::Override, SmallVec::new())));
        }

        let graph = self.graph;
        let id = graph.id_of(name).ok_or_else(|| ResolutionError::UnresolvedDependency {
            name: name.to_string(),
            required_by: required_by.map(str::to_string),
        })?;
        let node = graph.node(id);

        self.state.insert(name.to_string(), VisitState::Visiting);
        self.path.push(name.to_string());

        let mut deps = node.dependency_names().to_vec();
        deps.extend(node.validator_dependency_names());
        Ok(Entered::Pending(Frame {
            name: name.to_string(),
            id,
            deps,
            next: 0,
            waits_on: SmallVec::new(),
        }))
    }

    fn push(&mut self, name: &str, kind: StepKind, waits_on: SmallVec<[usize; 4]>) -> usize {
        let idx = self.steps.len();
        self.steps.push(PlanStep { name: name.to_string(), kind, waits_on });
        self.state.insert(name.to_string(), VisitState::Visited(idx));
        idx
    }
}
