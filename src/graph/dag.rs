//! dag.rs
//! The immutable, name-indexed node graph built once from modules.

use super::edge::Edge;
use super::error::GraphError;
use super::module::Module;
use super::node::Node;
use log::debug;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// A stable identifier for a node within the graph.
///
/// This is a type alias for `petgraph::stable_graph::NodeIndex` to abstract the
/// underlying graph implementation.
pub type NodeId = NodeIndex;

/// The full collection of nodes.
///
/// Edges are materialized only where a declared dependency names another
/// node of the graph. Names that no node defines stay as plain strings on the
/// consuming node; whether they can be satisfied by an override is a
/// per-call question answered by the resolver.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) graph: StableDiGraph<Node, Edge>,
    index: HashMap<String, NodeId>,
}

impl Graph {
    /// Builds the graph from modules, in module order and then declaration order.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Result<Self, GraphError> {
        let mut dag = Self::default();
        for module in modules {
            for node in module.into_nodes() {
                dag.add_node(node)?;
            }
        }
        dag.link();
        debug!(
            "Built graph with {} nodes and {} edges",
            dag.graph.node_count(),
            dag.graph.edge_count()
        );
        Ok(dag)
    }

    fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.index.contains_key(node.name()) {
            return Err(GraphError::DuplicateNode { name: node.name().to_string() });
        }
        let name = node.name().to_string();
        let id = self.graph.add_node(node);
        self.index.insert(name, id);
        Ok(id)
    }

    /// Adds an edge for every declared dependency that names a node.
    /// Runs once, after all nodes are known, so declaration order across
    /// modules does not matter.
    fn link(&mut self) {
        let ids: Vec<NodeId> = self.graph.node_indices().collect();
        for child in ids {
            let node = &self.graph[child];
            let mut edges = Vec::new();
            for dep in node.dependency_names() {
                if let Some(&parent) = self.index.get(dep) {
                    edges.push((parent, Edge::Dependency));
                }
            }
            for dep in node.validator_dependency_names() {
                if let Some(&parent) = self.index.get(&dep) {
                    edges.push((parent, Edge::ValidatorDependency));
                }
            }
            for (parent, edge) in edges {
                self.graph.add_edge(parent, child, edge);
            }
        }
    }

    // --- Graph Queries ---

    /// All nodes the named node transitively depends on, in graph order.
    pub fn upstream_of(&self, name: &str) -> Result<Vec<&Node>, GraphError> {
        self.reachable_from(name, Direction::Incoming)
    }

    /// All nodes that transitively depend on the named node, in graph order.
    pub fn downstream_of(&self, name: &str) -> Result<Vec<&Node>, GraphError> {
        self.reachable_from(name, Direction::Outgoing)
    }

    fn reachable_from(&self, name: &str, direction: Direction) -> Result<Vec<&Node>, GraphError> {
        let start = self
            .id_of(name)
            .ok_or_else(|| GraphError::UnknownNode { name: name.to_string() })?;
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            if visited.insert(node) {
                for next in self.graph.neighbors_directed(node, direction) {
                    queue.push_back(next);
                }
            }
        }
        visited.remove(&start);

        let mut ids: Vec<NodeId> = visited.into_iter().collect();
        ids.sort();
        Ok(ids.into_iter().map(|id| &self.graph[id]).collect())
    }

    // --- Accessors ---
    pub fn id_of(&self, name: &str) -> Option<NodeId> { self.index.get(name).copied() }
    pub fn get(&self, name: &str) -> Option<&Node> { self.id_of(name).map(|id| &self.graph[id]) }
    pub fn contains(&self, name: &str) -> bool { self.index.contains_key(name) }
    pub fn node(&self, id: NodeId) -> &Node { &self.graph[id] }
    pub fn node_count(&self) -> usize { self.graph.node_count() }

    /// Nodes in graph-defined order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(move |id| &self.graph[id])
    }
}
