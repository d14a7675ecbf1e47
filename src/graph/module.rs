//! A `Module` is the unit handed over by whatever layer discovers nodes.

use super::node::{Node, Tags};

/// A named, ordered collection of node definitions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    name: String,
    nodes: Vec<Node>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), nodes: Vec::new() }
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Declares several nodes together. Every node receives the same tags,
    /// replacing whatever it carried before.
    pub fn tagged(mut self, tags: Tags, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes.into_iter().map(|n| n.with_tags(tags.clone())));
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn nodes(&self) -> &[Node] { &self.nodes }

    pub(crate) fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

impl FromIterator<Node> for Module {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self { name: String::new(), nodes: iter.into_iter().collect() }
    }
}
