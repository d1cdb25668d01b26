use std::collections::{BTreeMap, BTreeSet};

use super::edge::Edge;
use super::node::Node;

/// Consolidated concept graph: nodes keyed by canonical id plus an edge list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: impl IntoIterator<Item = Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            edges,
        }
    }

    /// Insert a node, replacing any node with the same id.
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Append an edge. Referential integrity is checked at merge time.
    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in canonical id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Distinct neighbours of a node, ignoring edge direction.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let set: BTreeSet<&str> = self.edges.iter().filter_map(|e| e.other_end(id)).collect();
        set.into_iter().collect()
    }

    /// Number of incident edges (a self-loop counts twice).
    pub fn degree(&self, id: &str) -> usize {
        self.edges
            .iter()
            .map(|e| usize::from(e.source == id) + usize::from(e.target == id))
            .sum()
    }

    /// Remove edges whose endpoints are missing and return them.
    pub fn take_dangling_edges(&mut self) -> Vec<Edge> {
        let nodes = &self.nodes;
        let (kept, dropped): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| nodes.contains_key(&e.source) && nodes.contains_key(&e.target));
        self.edges = kept;
        dropped
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes.into_values().collect(), self.edges)
    }
}
