use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::boundary::{admit, SizeBounds};
use super::combine::{combine_edges, combine_nodes};
use crate::config::MergeConfig;
use crate::extraction::canonical_id;
use crate::metrics;
use crate::model::{Edge, EdgeKey, Graph, Node, NodeType, PartialGraph, RelationType};

/// Repairs made while building the canonical graph. These are reported, never
/// raised: the offending element is dropped and the merge carries on.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    #[error("edge {from} -[{relationship_type}]-> {to} references missing nodes {missing:?}")]
    DanglingReference {
        from: String,
        to: String,
        relationship_type: RelationType,
        /// Every endpoint absent from the node set, source first.
        missing: Vec<String>,
    },

    #[error("node #{index} has neither a usable id nor a label")]
    UnidentifiedNode { index: usize },

    #[error("edge #{index} is missing its source or target")]
    MissingEndpoint { index: usize },

    #[error("self-loop on '{node}' dropped")]
    SelfLoop { node: String },
}

/// How a new batch is folded into a previously stored graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Keep everything already stored; add only unseen nodes and endpoint pairs.
    Append,
    /// Combine stored and new observations with the regular merge rules.
    #[default]
    Update,
    /// Drop the stored graph and keep only the batch.
    Replace,
}

impl MergeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeMode::Append => "append",
            MergeMode::Update => "update",
            MergeMode::Replace => "replace",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "append" => Ok(MergeMode::Append),
            "update" | "merge" => Ok(MergeMode::Update),
            "replace" => Ok(MergeMode::Replace),
            other => Err(format!("unknown merge mode: {}", other)),
        }
    }
}

/// Canonical graph plus everything that had to be repaired to build it.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub graph: Graph,
    pub warnings: Vec<StructuralWarning>,
}

impl MergeOutcome {
    /// Zero nodes survived; callers may substitute [`GraphMerger::fallback_graph`].
    pub fn is_degraded(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn dropped_edges(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, StructuralWarning::DanglingReference { .. }))
            .count()
    }
}

/// Reduces partial graphs into one canonical graph.
///
/// The reduction is pure and independent of input order: observations are
/// grouped by canonical key and each group is folded in sorted order.
#[derive(Debug, Clone)]
pub struct GraphMerger {
    bounds: SizeBounds,
}

impl Default for GraphMerger {
    fn default() -> Self {
        Self::new(&MergeConfig::default())
    }
}

impl GraphMerger {
    pub fn new(config: &MergeConfig) -> Self {
        Self {
            bounds: SizeBounds {
                min: config.min_node_size,
                max: config.max_node_size,
            },
        }
    }

    /// Merge already-canonical graphs. Merging a single graph returns it
    /// unchanged apart from canonical edge order.
    pub fn merge(&self, graphs: &[Graph]) -> MergeOutcome {
        let nodes = graphs.iter().flat_map(|g| g.nodes().cloned()).collect();
        let edges = graphs.iter().flat_map(|g| g.edges().iter().cloned()).collect();
        self.reduce(nodes, edges, Vec::new())
    }

    /// Validate loosely-typed partial graphs at the boundary, then merge.
    pub fn merge_partials<'a>(
        &self,
        partials: impl IntoIterator<Item = &'a PartialGraph>,
    ) -> MergeOutcome {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut warnings = Vec::new();
        for partial in partials {
            let admitted = admit(partial, self.bounds);
            nodes.extend(admitted.nodes);
            edges.extend(admitted.edges);
            warnings.extend(admitted.warnings);
        }
        self.reduce(nodes, edges, warnings)
    }

    /// Fold `batch` into `existing` according to `mode`.
    pub fn merge_into(&self, existing: &Graph, batch: &Graph, mode: MergeMode) -> MergeOutcome {
        debug!(
            %mode,
            existing_nodes = existing.node_count(),
            batch_nodes = batch.node_count(),
            "Merging batch into stored graph"
        );
        match mode {
            MergeMode::Replace => self.merge(std::slice::from_ref(batch)),
            MergeMode::Update => self.merge(&[existing.clone(), batch.clone()]),
            MergeMode::Append => self.append(existing, batch),
        }
    }

    fn append(&self, existing: &Graph, batch: &Graph) -> MergeOutcome {
        let labels: HashMap<String, &str> = existing
            .nodes()
            .map(|n| (canonical_id(&n.label), n.id.as_str()))
            .collect();

        // batch ids that name an already stored concept point at the stored node
        let mut aliases: HashMap<&str, &str> = HashMap::new();
        let mut nodes: Vec<Node> = existing.nodes().cloned().collect();
        for node in batch.nodes() {
            if existing.contains_node(&node.id) {
                continue;
            }
            match labels.get(&canonical_id(&node.label)) {
                Some(stored) => {
                    aliases.insert(node.id.as_str(), *stored);
                }
                None => nodes.push(node.clone()),
            }
        }

        let resolve = |id: &str| aliases.get(id).copied().unwrap_or(id).to_string();
        let pairs: BTreeSet<(String, String)> = existing
            .edges()
            .iter()
            .map(|e| {
                let key = e.key();
                (key.low, key.high)
            })
            .collect();

        let mut edges: Vec<Edge> = existing.edges().to_vec();
        for edge in batch.edges() {
            let mut edge = edge.clone();
            edge.source = resolve(&edge.source);
            edge.target = resolve(&edge.target);
            let key = edge.key();
            if !pairs.contains(&(key.low, key.high)) {
                edges.push(edge);
            }
        }

        self.reduce(nodes, edges, Vec::new())
    }

    fn reduce(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        mut warnings: Vec<StructuralWarning>,
    ) -> MergeOutcome {
        let started = Instant::now();
        let observed_nodes = nodes.len();
        let observed_edges = edges.len();

        let mut node_groups: BTreeMap<String, Vec<Node>> = BTreeMap::new();
        for node in nodes {
            node_groups.entry(node.id.clone()).or_default().push(node);
        }
        let mut edge_groups: BTreeMap<EdgeKey, Vec<Edge>> = BTreeMap::new();
        for edge in edges {
            edge_groups.entry(edge.key()).or_default().push(edge);
        }

        let mut graph = Graph::from_parts(
            node_groups.into_values().filter_map(combine_nodes),
            edge_groups.into_values().filter_map(combine_edges).collect(),
        );

        for edge in graph.take_dangling_edges() {
            let missing: Vec<String> = [&edge.source, &edge.target]
                .into_iter()
                .filter(|id| !graph.contains_node(id))
                .cloned()
                .collect();
            warn!(
                source = %edge.source,
                target = %edge.target,
                relation = %edge.relationship_type,
                missing = ?missing,
                "Dropping edge with dangling reference"
            );
            warnings.push(StructuralWarning::DanglingReference {
                from: edge.source,
                to: edge.target,
                relationship_type: edge.relationship_type,
                missing,
            });
        }

        let outcome = MergeOutcome { graph, warnings };
        metrics::record_merge(started.elapsed(), outcome.dropped_edges());
        info!(
            observed_nodes,
            observed_edges,
            nodes = outcome.graph.node_count(),
            edges = outcome.graph.edge_count(),
            warnings = outcome.warnings.len(),
            "Merge complete"
        );
        if outcome.is_degraded() {
            warn!("Merge produced an empty graph");
        }
        outcome
    }

    /// Small photosynthesis graph used when a merge yields nothing.
    pub fn fallback_graph() -> Graph {
        let nodes = [
            ("photosynthesis", "Photosynthesis", NodeType::Process, 50.0, "Conversion of light energy into chemical energy"),
            ("light", "Light", NodeType::Condition, 35.0, "Energy source driving the light reactions"),
            ("chlorophyll", "Chlorophyll", NodeType::Material, 40.0, "Pigment absorbing red and blue light"),
            ("carbon_dioxide", "Carbon dioxide", NodeType::Material, 30.0, "Carbon source fixed in the Calvin cycle"),
            ("water", "Water", NodeType::Material, 30.0, "Electron donor split at photosystem II"),
            ("glucose", "Glucose", NodeType::Material, 25.0, "Sugar produced by carbon fixation"),
            ("oxygen", "Oxygen", NodeType::Material, 25.0, "By-product released from water splitting"),
            ("stomata", "Stomata", NodeType::Concept, 20.0, "Leaf pores regulating gas exchange"),
        ]
        .into_iter()
        .map(|(id, label, kind, size, description)| {
            Node::new(id, label, kind)
                .with_size(size)
                .with_description(description)
        });

        let edges = [
            ("light", "photosynthesis", RelationType::Activates, 0.9),
            ("chlorophyll", "light", RelationType::BindsTo, 0.8),
            ("chlorophyll", "photosynthesis", RelationType::PartOf, 0.85),
            ("photosynthesis", "carbon_dioxide", RelationType::DependsOn, 0.9),
            ("photosynthesis", "water", RelationType::DependsOn, 0.9),
            ("photosynthesis", "glucose", RelationType::Causes, 0.9),
            ("photosynthesis", "oxygen", RelationType::Causes, 0.9),
            ("stomata", "carbon_dioxide", RelationType::Regulates, 0.8),
        ]
        .into_iter()
        .map(|(source, target, kind, confidence)| {
            Edge::new(source, target, kind).with_confidence(confidence)
        })
        .collect();

        Graph::from_parts(nodes, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawEdge, RawNode};

    fn node(id: &str) -> Node {
        Node::new(id, id, NodeType::Concept)
    }

    fn graph(ids: &[&str], edges: Vec<Edge>) -> Graph {
        Graph::from_parts(ids.iter().map(|id| node(id)), edges)
    }

    #[test]
    fn duplicate_edges_sum_weights() {
        let a = graph(&["a", "b"], vec![Edge::new("a", "b", RelationType::Causes).with_weight(3.0)]);
        let b = graph(&["a", "b"], vec![Edge::new("a", "b", RelationType::Causes).with_weight(2.0)]);
        let outcome = GraphMerger::default().merge(&[a, b]);
        assert_eq!(outcome.graph.edge_count(), 1);
        assert_eq!(outcome.graph.edges()[0].weight, 5.0);
    }

    #[test]
    fn reversed_edges_share_a_key() {
        let a = graph(&["a", "b"], vec![Edge::new("a", "b", RelationType::Causes)]);
        let b = graph(&["a", "b"], vec![Edge::new("b", "a", RelationType::Causes)]);
        let outcome = GraphMerger::default().merge(&[a, b]);
        assert_eq!(outcome.graph.edge_count(), 1);
    }

    #[test]
    fn dangling_edges_are_dropped_with_warning() {
        let g = graph(&["a"], vec![Edge::new("a", "ghost", RelationType::Causes)]);
        let outcome = GraphMerger::default().merge(&[g]);
        assert_eq!(outcome.graph.edge_count(), 0);
        assert_eq!(outcome.dropped_edges(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            StructuralWarning::DanglingReference { missing, .. } if missing == &["ghost"]
        ));
    }

    #[test]
    fn dangling_warning_names_both_missing_endpoints() {
        let g = graph(&["a"], vec![Edge::new("ghost", "phantom", RelationType::Causes)]);
        let outcome = GraphMerger::default().merge(&[g]);
        assert_eq!(outcome.dropped_edges(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            StructuralWarning::DanglingReference { missing, .. } if missing == &["ghost", "phantom"]
        ));
    }

    #[test]
    fn partials_resolve_edges_across_units() {
        let first = PartialGraph {
            nodes: vec![RawNode {
                label: Some("Light".into()),
                ..Default::default()
            }],
            edges: vec![RawEdge {
                source: Some("light".into()),
                target: Some("Photosynthesis".into()),
                relationship_type: Some("activates".into()),
                ..Default::default()
            }],
        };
        let second = PartialGraph {
            nodes: vec![RawNode {
                id: Some("p1".into()),
                label: Some("Photosynthesis".into()),
                ..Default::default()
            }],
            edges: Vec::new(),
        };
        let outcome = GraphMerger::default().merge_partials([&first, &second]);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.graph.edge_count(), 1);
        assert_eq!(outcome.graph.edges()[0].target, "photosynthesis");
    }

    #[test]
    fn empty_merge_is_degraded() {
        let outcome = GraphMerger::default().merge(&[]);
        assert!(outcome.is_degraded());
        assert!(!GraphMerger::fallback_graph().is_empty());
    }

    #[test]
    fn fallback_graph_is_consistent() {
        let fallback = GraphMerger::fallback_graph();
        let outcome = GraphMerger::default().merge(std::slice::from_ref(&fallback));
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.graph.node_count(), fallback.node_count());
        assert_eq!(outcome.graph.edge_count(), fallback.edge_count());
    }

    #[test]
    fn replace_discards_existing() {
        let existing = graph(&["a", "b"], vec![Edge::new("a", "b", RelationType::Causes)]);
        let batch = graph(&["c"], Vec::new());
        let outcome = GraphMerger::default().merge_into(&existing, &batch, MergeMode::Replace);
        assert_eq!(outcome.graph.node_ids().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(outcome.graph.edge_count(), 0);
    }

    #[test]
    fn update_combines_observations() {
        let existing = graph(&["a", "b"], vec![Edge::new("a", "b", RelationType::Causes).with_weight(1.0)]);
        let batch = graph(&["a", "b"], vec![Edge::new("a", "b", RelationType::Causes).with_weight(1.0)]);
        let outcome = GraphMerger::default().merge_into(&existing, &batch, MergeMode::Update);
        assert_eq!(outcome.graph.edges()[0].weight, 2.0);
    }

    #[test]
    fn append_only_adds_unseen_elements() {
        let existing = Graph::from_parts(
            vec![
                Node::new("leaf", "Leaf", NodeType::Concept).with_size(20.0),
                node("root"),
            ],
            vec![Edge::new("leaf", "root", RelationType::Causes).with_weight(1.0)],
        );
        let batch = Graph::from_parts(
            vec![
                Node::new("leaf", "Leaf", NodeType::Concept).with_size(45.0),
                Node::new("leaf_2", "LEAF", NodeType::Concept),
                node("stem"),
            ],
            vec![
                Edge::new("root", "leaf", RelationType::PartOf),
                Edge::new("leaf_2", "stem", RelationType::PartOf),
            ],
        );

        let outcome = GraphMerger::default().merge_into(&existing, &batch, MergeMode::Append);
        let g = &outcome.graph;
        assert_eq!(g.node_ids().collect::<Vec<_>>(), vec!["leaf", "root", "stem"]);
        assert_eq!(g.node("leaf").unwrap().size, 20.0);
        assert_eq!(g.edge_count(), 2);
        assert!(g
            .edges()
            .iter()
            .any(|e| e.key() == EdgeKey::new("leaf", "stem", RelationType::PartOf)));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn merge_mode_parses() {
        assert_eq!("Append".parse::<MergeMode>().unwrap(), MergeMode::Append);
        assert_eq!("replace".parse::<MergeMode>().unwrap(), MergeMode::Replace);
        assert_eq!(MergeMode::default(), MergeMode::Update);
        assert!("upsert".parse::<MergeMode>().is_err());
    }

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let warning = StructuralWarning::SelfLoop { node: "a".into() };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "self_loop");
        assert_eq!(json["node"], "a");
    }
}
