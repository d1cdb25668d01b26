//! Loosely-shaped partial graphs as produced by extraction collaborators.
//!
//! Everything here is optional or aliased; the strict [`Graph`] form is only
//! built at the merge boundary.

use serde::{Deserialize, Serialize};

use super::edge::Edge;
use super::graph::Graph;
use super::node::{Attributes, Node};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub id: Option<String>,
    #[serde(default, alias = "name")]
    pub label: Option<String>,
    #[serde(default, rename = "type", alias = "node_type", alias = "category")]
    pub node_type: Option<String>,
    #[serde(default, alias = "val")]
    pub size: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub target: Option<String>,
    #[serde(
        default,
        rename = "relationshipType",
        alias = "relationship_type",
        alias = "relation",
        alias = "type"
    )]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Node/edge set produced by one extraction unit. Accepts `edges` or `links`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default, alias = "links")]
    pub edges: Vec<RawEdge>,
}

impl PartialGraph {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl From<&Node> for RawNode {
    fn from(node: &Node) -> Self {
        Self {
            id: Some(node.id.clone()),
            label: Some(node.label.clone()),
            node_type: Some(node.node_type.to_string()),
            size: Some(node.size),
            description: None,
            attributes: node.attributes.clone(),
            citations: node.citations.iter().cloned().collect(),
        }
    }
}

impl From<&Edge> for RawEdge {
    fn from(edge: &Edge) -> Self {
        Self {
            source: Some(edge.source.clone()),
            target: Some(edge.target.clone()),
            relationship_type: Some(edge.relationship_type.to_string()),
            weight: Some(edge.weight),
            confidence: Some(edge.confidence),
            evidence: edge.evidence.clone(),
            attributes: edge.attributes.clone(),
        }
    }
}

impl From<&Graph> for PartialGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes().map(RawNode::from).collect(),
            edges: graph.edges().iter().map(RawEdge::from).collect(),
        }
    }
}

/// Ids arrive as strings from LLM output and as numbers from force-graph exports.
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}
