use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Lower bound for node importance.
pub const MIN_NODE_SIZE: f64 = 10.0;
/// Upper bound for node importance.
pub const MAX_NODE_SIZE: f64 = 50.0;

pub const DESCRIPTION_ATTR: &str = "description";
pub const FREQUENCY_ATTR: &str = "frequency";

/// Kind of concept a node stands for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Concept,
    Process,
    Material,
    Measurement,
    Formula,
    Method,
    Condition,
    Organism,
    Author,
    Journal,
    Keyword,
}

impl NodeType {
    pub fn all() -> &'static [NodeType] {
        const ALL: &[NodeType] = &[
            NodeType::Concept,
            NodeType::Process,
            NodeType::Material,
            NodeType::Measurement,
            NodeType::Formula,
            NodeType::Method,
            NodeType::Condition,
            NodeType::Organism,
            NodeType::Author,
            NodeType::Journal,
            NodeType::Keyword,
        ];
        ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Concept => "concept",
            NodeType::Process => "process",
            NodeType::Material => "material",
            NodeType::Measurement => "measurement",
            NodeType::Formula => "formula",
            NodeType::Method => "method",
            NodeType::Condition => "condition",
            NodeType::Organism => "organism",
            NodeType::Author => "author",
            NodeType::Journal => "journal",
            NodeType::Keyword => "keyword",
        }
    }

    /// Parse leniently; anything unrecognised is a plain concept.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(NodeType::Concept)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        lookup_node_type(&normalized)
            .or_else(|| normalized.strip_suffix('s').and_then(lookup_node_type))
            .ok_or_else(|| format!("unknown node type: {}", s))
    }
}

fn lookup_node_type(name: &str) -> Option<NodeType> {
    let kind = match name {
        "concept" => NodeType::Concept,
        "process" | "processes" => NodeType::Process,
        "material" | "chemical" | "compound" => NodeType::Material,
        "measurement" | "metric" => NodeType::Measurement,
        "formula" | "formulae" | "equation" => NodeType::Formula,
        "method" | "technique" => NodeType::Method,
        "condition" => NodeType::Condition,
        "organism" | "species" => NodeType::Organism,
        "author" => NodeType::Author,
        "journal" => NodeType::Journal,
        "keyword" => NodeType::Keyword,
        _ => return None,
    };
    Some(kind)
}

/// Open attribute value: a scalar or an array of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Stable textual form used to order heterogeneous values.
    pub fn sort_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// Canonical concept node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Canonical id derived from the label
    pub id: String,
    /// Display label
    pub label: String,
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// Importance weight, bounded to [MIN_NODE_SIZE, MAX_NODE_SIZE]
    pub size: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub citations: BTreeSet<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            size: MIN_NODE_SIZE,
            attributes: BTreeMap::new(),
            citations: BTreeSet::new(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.attributes
            .insert(DESCRIPTION_ATTR.to_string(), AttrValue::Text(description.into()));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citations.insert(citation.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.attributes.get(DESCRIPTION_ATTR).and_then(AttrValue::as_str)
    }

    pub fn frequency(&self) -> f64 {
        self.attributes
            .get(FREQUENCY_ATTR)
            .and_then(AttrValue::as_f64)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_parses_leniently() {
        assert_eq!("Process".parse::<NodeType>().unwrap(), NodeType::Process);
        assert_eq!("organisms".parse::<NodeType>().unwrap(), NodeType::Organism);
        assert_eq!(" MEASUREMENT ".parse::<NodeType>().unwrap(), NodeType::Measurement);
        assert!("galaxy".parse::<NodeType>().is_err());
        assert_eq!(NodeType::parse_lenient("galaxy"), NodeType::Concept);
    }

    #[test]
    fn unspecified_node_type_defaults_to_concept() {
        assert_eq!(NodeType::default(), NodeType::Concept);
    }

    #[test]
    fn node_type_round_trips_through_display() {
        for kind in NodeType::all() {
            assert_eq!(kind.to_string().parse::<NodeType>().unwrap(), *kind);
        }
    }

    #[test]
    fn node_serializes_type_field() {
        let node = Node::new("stomata", "Stomata", NodeType::Organism).with_size(20.0);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "organism");
        assert_eq!(json["size"], 20.0);
        assert!(json.get("attributes").is_none());
    }

    #[test]
    fn attr_values_deserialize_untagged() {
        let attrs: Attributes =
            serde_json::from_str(r#"{"a": 3, "b": "text", "c": [1, "x"], "d": true}"#).unwrap();
        assert_eq!(attrs["a"], AttrValue::Number(3.0));
        assert_eq!(attrs["b"], AttrValue::Text("text".into()));
        assert_eq!(attrs["d"], AttrValue::Bool(true));
        assert!(matches!(attrs["c"], AttrValue::List(ref items) if items.len() == 2));
    }

    #[test]
    fn description_and_frequency_accessors() {
        let node = Node::new("aba", "ABA", NodeType::Material)
            .with_description("abscisic acid")
            .with_attribute(FREQUENCY_ATTR, 4.0);
        assert_eq!(node.description(), Some("abscisic acid"));
        assert_eq!(node.frequency(), 4.0);
        assert_eq!(Node::new("x", "x", NodeType::Concept).frequency(), 0.0);
    }
}
