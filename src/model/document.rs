use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::edge::Edge;
use super::graph::Graph;
use super::node::Node;
use crate::error::Result;

/// Provenance and size summary attached to every exported graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub extraction_method: String,
    pub extracted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_units: Vec<String>,
}

/// Canonical `{ nodes, edges, metadata }` document handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Node>,
    #[serde(alias = "links")]
    pub edges: Vec<Edge>,
    pub metadata: GraphMetadata,
}

impl GraphDocument {
    pub fn from_graph(graph: &Graph, extraction_method: impl Into<String>) -> Self {
        Self {
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().to_vec(),
            metadata: GraphMetadata {
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
                extraction_method: extraction_method.into(),
                extracted_at: Utc::now(),
                source_units: Vec::new(),
                failed_units: Vec::new(),
            },
        }
    }

    pub fn with_units(mut self, source_units: Vec<String>, failed_units: Vec<String>) -> Self {
        self.metadata.source_units = source_units;
        self.metadata.failed_units = failed_units;
        self
    }

    pub fn to_graph(&self) -> Graph {
        Graph::from_parts(self.nodes.iter().cloned(), self.edges.clone())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeType, RelationType};

    fn sample() -> Graph {
        Graph::from_parts(
            vec![
                Node::new("light", "Light", NodeType::Condition),
                Node::new("photosynthesis", "Photosynthesis", NodeType::Process),
            ],
            vec![Edge::new("light", "photosynthesis", RelationType::Activates)],
        )
    }

    #[test]
    fn metadata_counts_match_graph() {
        let doc = GraphDocument::from_graph(&sample(), "text");
        assert_eq!(doc.metadata.node_count, 2);
        assert_eq!(doc.metadata.edge_count, 1);
        assert_eq!(doc.metadata.extraction_method, "text");
    }

    #[test]
    fn save_and_load_preserve_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.json");
        let doc = GraphDocument::from_graph(&sample(), "merge")
            .with_units(vec!["a.txt#0".into()], vec!["b.txt#1".into()]);

        doc.save(&path).unwrap();
        let loaded = GraphDocument::load(&path).unwrap();

        assert_eq!(loaded, doc);
        assert_eq!(loaded.to_graph(), sample());
    }

    #[test]
    fn serialized_document_has_metadata_block() {
        let json = serde_json::to_value(GraphDocument::from_graph(&sample(), "table")).unwrap();
        assert_eq!(json["metadata"]["node_count"], 2);
        assert!(json["metadata"]["extracted_at"].is_string());
        assert!(json["metadata"].get("failed_units").is_none());
    }
}
