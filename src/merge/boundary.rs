use std::collections::HashMap;
use tracing::debug;

use super::merger::StructuralWarning;
use crate::extraction::canonical_id;
use crate::model::{
    AttrValue, Edge, Node, NodeType, PartialGraph, RelationType, DESCRIPTION_ATTR,
};

/// Strict observations derived from one partial graph.
#[derive(Debug, Default)]
pub struct Admitted {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub warnings: Vec<StructuralWarning>,
}

/// Size bounds enforced on admitted nodes.
#[derive(Debug, Clone, Copy)]
pub struct SizeBounds {
    pub min: f64,
    pub max: f64,
}

impl SizeBounds {
    fn clamp(&self, size: Option<f64>) -> f64 {
        match size {
            Some(size) if size.is_finite() => size.clamp(self.min, self.max),
            _ => self.min,
        }
    }
}

/// Validate a partial graph into canonical nodes and edges.
///
/// Nodes are re-keyed to the canonical id of their label and edges are
/// rewritten through the resulting alias map. Edges whose endpoints are not
/// known here are kept; whether they dangle is decided after merge.
pub fn admit(partial: &PartialGraph, bounds: SizeBounds) -> Admitted {
    let mut admitted = Admitted::default();
    let mut aliases: HashMap<String, String> = HashMap::new();

    for (index, raw) in partial.nodes.iter().enumerate() {
        let label = raw
            .label
            .as_deref()
            .or(raw.id.as_deref())
            .map(str::trim)
            .unwrap_or_default();
        let mut id = canonical_id(label);
        if id.is_empty() {
            id = raw.id.as_deref().map(canonical_id).unwrap_or_default();
        }
        if id.is_empty() {
            admitted
                .warnings
                .push(StructuralWarning::UnidentifiedNode { index });
            continue;
        }

        for alias in [raw.id.as_deref(), raw.label.as_deref()].into_iter().flatten() {
            aliases.insert(alias.to_string(), id.clone());
        }
        aliases.insert(id.clone(), id.clone());

        let node_type = match raw.node_type.as_deref() {
            Some(value) => value.parse().unwrap_or_else(|_| {
                debug!(node = %id, value, "Unknown node type, using concept");
                NodeType::Concept
            }),
            None => NodeType::Concept,
        };

        let display = if label.is_empty() {
            id.clone()
        } else {
            label.to_string()
        };
        let mut node = Node::new(id, display, node_type).with_size(bounds.clamp(raw.size));
        node.attributes = raw.attributes.clone();
        if let Some(description) = raw.description.as_deref().map(str::trim) {
            if !description.is_empty() {
                node.attributes.insert(
                    DESCRIPTION_ATTR.to_string(),
                    AttrValue::Text(description.to_string()),
                );
            }
        }
        node.citations = raw.citations.iter().cloned().collect();
        admitted.nodes.push(node);
    }

    let resolve = |raw: Option<&str>| -> Option<String> {
        let raw = raw?.trim();
        let id = aliases
            .get(raw)
            .cloned()
            .unwrap_or_else(|| canonical_id(raw));
        (!id.is_empty()).then_some(id)
    };

    for (index, raw) in partial.edges.iter().enumerate() {
        let (Some(source), Some(target)) = (
            resolve(raw.source.as_deref()),
            resolve(raw.target.as_deref()),
        ) else {
            admitted
                .warnings
                .push(StructuralWarning::MissingEndpoint { index });
            continue;
        };
        if source == target {
            admitted
                .warnings
                .push(StructuralWarning::SelfLoop { node: source });
            continue;
        }

        let relationship_type = match raw.relationship_type.as_deref() {
            Some(value) => value.parse().unwrap_or_else(|_| {
                debug!(%source, %target, value, "Unknown relationship type, using RELATED_TO");
                RelationType::RelatedTo
            }),
            None => RelationType::RelatedTo,
        };
        let weight = match raw.weight {
            Some(w) if w.is_finite() && w > 0.0 => w,
            Some(_) => 1.0,
            None => relationship_type.base_weight(),
        };
        let confidence = match raw.confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => 0.5,
        };

        let mut edge = Edge::new(source, target, relationship_type)
            .with_weight(weight)
            .with_confidence(confidence);
        edge.evidence = raw.evidence.clone().filter(|e| !e.trim().is_empty());
        edge.attributes = raw.attributes.clone();
        admitted.edges.push(edge);
    }

    admitted
}
