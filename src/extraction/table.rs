//! Co-occurrence statistics over tabular data.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use super::normalizer::EntityNormalizer;
use super::text::SOURCES_ATTR;
use crate::config::MergeConfig;
use crate::error::Result;
use crate::model::{AttrValue, NodeType, PartialGraph, RawEdge, RawNode, RelationType, FREQUENCY_ATTR};

const SIZE_PER_OCCURRENCE: f64 = 5.0;
const MEASUREMENT_CONFIDENCE: f64 = 0.8;

/// Confidence for entities that share `count` rows.
pub fn co_occurrence_confidence(count: usize) -> f64 {
    (0.4 + 0.1 * count as f64).min(1.0)
}

#[derive(Debug)]
struct Tally {
    label: String,
    node_type: NodeType,
    frequency: usize,
}

/// Turns CSV rows into entities linked by co-occurrence.
///
/// Textual cells are entity candidates; every pair of entities sharing a row
/// gets a `CORRELATES_WITH` edge weighted by how many rows they share. Numeric
/// cells link the row's entities to a measurement node named after the column.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    normalizer: EntityNormalizer,
    min_size: f64,
    max_size: f64,
}

impl TableExtractor {
    pub fn new(normalizer: EntityNormalizer) -> Self {
        Self::with_sizes(normalizer, &MergeConfig::default())
    }

    pub fn with_sizes(normalizer: EntityNormalizer, merge: &MergeConfig) -> Self {
        Self {
            normalizer,
            min_size: merge.min_node_size,
            max_size: merge.max_node_size,
        }
    }

    pub fn extract(&self, source: &str, csv_text: &str) -> Result<PartialGraph> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_text.as_bytes());
        let headers = reader.headers()?.clone();

        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        let mut co_occurrences: BTreeMap<(String, String), usize> = BTreeMap::new();
        let mut measurements: BTreeMap<(String, String), usize> = BTreeMap::new();
        let mut rows = 0usize;

        for record in reader.records() {
            let record = record?;
            rows += 1;
            let mut entities = BTreeSet::new();
            let mut measured = BTreeSet::new();

            for (column, cell) in record.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                if cell.parse::<f64>().is_ok() {
                    let Some(header) = headers.get(column) else {
                        continue;
                    };
                    match self.normalizer.normalize(header) {
                        Ok(id) => {
                            bump(&mut tallies, &id, header, NodeType::Measurement);
                            measured.insert(id);
                        }
                        Err(reason) => trace!(header, %reason, "Skipping numeric column"),
                    }
                    continue;
                }
                match self.normalizer.normalize(cell) {
                    Ok(id) => {
                        bump(&mut tallies, &id, cell, NodeType::Concept);
                        entities.insert(id);
                    }
                    Err(reason) => trace!(cell, %reason, "Rejected cell"),
                }
            }

            let entities: Vec<_> = entities.into_iter().collect();
            for (i, left) in entities.iter().enumerate() {
                for right in &entities[i + 1..] {
                    *co_occurrences
                        .entry((left.clone(), right.clone()))
                        .or_default() += 1;
                }
                for measurement in &measured {
                    if measurement != left {
                        *measurements
                            .entry((left.clone(), measurement.clone()))
                            .or_default() += 1;
                    }
                }
            }
        }

        let mut edges: Vec<RawEdge> = co_occurrences
            .into_iter()
            .map(|((source_id, target_id), count)| RawEdge {
                source: Some(source_id),
                target: Some(target_id),
                relationship_type: Some(RelationType::CorrelatesWith.to_string()),
                weight: Some(count as f64),
                confidence: Some(co_occurrence_confidence(count)),
                evidence: Some(format!("co-occur in {} row(s) of {}", count, source)),
                attributes: Default::default(),
            })
            .collect();
        edges.extend(measurements.into_iter().map(|((entity, measurement), count)| {
            RawEdge {
                source: Some(entity),
                target: Some(measurement),
                relationship_type: Some(RelationType::MeasuredBy.to_string()),
                weight: Some(count as f64),
                confidence: Some(MEASUREMENT_CONFIDENCE),
                evidence: Some(format!("numeric column in {}", source)),
                attributes: Default::default(),
            }
        }));

        let nodes: Vec<RawNode> = tallies
            .into_iter()
            .map(|(id, tally)| {
                let size = self.min_size
                    + SIZE_PER_OCCURRENCE * tally.frequency.saturating_sub(1) as f64;
                let mut attributes = BTreeMap::new();
                attributes.insert(
                    FREQUENCY_ATTR.to_string(),
                    AttrValue::Number(tally.frequency as f64),
                );
                attributes.insert(
                    SOURCES_ATTR.to_string(),
                    AttrValue::List(vec![AttrValue::Text(source.to_string())]),
                );
                RawNode {
                    id: Some(id),
                    label: Some(tally.label),
                    node_type: Some(tally.node_type.to_string()),
                    size: Some(size.clamp(self.min_size, self.max_size)),
                    description: None,
                    attributes,
                    citations: Vec::new(),
                }
            })
            .collect();

        debug!(
            source,
            rows,
            nodes = nodes.len(),
            edges = edges.len(),
            "Extracted table"
        );
        Ok(PartialGraph { nodes, edges })
    }
}

fn bump(tallies: &mut BTreeMap<String, Tally>, id: &str, label: &str, node_type: NodeType) {
    let tally = tallies.entry(id.to_string()).or_insert_with(|| Tally {
        label: label.to_string(),
        node_type,
        frequency: 0,
    });
    tally.frequency += 1;
    if node_type == NodeType::Measurement {
        tally.node_type = NodeType::Measurement;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CROPS: &str = "\
crop,region,yield
Wheat,Prairie,3.2
Wheat,Prairie,2.9
Maize,Prairie,7.1
";

    fn edge<'a>(partial: &'a PartialGraph, a: &str, b: &str, kind: RelationType) -> Option<&'a RawEdge> {
        partial.edges.iter().find(|e| {
            e.source.as_deref() == Some(a)
                && e.target.as_deref() == Some(b)
                && e.relationship_type.as_deref() == Some(kind.as_str())
        })
    }

    #[test]
    fn co_occurrence_counts_become_weights() {
        let partial = TableExtractor::new(EntityNormalizer::new())
            .extract("crops.csv", CROPS)
            .unwrap();

        let wheat_prairie = edge(&partial, "prairie", "wheat", RelationType::CorrelatesWith).unwrap();
        assert_eq!(wheat_prairie.weight, Some(2.0));
        assert!((wheat_prairie.confidence.unwrap() - 0.6).abs() < 1e-9);

        let maize_prairie = edge(&partial, "maize", "prairie", RelationType::CorrelatesWith).unwrap();
        assert_eq!(maize_prairie.weight, Some(1.0));
        assert!(edge(&partial, "maize", "wheat", RelationType::CorrelatesWith).is_none());
    }

    #[test]
    fn numeric_columns_become_measurements() {
        let partial = TableExtractor::new(EntityNormalizer::new())
            .extract("crops.csv", CROPS)
            .unwrap();

        let yield_node = partial
            .nodes
            .iter()
            .find(|n| n.id.as_deref() == Some("yield"))
            .unwrap();
        assert_eq!(yield_node.node_type.as_deref(), Some("measurement"));
        assert_eq!(
            yield_node.attributes.get(FREQUENCY_ATTR),
            Some(&AttrValue::Number(3.0))
        );

        let wheat_yield = edge(&partial, "wheat", "yield", RelationType::MeasuredBy).unwrap();
        assert_eq!(wheat_yield.weight, Some(2.0));
    }

    #[test]
    fn frequency_scales_size() {
        let partial = TableExtractor::new(EntityNormalizer::new())
            .extract("crops.csv", CROPS)
            .unwrap();
        let prairie = partial
            .nodes
            .iter()
            .find(|n| n.id.as_deref() == Some("prairie"))
            .unwrap();
        assert_eq!(prairie.size, Some(20.0));
    }

    #[test]
    fn confidence_saturates_at_one() {
        assert!((co_occurrence_confidence(1) - 0.5).abs() < 1e-9);
        assert_eq!(co_occurrence_confidence(6), 1.0);
        assert_eq!(co_occurrence_confidence(50), 1.0);
    }

    #[test]
    fn invalid_cells_are_skipped() {
        let partial = TableExtractor::new(EntityNormalizer::new())
            .extract("t.csv", "name,other\nthe,ab\nAuxin,\n")
            .unwrap();
        let ids: Vec<_> = partial.nodes.iter().filter_map(|n| n.id.as_deref()).collect();
        assert_eq!(ids, vec!["auxin"]);
        assert!(partial.edges.is_empty());
    }

    #[test]
    fn header_only_table_is_empty() {
        let partial = TableExtractor::new(EntityNormalizer::new())
            .extract("t.csv", "a,b,c\n")
            .unwrap();
        assert!(partial.is_empty());
    }
}
