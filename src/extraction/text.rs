use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::chunker::{split_sentences, TextUnit};
use super::classifier::{is_relation_keyword_token, RelationshipClassifier, Signal};
use super::normalizer::EntityNormalizer;
use crate::config::{ClassifierConfig, ExtractionConfig, MergeConfig};
use crate::model::{AttrValue, NodeType, PartialGraph, RawEdge, RawNode, FREQUENCY_ATTR};

/// Size added per extra mention.
const SIZE_PER_MENTION: f64 = 5.0;
/// Attribute listing the documents a node was seen in.
pub const SOURCES_ATTR: &str = "sources";

/// Entity accepted in one sentence: canonical id plus surface form.
#[derive(Debug, Clone, PartialEq)]
struct Mention {
    id: String,
    surface: String,
}

#[derive(Debug)]
struct NodeTally {
    label: String,
    node_type: NodeType,
    frequency: usize,
}

/// Heuristic entity and relation extraction over one text unit.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    normalizer: EntityNormalizer,
    classifier: RelationshipClassifier,
    max_entity_words: usize,
    evidence_max_chars: usize,
    min_size: f64,
    max_size: f64,
}

impl TextExtractor {
    pub fn new(normalizer: EntityNormalizer, classifier: RelationshipClassifier) -> Self {
        let extraction = ExtractionConfig::default();
        let merge = MergeConfig::default();
        Self {
            normalizer,
            classifier,
            max_entity_words: extraction.max_entity_words,
            evidence_max_chars: ClassifierConfig::default().evidence_max_chars,
            min_size: merge.min_node_size,
            max_size: merge.max_node_size,
        }
    }

    pub fn with_limits(
        mut self,
        extraction: &ExtractionConfig,
        classifier: &ClassifierConfig,
        merge: &MergeConfig,
    ) -> Self {
        self.max_entity_words = extraction.max_entity_words.max(1);
        self.evidence_max_chars = classifier.evidence_max_chars;
        self.min_size = merge.min_node_size;
        self.max_size = merge.max_node_size;
        self
    }

    pub fn extract(&self, unit: &TextUnit) -> PartialGraph {
        let mut tallies: BTreeMap<String, NodeTally> = BTreeMap::new();
        let mut edges = Vec::new();

        for sentence in split_sentences(&unit.text) {
            let mentions = self.sentence_mentions(&sentence);
            for mention in &mentions {
                tallies
                    .entry(mention.id.clone())
                    .or_insert_with(|| NodeTally {
                        label: mention.surface.clone(),
                        node_type: NodeType::Concept,
                        frequency: 0,
                    })
                    .frequency += 1;
            }

            let distinct = distinct_mentions(&mentions);
            for (i, left) in distinct.iter().enumerate() {
                for right in &distinct[i + 1..] {
                    let classification =
                        self.classifier
                            .classify(&sentence, &left.surface, &right.surface);
                    if !self.classifier.accepts(&classification) {
                        trace!(
                            source = %left.id,
                            target = %right.id,
                            confidence = classification.confidence,
                            "Relation below inclusion threshold"
                        );
                        continue;
                    }

                    let override_type = match classification.signal {
                        Signal::Measurement => Some(NodeType::Measurement),
                        Signal::Formula => Some(NodeType::Formula),
                        _ => None,
                    };
                    if let (Some(kind), Some(tally)) = (override_type, tallies.get_mut(&right.id)) {
                        if tally.node_type == NodeType::Concept {
                            tally.node_type = kind;
                        }
                    }

                    edges.push(RawEdge {
                        source: Some(left.id.clone()),
                        target: Some(right.id.clone()),
                        relationship_type: Some(classification.relationship_type.to_string()),
                        weight: Some(classification.weight),
                        confidence: Some(classification.confidence),
                        evidence: Some(truncate_chars(&sentence, self.evidence_max_chars)),
                        attributes: Default::default(),
                    });
                }
            }
        }

        let nodes: Vec<RawNode> = tallies
            .into_iter()
            .map(|(id, tally)| self.raw_node(id, tally, &unit.source))
            .collect();

        debug!(
            unit = %unit.id,
            nodes = nodes.len(),
            edges = edges.len(),
            "Extracted text unit"
        );
        PartialGraph { nodes, edges }
    }

    fn raw_node(&self, id: String, tally: NodeTally, source: &str) -> RawNode {
        let size = self.min_size + SIZE_PER_MENTION * tally.frequency.saturating_sub(1) as f64;
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
    }

    /// Accepted entity mentions in sentence order, duplicates included.
    fn sentence_mentions(&self, sentence: &str) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for run in self.candidate_runs(sentence) {
            for window in run.chunks(self.max_entity_words) {
                let phrase = window.join(" ");
                match self.normalizer.normalize(&phrase) {
                    Ok(id) => mentions.push(Mention { id, surface: phrase }),
                    Err(reason) if window.len() > 1 => {
                        trace!(candidate = %phrase, %reason, "Falling back to single tokens");
                        for token in window {
                            match self.normalizer.normalize(token) {
                                Ok(id) => mentions.push(Mention {
                                    id,
                                    surface: token.to_string(),
                                }),
                                Err(reason) => trace!(candidate = %token, %reason, "Rejected"),
                            }
                        }
                    }
                    Err(reason) => trace!(candidate = %phrase, %reason, "Rejected"),
                }
            }
        }
        mentions
    }

    /// Maximal runs of tokens not broken by stopwords, relation keywords,
    /// digits or punctuation.
    fn candidate_runs<'s>(&self, sentence: &'s str) -> Vec<Vec<&'s str>> {
        let mut runs = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for raw in sentence.split_whitespace() {
            let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
            let opens_new = raw.starts_with(|c: char| !c.is_alphanumeric());
            let closes = raw.ends_with(|c: char| !c.is_alphanumeric());

            let breaks = token.is_empty()
                || token.chars().any(|c| c.is_ascii_digit())
                || self.normalizer.is_stopword_token(token)
                || is_relation_keyword_token(token);

            if breaks || opens_new {
                flush(&mut runs, &mut current);
            }
            if !breaks {
                current.push(token);
            }
            if closes {
                flush(&mut runs, &mut current);
            }
        }
        flush(&mut runs, &mut current);
        runs
    }
}

fn flush<'s>(runs: &mut Vec<Vec<&'s str>>, current: &mut Vec<&'s str>) {
    if !current.is_empty() {
        runs.push(std::mem::take(current));
    }
}

fn distinct_mentions(mentions: &[Mention]) -> Vec<Mention> {
    let mut seen = std::collections::HashSet::new();
    mentions
        .iter()
        .filter(|m| seen.insert(m.id.clone()))
        .cloned()
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
