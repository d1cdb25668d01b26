//! Order-independent reduction of node and edge observations.
//!
//! Every combinator here is symmetric and associative: values are sorted
//! before they are folded, so the result never depends on which partial graph
//! arrived first.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AttrValue, Attributes, Edge, Node, FREQUENCY_ATTR};

/// Separator between distinct text values folded into one attribute.
pub const TEXT_SEPARATOR: &str = " | ";

/// Numeric attributes that count observations and therefore add up.
const SUMMED_ATTRS: &[&str] = &[FREQUENCY_ATTR, "occurrences", "citation_count"];

/// Combine observations of one canonical node.
///
/// Size is the maximum, citations are unioned, attributes are folded per key.
/// Label and type come from the largest observation (ties broken by the
/// smallest label, then type).
pub fn combine_nodes(mut observations: Vec<Node>) -> Option<Node> {
    if observations.len() <= 1 {
        return observations.pop();
    }

    let representative = observations
        .iter()
        .max_by(|a, b| {
            a.size
                .total_cmp(&b.size)
                .then_with(|| Reverse(&a.label).cmp(&Reverse(&b.label)))
                .then_with(|| Reverse(a.node_type).cmp(&Reverse(b.node_type)))
        })
        .cloned()?;

    let citations = observations
        .iter()
        .flat_map(|n| n.citations.iter().cloned())
        .collect();
    let attributes = combine_attributes(observations.iter().map(|n| &n.attributes));

    Some(Node {
        citations,
        attributes,
        ..representative
    })
}

/// Combine observations sharing one unordered `(source, target, type)` key.
///
/// Weights add up, confidence is the maximum, and evidence comes from the
/// most confident observation that carries any.
pub fn combine_edges(mut observations: Vec<Edge>) -> Option<Edge> {
    if observations.len() <= 1 {
        return observations.pop();
    }

    let representative = observations
        .iter()
        .max_by(|a, b| edge_rank(a, b))
        .cloned()?;

    let mut weights: Vec<f64> = observations.iter().map(|e| e.weight).collect();
    weights.sort_by(f64::total_cmp);
    let weight: f64 = weights.iter().sum();

    let confidence = observations
        .iter()
        .map(|e| e.confidence)
        .fold(f64::NEG_INFINITY, f64::max);

    let evidence = observations
        .iter()
        .filter_map(|e| e.evidence.as_ref().map(|text| (e.confidence, text)))
        .max_by(|(ca, ta), (cb, tb)| ca.total_cmp(cb).then_with(|| tb.cmp(ta)))
        .map(|(_, text)| text.clone());

    let attributes = combine_attributes(observations.iter().map(|e| &e.attributes));

    Some(Edge {
        weight,
        confidence,
        evidence,
        attributes,
        ..representative
    })
}

/// Orientation tie-break: most confident, heaviest, then lexicographically
/// smallest `(source, target)`.
fn edge_rank(a: &Edge, b: &Edge) -> Ordering {
    a.confidence
        .total_cmp(&b.confidence)
        .then_with(|| a.weight.total_cmp(&b.weight))
        .then_with(|| Reverse((&a.source, &a.target)).cmp(&Reverse((&b.source, &b.target))))
}

/// Fold attribute maps key by key.
pub fn combine_attributes<'a>(maps: impl Iterator<Item = &'a Attributes>) -> Attributes {
    let mut grouped: BTreeMap<&str, Vec<&AttrValue>> = BTreeMap::new();
    for map in maps {
        for (key, value) in map {
            grouped.entry(key.as_str()).or_default().push(value);
        }
    }

    grouped
        .into_iter()
        .map(|(key, values)| (key.to_string(), combine_values(key, values)))
        .collect()
}

fn combine_values(key: &str, values: Vec<&AttrValue>) -> AttrValue {
    if let [only] = values.as_slice() {
        return (*only).clone();
    }

    let mut folded = FoldedValue::default();
    for value in values {
        folded.absorb(value);
    }
    folded.finish(SUMMED_ATTRS.contains(&key))
}

/// One accumulator per value kind. List items are absorbed by their own
/// kind, so a mixed result that is merged again folds exactly like the flat
/// set of observations it came from.
#[derive(Default)]
struct FoldedValue<'a> {
    numbers: Vec<f64>,
    texts: BTreeSet<&'a str>,
    flag: Option<bool>,
    listed: bool,
}

impl<'a> FoldedValue<'a> {
    fn absorb(&mut self, value: &'a AttrValue) {
        match value {
            AttrValue::Number(n) => self.numbers.push(*n),
            AttrValue::Text(text) => self.texts.extend(
                text.split(TEXT_SEPARATOR)
                    .map(str::trim)
                    .filter(|part| !part.is_empty()),
            ),
            AttrValue::Bool(b) => self.flag = Some(self.flag.unwrap_or(false) || *b),
            AttrValue::List(items) => {
                self.listed = true;
                for item in items {
                    self.absorb(item);
                }
            }
        }
    }

    fn finish(mut self, summed: bool) -> AttrValue {
        self.numbers.sort_by(f64::total_cmp);
        let number = if summed && !self.numbers.is_empty() {
            Some(self.numbers.iter().sum())
        } else {
            self.numbers.last().copied()
        };

        let kinds = usize::from(number.is_some())
            + usize::from(self.flag.is_some())
            + usize::from(!self.texts.is_empty());
        if !self.listed && kinds <= 1 {
            return match (number, self.flag) {
                (Some(n), _) => AttrValue::Number(n),
                (None, Some(flag)) => AttrValue::Bool(flag),
                (None, None) => AttrValue::Text(
                    self.texts.into_iter().collect::<Vec<_>>().join(TEXT_SEPARATOR),
                ),
            };
        }

        // lists, and mixtures of kinds, become the sorted union of their items
        let mut items: BTreeMap<String, AttrValue> = BTreeMap::new();
        let scalars = number
            .map(AttrValue::Number)
            .into_iter()
            .chain(self.flag.map(AttrValue::Bool))
            .chain(self.texts.into_iter().map(AttrValue::from));
        for item in scalars {
            items.insert(item.sort_key(), item);
        }
        AttrValue::List(items.into_values().collect())
    }
}
