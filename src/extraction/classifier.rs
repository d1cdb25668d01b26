//! Heuristic sentence-level relation classification.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;

use crate::config::ClassifierConfig;
use crate::model::RelationType;

/// Confidence when one of the entities is not mentioned at all.
pub const MISSING_MENTION_CONFIDENCE: f64 = 0.3;
/// Confidence for a relation keyword found between the two mentions.
pub const BETWEEN_KEYWORD_CONFIDENCE: f64 = 0.9;
/// Confidence for a relation keyword found outside the mention span.
pub const OUTSIDE_KEYWORD_CONFIDENCE: f64 = 0.7;
/// Confidence for bare co-occurrence.
pub const CO_OCCURRENCE_CONFIDENCE: f64 = 0.5;
/// Floor applied when a measurement or formula pattern forces the relation.
pub const OVERRIDE_CONFIDENCE: f64 = 0.8;

const RELATION_KEYWORDS: &[(&str, RelationType)] = &[
    ("inhibits", RelationType::Inhibits),
    ("inhibit", RelationType::Inhibits),
    ("inhibited by", RelationType::Inhibits),
    ("suppresses", RelationType::Inhibits),
    ("blocks", RelationType::Inhibits),
    ("reduces", RelationType::Inhibits),
    ("activates", RelationType::Activates),
    ("activated by", RelationType::Activates),
    ("stimulates", RelationType::Activates),
    ("triggers", RelationType::Activates),
    ("induces", RelationType::Activates),
    ("causes", RelationType::Causes),
    ("caused by", RelationType::Causes),
    ("leads to", RelationType::Causes),
    ("results in", RelationType::Causes),
    ("produces", RelationType::Causes),
    ("catalyzes", RelationType::Catalyzes),
    ("catalyses", RelationType::Catalyzes),
    ("catalyzed by", RelationType::Catalyzes),
    ("regulates", RelationType::Regulates),
    ("regulated by", RelationType::Regulates),
    ("controls", RelationType::Regulates),
    ("modulates", RelationType::Regulates),
    ("binds to", RelationType::BindsTo),
    ("binds", RelationType::BindsTo),
    ("depends on", RelationType::DependsOn),
    ("dependent on", RelationType::DependsOn),
    ("requires", RelationType::DependsOn),
    ("relies on", RelationType::DependsOn),
    ("influences", RelationType::Influences),
    ("affects", RelationType::Influences),
    ("impacts", RelationType::Influences),
    ("part of", RelationType::PartOf),
    ("component of", RelationType::PartOf),
    ("consists of", RelationType::PartOf),
    ("contains", RelationType::PartOf),
    ("measured by", RelationType::MeasuredBy),
    ("measured as", RelationType::MeasuredBy),
    ("quantified by", RelationType::MeasuredBy),
    ("calculated by", RelationType::CalculatedBy),
    ("calculated as", RelationType::CalculatedBy),
    ("computed as", RelationType::CalculatedBy),
    ("defined as", RelationType::DefinedAs),
    ("refers to", RelationType::DefinedAs),
    ("known as", RelationType::DefinedAs),
    ("similar to", RelationType::SimilarTo),
    ("resembles", RelationType::SimilarTo),
    ("analogous to", RelationType::SimilarTo),
    ("correlates with", RelationType::CorrelatesWith),
    ("correlated with", RelationType::CorrelatesWith),
    ("associated with", RelationType::CorrelatesWith),
    ("related to", RelationType::RelatedTo),
];

static KEYWORD_PATTERNS: Lazy<Vec<(Regex, RelationType)>> = Lazy::new(|| {
    RELATION_KEYWORDS
        .iter()
        .map(|(keyword, kind)| (mention_pattern(keyword).expect("valid keyword pattern"), *kind))
        .collect()
});

/// Single words that make up relation keywords, minus glue words like "to".
static KEYWORD_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    RELATION_KEYWORDS
        .iter()
        .flat_map(|(keyword, _)| keyword.split(' '))
        .filter(|token| token.len() > 2)
        .collect()
});

const UNITS: &str = r"mg/l|g/l|mol/l|µmol|μmol|mmol|mol|mg|µg|μg|kg|ml|mm|µm|μm|nm|cm|mM|µM|μM|nM|ppm|ppb|kpa|mpa|pa|lux|min|days?|weeks?";

/// Bare one-letter units only count when spaced off the number ("30 s", not "1990s").
const SHORT_UNITS: &str = r"g|l|m|h|s";

static MEASUREMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let number = r"\d+(?:\.\d+)?";
    let unit = format!(r"(?:%|°\s?[cf]|(?:{UNITS})\b|\s(?:{SHORT_UNITS})\b)");
    Regex::new(&format!(
        r"(?i){number}\s*(?:±|\+/-)\s*{number}|{number}\s*(?:-|–|to)\s*{number}\s*{unit}|{number}\s*{unit}"
    ))
    .expect("valid measurement pattern")
});

static FORMULA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z][\w]*\s*=\s*[\w.()]+(?:\s*[-+*/×÷^]\s*[\w.()]+)+")
        .expect("valid formula pattern")
});

/// Case-insensitive word-boundary pattern tolerant of any run of whitespace
/// between words.
fn mention_pattern(phrase: &str) -> Result<Regex, regex::Error> {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    Regex::new(&format!(r"(?i)\b{body}\b"))
}

/// Whether a token belongs to the relation keyword vocabulary.
pub fn is_relation_keyword_token(token: &str) -> bool {
    KEYWORD_TOKENS.contains(token.to_lowercase().as_str())
}

/// What decided the relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    MissingMention,
    Keyword { between: bool },
    Measurement,
    Formula,
    CoOccurrence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub relationship_type: RelationType,
    pub weight: f64,
    pub confidence: f64,
    pub signal: Signal,
}

impl Classification {
    fn missing_mention() -> Self {
        Self {
            relationship_type: RelationType::CorrelatesWith,
            weight: RelationType::CorrelatesWith.base_weight(),
            confidence: MISSING_MENTION_CONFIDENCE,
            signal: Signal::MissingMention,
        }
    }
}

struct KeywordHit {
    kind: RelationType,
    between: bool,
    distance: usize,
    len: usize,
}

/// Assigns a relation type, weight and confidence to two entities that share
/// a text unit.
#[derive(Debug, Clone)]
pub struct RelationshipClassifier {
    inclusion_threshold: f64,
    proximity_decay: f64,
}

impl Default for RelationshipClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl RelationshipClassifier {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            inclusion_threshold: config.inclusion_threshold,
            proximity_decay: config.proximity_decay.max(0.0),
        }
    }

    pub fn inclusion_threshold(&self) -> f64 {
        self.inclusion_threshold
    }

    /// Whether a classification is strong enough to become an edge.
    pub fn accepts(&self, classification: &Classification) -> bool {
        classification.confidence >= self.inclusion_threshold
    }

    pub fn classify(&self, text: &str, entity_a: &str, entity_b: &str) -> Classification {
        let (Some(a), Some(b)) = (mentions(text, entity_a), mentions(text, entity_b)) else {
            return Classification::missing_mention();
        };
        let (first, second) = closest_pair(&a, &b);

        let gap = if second.start > first.end {
            &text[first.end..second.start]
        } else {
            ""
        };
        let proximity = self.proximity(gap.split_whitespace().count());

        let (mut kind, mut confidence, mut signal) = match best_keyword(text, &first, &second)
        {
            Some(hit) => {
                let confidence = if hit.between {
                    BETWEEN_KEYWORD_CONFIDENCE
                } else {
                    OUTSIDE_KEYWORD_CONFIDENCE
                };
                (hit.kind, confidence, Signal::Keyword { between: hit.between })
            }
            None => (
                RelationType::CorrelatesWith,
                CO_OCCURRENCE_CONFIDENCE,
                Signal::CoOccurrence,
            ),
        };

        if FORMULA_PATTERN.is_match(text) {
            kind = RelationType::CalculatedBy;
            confidence = confidence.max(OVERRIDE_CONFIDENCE);
            signal = Signal::Formula;
        } else if MEASUREMENT_PATTERN.is_match(text) {
            kind = RelationType::MeasuredBy;
            confidence = confidence.max(OVERRIDE_CONFIDENCE);
            signal = Signal::Measurement;
        }

        Classification {
            relationship_type: kind,
            weight: kind.base_weight() * proximity,
            confidence: (confidence * proximity).clamp(0.0, 1.0),
            signal,
        }
    }

    /// 1.0 for adjacent mentions, decaying with every extra word in between.
    fn proximity(&self, words_between: usize) -> f64 {
        1.0 / (1.0 + self.proximity_decay * words_between.saturating_sub(1) as f64)
    }
}

fn mentions(text: &str, entity: &str) -> Option<Vec<Range<usize>>> {
    if entity.trim().is_empty() {
        return None;
    }
    let pattern = mention_pattern(entity).ok()?;
    let found: Vec<_> = pattern.find_iter(text).map(|m| m.range()).collect();
    (!found.is_empty()).then_some(found)
}

/// Mention pair with the smallest gap, returned in text order.
fn closest_pair(a: &[Range<usize>], b: &[Range<usize>]) -> (Range<usize>, Range<usize>) {
    let mut best: Option<(usize, Range<usize>, Range<usize>)> = None;
    for left in a {
        for right in b {
            let (first, second) = if left.start <= right.start {
                (left, right)
            } else {
                (right, left)
            };
            let gap = second.start.saturating_sub(first.end);
            if best.as_ref().map_or(true, |(g, _, _)| gap < *g) {
                best = Some((gap, first.clone(), second.clone()));
            }
        }
    }
    // both slices are non-empty
    best.map(|(_, first, second)| (first, second))
        .unwrap_or((a[0].clone(), b[0].clone()))
}

/// Best keyword: any between the mentions beats any outside, then the
/// closest, then the longest phrase.
fn best_keyword(text: &str, first: &Range<usize>, second: &Range<usize>) -> Option<KeywordHit> {
    let overlaps = |span: &Range<usize>, other: &Range<usize>| {
        span.start < other.end && other.start < span.end
    };

    let mut best: Option<KeywordHit> = None;
    for (pattern, kind) in KEYWORD_PATTERNS.iter() {
        for found in pattern.find_iter(text) {
            let span = found.range();
            if overlaps(&span, first) || overlaps(&span, second) {
                continue;
            }
            let between = span.start >= first.end && span.end <= second.start;
            let distance = if between {
                span.start - first.end
            } else if span.end <= first.start {
                first.start - span.end
            } else {
                span.start.saturating_sub(second.end)
            };
            let hit = KeywordHit {
                kind: *kind,
                between,
                distance,
                len: span.len(),
            };
            let better = match &best {
                None => true,
                Some(current) => {
                    (hit.between, std::cmp::Reverse(hit.distance), hit.len)
                        > (current.between, std::cmp::Reverse(current.distance), current.len)
                }
            };
            if better {
                best = Some(hit);
            }
        }
    }
    best
}
