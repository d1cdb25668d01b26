use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::node::Attributes;

/// Fixed relation taxonomy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    #[default]
    RelatedTo,
    Influences,
    DependsOn,
    MeasuredBy,
    CalculatedBy,
    PartOf,
    Causes,
    CorrelatesWith,
    DefinedAs,
    Inhibits,
    Activates,
    Catalyzes,
    Regulates,
    BindsTo,
    SimilarTo,
}

impl RelationType {
    pub fn all() -> &'static [RelationType] {
        const ALL: &[RelationType] = &[
            RelationType::RelatedTo,
            RelationType::Influences,
            RelationType::DependsOn,
            RelationType::MeasuredBy,
            RelationType::CalculatedBy,
            RelationType::PartOf,
            RelationType::Causes,
            RelationType::CorrelatesWith,
            RelationType::DefinedAs,
            RelationType::Inhibits,
            RelationType::Activates,
            RelationType::Catalyzes,
            RelationType::Regulates,
            RelationType::BindsTo,
            RelationType::SimilarTo,
        ];
        ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::RelatedTo => "RELATED_TO",
            RelationType::Influences => "INFLUENCES",
            RelationType::DependsOn => "DEPENDS_ON",
            RelationType::MeasuredBy => "MEASURED_BY",
            RelationType::CalculatedBy => "CALCULATED_BY",
            RelationType::PartOf => "PART_OF",
            RelationType::Causes => "CAUSES",
            RelationType::CorrelatesWith => "CORRELATES_WITH",
            RelationType::DefinedAs => "DEFINED_AS",
            RelationType::Inhibits => "INHIBITS",
            RelationType::Activates => "ACTIVATES",
            RelationType::Catalyzes => "CATALYZES",
            RelationType::Regulates => "REGULATES",
            RelationType::BindsTo => "BINDS_TO",
            RelationType::SimilarTo => "SIMILAR_TO",
        }
    }

    /// Base weight before proximity scaling. Causal relations weigh most,
    /// plain correlation least.
    pub fn base_weight(self) -> f64 {
        match self {
            RelationType::Causes | RelationType::Activates | RelationType::Inhibits => 5.0,
            RelationType::Regulates
            | RelationType::Catalyzes
            | RelationType::DependsOn
            | RelationType::Influences => 4.0,
            RelationType::PartOf
            | RelationType::BindsTo
            | RelationType::MeasuredBy
            | RelationType::CalculatedBy
            | RelationType::DefinedAs => 3.0,
            RelationType::SimilarTo | RelationType::RelatedTo => 2.0,
            RelationType::CorrelatesWith => 1.0,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        RelationType::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .or_else(|| match normalized.as_str() {
                "RELATES_TO" | "RELATED" => Some(RelationType::RelatedTo),
                "INFLUENCE" | "AFFECTS" => Some(RelationType::Influences),
                "DEPENDS" | "REQUIRES" => Some(RelationType::DependsOn),
                "CAUSE" | "LEADS_TO" => Some(RelationType::Causes),
                "CORRELATES" | "CORRELATED_WITH" | "CO_OCCURS" => {
                    Some(RelationType::CorrelatesWith)
                }
                "INHIBIT" => Some(RelationType::Inhibits),
                "ACTIVATE" => Some(RelationType::Activates),
                "CATALYSES" | "CATALYZE" => Some(RelationType::Catalyzes),
                "REGULATE" => Some(RelationType::Regulates),
                "BINDS" => Some(RelationType::BindsTo),
                "SIMILAR" => Some(RelationType::SimilarTo),
                _ => None,
            })
            .ok_or_else(|| format!("unknown relationship type: {}", s))
    }
}

/// Relationship between two canonical nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "relationshipType", alias = "relationship_type")]
    pub relationship_type: RelationType,
    /// Aggregated observation weight (> 0)
    pub weight: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship_type: RelationType,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship_type,
            weight: relationship_type.base_weight(),
            confidence: 0.5,
            evidence: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.source, &self.target, self.relationship_type)
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Endpoint opposite to `node_id`, if the edge touches it.
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source == node_id {
            Some(&self.target)
        } else if self.target == node_id {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// Dedup key: unordered endpoint pair plus relation type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub low: String,
    pub high: String,
    pub relationship_type: RelationType,
}

impl EdgeKey {
    pub fn new(a: &str, b: &str, relationship_type: RelationType) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.to_string(),
            high: high.to_string(),
            relationship_type,
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }
}
