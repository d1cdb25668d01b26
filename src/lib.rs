//! Concept graph consolidation library
//!
//! This library provides tools to:
//! - Normalize extracted entity labels into canonical concept ids
//! - Classify relationships between co-mentioned concepts
//! - Run extraction units concurrently with per-unit timeouts
//! - Merge partial graphs into one canonical graph, order-independently
//! - Compute structural analytics: centrality, communities, gaps and paths

pub mod analytics;
pub mod config;
pub mod error;
pub mod extraction;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod service;

// Re-export common types
pub use analytics::{AnalyticsReport, CommunityStrategy, GraphAnalytics, PathMode};
pub use config::Config;
pub use error::{Error, Result};
pub use extraction::{
    canonical_id, EntityNormalizer, ExtractionRunner, ExtractionUnit, RelationshipClassifier,
};
pub use merge::{GraphMerger, MergeMode, MergeOutcome, StructuralWarning};
pub use model::{Edge, Graph, GraphDocument, Node, NodeType, PartialGraph, RelationType};
pub use service::{Consolidation, ConsolidationService};

// Commands use the re-exported types, so they are declared last
pub mod commands;
