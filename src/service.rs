//! End-to-end consolidation: extract, merge, document, cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, MergeConfig};
use crate::extraction::{
    EntityNormalizer, ExtractionRunner, ExtractionUnit, HeuristicExtractor, RelationshipClassifier,
    TableExtractor, TextExtractor, UnitExtractor, UnitFailure,
};
use crate::merge::{GraphMerger, MergeMode, ResultCache, StructuralWarning};
use crate::model::{Graph, GraphDocument};

pub const EXTRACTION_METHOD: &str = "heuristic";
pub const FALLBACK_METHOD: &str = "fallback";

/// Result of one consolidation request.
#[derive(Debug)]
pub struct Consolidation {
    pub request_id: String,
    pub document: GraphDocument,
    pub warnings: Vec<StructuralWarning>,
    pub failures: Vec<UnitFailure>,
    /// The merge produced no nodes and the sample graph was substituted.
    pub used_fallback: bool,
    /// Served from the cache without re-running anything.
    pub cached: bool,
}

impl Consolidation {
    pub fn graph(&self) -> Graph {
        self.document.to_graph()
    }
}

/// Owns the extraction pipeline, the merger and the bounded result cache.
pub struct ConsolidationService {
    runner: ExtractionRunner,
    merger: GraphMerger,
    merge_config: MergeConfig,
    cache: Mutex<ResultCache<String, GraphDocument>>,
}

impl ConsolidationService {
    pub fn new(config: &Config) -> Self {
        let normalizer = EntityNormalizer::from_config(&config.normalizer);
        let classifier = RelationshipClassifier::from_config(&config.classifier);
        let text = TextExtractor::new(normalizer.clone(), classifier).with_limits(
            &config.extraction,
            &config.classifier,
            &config.merge,
        );
        let table = TableExtractor::with_sizes(normalizer, &config.merge);
        Self::with_extractor(config, Arc::new(HeuristicExtractor::new(text, table)))
    }

    /// Same pipeline around a caller-supplied extractor.
    pub fn with_extractor(config: &Config, extractor: Arc<dyn UnitExtractor>) -> Self {
        Self {
            runner: ExtractionRunner::new(extractor, &config.extraction),
            merger: GraphMerger::new(&config.merge),
            merge_config: config.merge.clone(),
            cache: Mutex::new(ResultCache::new(config.cache_capacity)),
        }
    }

    pub fn merger(&self) -> &GraphMerger {
        &self.merger
    }

    fn cache(&self) -> MutexGuard<'_, ResultCache<String, GraphDocument>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached document for a request, if still held.
    pub fn cached(&self, request_id: &str) -> Option<GraphDocument> {
        self.cache().get(&request_id.to_string()).cloned()
    }

    pub fn cache_len(&self) -> usize {
        self.cache().len()
    }

    /// Run every unit, merge the survivors and fold them into `existing`.
    ///
    /// A request id that is still cached returns the cached document without
    /// extracting again, so retried requests do not double edge weights.
    pub async fn consolidate(
        &self,
        request_id: Option<String>,
        units: Vec<ExtractionUnit>,
        existing: Option<&Graph>,
        mode: MergeMode,
    ) -> Consolidation {
        if let Some(id) = request_id.as_deref() {
            if let Some(document) = self.cached(id) {
                info!(request = %id, "Returning cached consolidation");
                return Consolidation {
                    request_id: id.to_string(),
                    document,
                    warnings: Vec::new(),
                    failures: Vec::new(),
                    used_fallback: false,
                    cached: true,
                };
            }
        }
        let request_id = request_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let report = self.runner.run(units).await;
        let batch = self.merger.merge_partials(report.partials());
        let mut warnings = batch.warnings;

        let mut outcome = match existing {
            Some(existing) => {
                let folded = self.merger.merge_into(existing, &batch.graph, mode);
                warnings.extend(folded.warnings);
                folded.graph
            }
            None => batch.graph,
        };

        let mut used_fallback = false;
        if outcome.is_empty() {
            if self.merge_config.fallback_on_empty {
                warn!(request = %request_id, "Empty merge, substituting sample graph");
                outcome = GraphMerger::fallback_graph();
                used_fallback = true;
            } else {
                warn!(request = %request_id, "Empty merge");
            }
        }

        let method = if used_fallback {
            FALLBACK_METHOD
        } else {
            EXTRACTION_METHOD
        };
        let document = GraphDocument::from_graph(&outcome, method)
            .with_units(report.completed_ids(), report.failed_ids());

        info!(
            request = %request_id,
            nodes = document.metadata.node_count,
            edges = document.metadata.edge_count,
            failed_units = report.failures.len(),
            warnings = warnings.len(),
            "Consolidation finished"
        );

        self.cache().insert(request_id.clone(), document.clone());

        Consolidation {
            request_id,
            document,
            warnings,
            failures: report.failures,
            used_fallback,
            cached: false,
        }
    }
}
