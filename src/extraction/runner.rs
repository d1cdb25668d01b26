//! Concurrent, time-bounded extraction of partial graphs.
//!
//! Units are independent: each one runs on the blocking pool under its own
//! timeout and either yields a whole partial graph or is reported as failed.
//! A timed-out unit contributes nothing.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::chunker::{TextChunker, TextUnit};
use super::table::TableExtractor;
use super::text::TextExtractor;
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::metrics::{self, UnitOutcome};
use crate::model::PartialGraph;

/// Input handed to a worker.
#[derive(Debug, Clone)]
pub enum UnitPayload {
    Text(TextUnit),
    Table { source: String, csv: String },
    Partial(PartialGraph),
}

#[derive(Debug, Clone)]
pub struct ExtractionUnit {
    pub id: String,
    pub payload: UnitPayload,
}

impl ExtractionUnit {
    pub fn text(unit: TextUnit) -> Self {
        Self {
            id: unit.id.clone(),
            payload: UnitPayload::Text(unit),
        }
    }

    pub fn table(source: impl Into<String>, csv: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: source.clone(),
            payload: UnitPayload::Table {
                source,
                csv: csv.into(),
            },
        }
    }

    pub fn partial(id: impl Into<String>, partial: PartialGraph) -> Self {
        Self {
            id: id.into(),
            payload: UnitPayload::Partial(partial),
        }
    }

    /// One unit per chunk of `text`.
    pub fn document(chunker: &TextChunker, source: &str, text: &str) -> Vec<Self> {
        chunker
            .chunk(text, source)
            .into_iter()
            .map(Self::text)
            .collect()
    }
}

/// Turns one unit into a partial graph. Implementations run on the blocking
/// pool and must not share mutable state between calls.
pub trait UnitExtractor: Send + Sync {
    fn extract(&self, unit: ExtractionUnit) -> Result<PartialGraph>;
}

/// Text and table heuristics; pre-structured partials pass through.
#[derive(Debug, Clone)]
pub struct HeuristicExtractor {
    text: TextExtractor,
    table: TableExtractor,
}

impl HeuristicExtractor {
    pub fn new(text: TextExtractor, table: TableExtractor) -> Self {
        Self { text, table }
    }
}

impl UnitExtractor for HeuristicExtractor {
    fn extract(&self, unit: ExtractionUnit) -> Result<PartialGraph> {
        match unit.payload {
            UnitPayload::Text(text_unit) => Ok(self.text.extract(&text_unit)),
            UnitPayload::Table { source, csv } => self.table.extract(&source, &csv),
            UnitPayload::Partial(partial) => Ok(partial),
        }
    }
}

#[derive(Debug)]
pub struct CompletedUnit {
    pub unit_id: String,
    pub partial: PartialGraph,
}

#[derive(Debug)]
pub struct UnitFailure {
    pub unit_id: String,
    pub error: Error,
}

/// Everything the runner produced, sorted by unit id.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub completed: Vec<CompletedUnit>,
    pub failures: Vec<UnitFailure>,
}

impl ExtractionReport {
    pub fn partials(&self) -> impl Iterator<Item = &PartialGraph> {
        self.completed.iter().map(|c| &c.partial)
    }

    pub fn completed_ids(&self) -> Vec<String> {
        self.completed.iter().map(|c| c.unit_id.clone()).collect()
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.unit_id.clone()).collect()
    }

    pub fn timed_out(&self) -> usize {
        self.failures.iter().filter(|f| f.error.is_timeout()).count()
    }
}

pub struct ExtractionRunner {
    extractor: Arc<dyn UnitExtractor>,
    concurrency: usize,
    timeout: Duration,
}

impl ExtractionRunner {
    pub fn new(extractor: Arc<dyn UnitExtractor>, config: &ExtractionConfig) -> Self {
        Self {
            extractor,
            concurrency: config.concurrency.max(1),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, units: Vec<ExtractionUnit>) -> ExtractionReport {
        let total = units.len();
        let results: Vec<(String, Result<PartialGraph>)> = stream::iter(
            units.into_iter().map(|unit| self.run_unit(unit)),
        )
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let mut report = ExtractionReport::default();
        for (unit_id, result) in results {
            match result {
                Ok(partial) => {
                    metrics::record_extraction_unit(UnitOutcome::Ok);
                    report.completed.push(CompletedUnit { unit_id, partial });
                }
                Err(error) => {
                    let outcome = if error.is_timeout() {
                        UnitOutcome::Timeout
                    } else {
                        UnitOutcome::Failed
                    };
                    metrics::record_extraction_unit(outcome);
                    warn!(unit = %unit_id, "Extraction unit discarded: {}", error);
                    report.failures.push(UnitFailure { unit_id, error });
                }
            }
        }
        report.completed.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
        report.failures.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));

        info!(
            total,
            completed = report.completed.len(),
            failed = report.failures.len(),
            "Extraction finished"
        );
        report
    }

    async fn run_unit(&self, unit: ExtractionUnit) -> (String, Result<PartialGraph>) {
        let unit_id = unit.id.clone();
        let extractor = Arc::clone(&self.extractor);
        let task = tokio::task::spawn_blocking(move || extractor.extract(unit));

        // a timed-out blocking task keeps running, but its result is never read
        let result = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(Error::ExtractionTimeout {
                unit: unit_id.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Ok(Err(join_error)) => Err(Error::from(join_error)),
            Ok(Ok(Err(error))) => Err(match error {
                Error::ExtractionFailed { .. } | Error::ExtractionTimeout { .. } => error,
                other => Error::ExtractionFailed {
                    unit: unit_id.clone(),
                    reason: other.to_string(),
                },
            }),
            Ok(Ok(Ok(partial))) => Ok(partial),
        };
        debug!(unit = %unit_id, ok = result.is_ok(), "Unit finished");
        (unit_id, result)
    }
}
