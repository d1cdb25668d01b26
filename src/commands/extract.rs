//! Extract partial graphs from a set of files and consolidate them.
//!
//! `.txt`/`.md` files are chunked into text units, `.csv` files become one
//! table unit each and `.json` files are read as pre-structured partial
//! graphs. Directories are walked recursively.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::extraction::{ExtractionUnit, TextChunker};
use crate::merge::MergeMode;
use crate::metrics;
use crate::model::PartialGraph;
use crate::service::ConsolidationService;

#[derive(Debug, Clone)]
pub struct ExtractArgs {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub existing: Option<PathBuf>,
    pub mode: MergeMode,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Text,
    Table,
    Partial,
}

fn input_kind(path: &Path) -> Option<InputKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "md" | "markdown" => Some(InputKind::Text),
        "csv" => Some(InputKind::Table),
        "json" => Some(InputKind::Partial),
        _ => None,
    }
}

/// Files under `inputs` that can be turned into units, in path order.
pub fn collect_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = inputs
        .iter()
        .flat_map(|input| {
            WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!("Skipping unreadable path: {}", err);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
        })
        .filter(|path| input_kind(path).is_some())
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Read one file into extraction units.
pub fn load_units(path: &Path, chunker: &TextChunker) -> Result<Vec<ExtractionUnit>> {
    let source = path.display().to_string();
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", source))?;

    let units = match input_kind(path) {
        Some(InputKind::Text) => ExtractionUnit::document(chunker, &source, &content),
        Some(InputKind::Table) => vec![ExtractionUnit::table(source, content)],
        Some(InputKind::Partial) => {
            let partial = PartialGraph::from_json(&content)
                .with_context(|| format!("failed to parse partial graph {}", source))?;
            vec![ExtractionUnit::partial(source, partial)]
        }
        None => Vec::new(),
    };
    debug!(file = %path.display(), units = units.len(), "Loaded input");
    Ok(units)
}

pub async fn run(args: ExtractArgs, config: &Config) -> Result<()> {
    let files = collect_files(&args.inputs);
    if files.is_empty() {
        warn!("No .txt, .md, .csv or .json inputs found");
    }

    let chunker = TextChunker::from_config(&config.extraction);
    let mut units = Vec::new();
    for file in &files {
        units.extend(load_units(file, &chunker)?);
    }
    info!(files = files.len(), units = units.len(), "Starting extraction");

    let existing = match args.existing.as_deref() {
        Some(path) => Some(super::load_graph(path)?),
        None => None,
    };

    let service = ConsolidationService::new(config);
    let outcome = service
        .consolidate(args.request_id, units, existing.as_ref(), args.mode)
        .await;

    for failure in &outcome.failures {
        warn!(unit = %failure.unit_id, "{}", failure.error);
    }
    for warning in &outcome.warnings {
        debug!("{}", warning);
    }
    if outcome.used_fallback {
        warn!("No concepts survived extraction; wrote the sample graph instead");
    }

    super::write_json(&outcome.document, args.output.as_deref())?;
    metrics::record_graph_size(
        "extract",
        outcome.document.metadata.node_count,
        outcome.document.metadata.edge_count,
    );
    info!(
        request = %outcome.request_id,
        nodes = outcome.document.metadata.node_count,
        edges = outcome.document.metadata.edge_count,
        failed_units = outcome.failures.len(),
        "Extraction finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collects_supported_files_recursively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.txt"), "text").unwrap();
        fs::write(dir.path().join("nested/b.csv"), "x,y").unwrap();
        fs::write(dir.path().join("nested/c.json"), "{}").unwrap();
        fs::write(dir.path().join("ignored.png"), "").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()]);
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name()?.to_str())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.csv", "c.json"]);
    }

    #[test]
    fn text_files_are_chunked_and_json_parsed() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("notes.md");
        fs::write(&text, "Light drives photosynthesis. Water enters roots.").unwrap();
        let json = dir.path().join("partial.json");
        fs::write(&json, r#"{"nodes":[{"label":"Leaf"}],"links":[]}"#).unwrap();

        let chunker = TextChunker::default();
        let text_units = load_units(&text, &chunker).unwrap();
        assert_eq!(text_units.len(), 1);
        assert!(text_units[0].id.ends_with("notes.md#0"));

        let json_units = load_units(&json, &chunker).unwrap();
        assert_eq!(json_units.len(), 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("broken.json");
        fs::write(&json, "{nodes").unwrap();
        assert!(load_units(&json, &TextChunker::default()).is_err());
    }

    #[tokio::test]
    async fn writes_consolidated_document() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("one.json"),
            r#"{"nodes":[{"id":"1","label":"Light"},{"id":"2","label":"Glucose"}],
                "edges":[{"source":"1","target":"2","relationshipType":"CAUSES","weight":2}]}"#,
        )
        .unwrap();
        let output = dir.path().join("out/graph.json");

        run(
            ExtractArgs {
                inputs: vec![dir.path().to_path_buf()],
                output: Some(output.clone()),
                existing: None,
                mode: MergeMode::Update,
                request_id: None,
            },
            &Config::defaults(),
        )
        .await
        .unwrap();

        let document = crate::model::GraphDocument::load(&output).unwrap();
        assert_eq!(document.metadata.node_count, 2);
        assert!(document.edges[0].touches("light"));
    }
}
