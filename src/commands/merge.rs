//! Merge partial-graph or graph-document JSON files into one document.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::merge::{GraphMerger, MergeMode};
use crate::metrics;
use crate::model::{GraphDocument, PartialGraph};

pub const MERGE_METHOD: &str = "merge";

#[derive(Debug, Clone)]
pub struct MergeArgs {
    pub inputs: Vec<PathBuf>,
    pub existing: Option<PathBuf>,
    pub mode: MergeMode,
    pub output: Option<PathBuf>,
}

pub fn run(args: MergeArgs, config: &Config) -> Result<()> {
    let mut partials = Vec::with_capacity(args.inputs.len());
    let mut sources = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let partial = PartialGraph::from_json(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        partials.push(partial);
        sources.push(path.display().to_string());
    }

    let merger = GraphMerger::new(&config.merge);
    let batch = merger.merge_partials(&partials);
    let mut warnings = batch.warnings;

    let mut graph = match args.existing.as_deref() {
        Some(path) => {
            let existing = super::load_graph(path)?;
            let folded = merger.merge_into(&existing, &batch.graph, args.mode);
            warnings.extend(folded.warnings);
            folded.graph
        }
        None => batch.graph,
    };

    for warning in &warnings {
        warn!("{}", warning);
    }

    let mut method = MERGE_METHOD;
    if graph.is_empty() && config.merge.fallback_on_empty {
        warn!("Merge produced no nodes, writing the sample graph");
        graph = GraphMerger::fallback_graph();
        method = crate::service::FALLBACK_METHOD;
    }

    let document = GraphDocument::from_graph(&graph, method).with_units(sources, Vec::new());
    super::write_json(&document, args.output.as_deref())?;
    metrics::record_graph_size(
        "merge",
        document.metadata.node_count,
        document.metadata.edge_count,
    );
    info!(
        mode = %args.mode,
        inputs = args.inputs.len(),
        nodes = document.metadata.node_count,
        edges = document.metadata.edge_count,
        warnings = warnings.len(),
        "Merge written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, json: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn merges_files_and_sums_weights() {
        let dir = TempDir::new().unwrap();
        let a = write(
            &dir,
            "a.json",
            r#"{"nodes":[{"label":"Chlorophyll a","val":30},{"label":"Light"}],
                "edges":[{"source":"chlorophyll_a","target":"light","relation":"ACTIVATES","weight":3}]}"#,
        );
        let b = write(
            &dir,
            "b.json",
            r#"{"nodes":[{"label":"chlorophyll-a","val":45},{"label":"Light"}],
                "links":[{"source":"light","target":"chlorophyll-a","relation":"ACTIVATES","weight":2}]}"#,
        );
        let output = dir.path().join("merged.json");

        run(
            MergeArgs {
                inputs: vec![a, b],
                existing: None,
                mode: MergeMode::Update,
                output: Some(output.clone()),
            },
            &Config::defaults(),
        )
        .unwrap();

        let document = GraphDocument::load(&output).unwrap();
        assert_eq!(document.metadata.node_count, 2);
        assert_eq!(document.metadata.extraction_method, MERGE_METHOD);
        let chlorophyll = document
            .nodes
            .iter()
            .find(|n| n.id == "chlorophyll_a")
            .unwrap();
        assert_eq!(chlorophyll.size, 45.0);
        assert_eq!(document.edges.len(), 1);
        assert_eq!(document.edges[0].weight, 5.0);
    }

    #[test]
    fn replace_mode_discards_existing() {
        let dir = TempDir::new().unwrap();
        let existing = write(
            &dir,
            "existing.json",
            r#"{"nodes":[{"id":"leaf","label":"Leaf","type":"material","size":10}],
                "edges":[],
                "metadata":{"node_count":1,"edge_count":0,"extraction_method":"merge",
                            "extracted_at":"2024-01-01T00:00:00Z"}}"#,
        );
        let batch = write(&dir, "batch.json", r#"{"nodes":[{"label":"Root"}]}"#);
        let output = dir.path().join("out.json");

        run(
            MergeArgs {
                inputs: vec![batch],
                existing: Some(existing),
                mode: MergeMode::Replace,
                output: Some(output.clone()),
            },
            &Config::defaults(),
        )
        .unwrap();

        let document = GraphDocument::load(&output).unwrap();
        let ids: Vec<_> = document.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["root"]);
    }

    #[test]
    fn unreadable_input_reports_path() {
        let err = run(
            MergeArgs {
                inputs: vec![PathBuf::from("/nonexistent/partial.json")],
                existing: None,
                mode: MergeMode::Update,
                output: None,
            },
            &Config::defaults(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/partial.json"));
    }
}
