//! Analytics and path commands over a stored document.

use concept_graph::analytics::CommunityStrategy;
use concept_graph::commands::{analyze, paths};
use concept_graph::merge::GraphMerger;
use concept_graph::model::GraphDocument;
use concept_graph::Config;
use tempfile::TempDir;

fn stored_fallback(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("graph.json");
    GraphDocument::from_graph(&GraphMerger::fallback_graph(), "fallback")
        .save(&path)
        .unwrap();
    path
}

#[test]
fn test_analyze_fallback_graph() {
    let dir = TempDir::new().unwrap();
    let input = stored_fallback(&dir);
    let output = dir.path().join("report.json");

    analyze::run(
        analyze::AnalyzeArgs {
            input,
            strategy: CommunityStrategy::ConnectedComponents,
            top: Some(3),
            max_depth: None,
            output: Some(output.clone()),
        },
        &Config::defaults(),
    )
    .unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
    assert_eq!(report["basic_metrics"]["node_count"], 8);
    assert_eq!(report["basic_metrics"]["edge_count"], 8);
    assert_eq!(report["centrality"]["degree"][0]["id"], "photosynthesis");
    assert_eq!(report["communities"]["communities"].as_array().unwrap().len(), 1);
    assert_eq!(report["structural_gaps"][0]["kind"], "isolated_cluster");
}

#[test]
fn test_paths_between_labels() {
    let dir = TempDir::new().unwrap();
    let input = stored_fallback(&dir);

    let found = paths::find(
        &paths::PathsArgs {
            input,
            from: "Stomata".into(),
            to: "Glucose".into(),
            all: false,
            max_hops: None,
            output: None,
        },
        &Config::defaults(),
    )
    .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].nodes,
        vec!["stomata", "carbon_dioxide", "photosynthesis", "glucose"]
    );
    assert_eq!(found[0].hops(), 3);
}
