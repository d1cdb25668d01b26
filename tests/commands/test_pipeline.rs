//! Extract then merge through the command layer, against real files.

use std::fs;

use concept_graph::commands::{extract, merge};
use concept_graph::merge::MergeMode;
use concept_graph::model::GraphDocument;
use concept_graph::Config;
use tempfile::TempDir;

#[tokio::test]
async fn test_extract_mixed_inputs() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir(&inputs).unwrap();
    fs::write(
        inputs.join("notes.txt"),
        "ABA inhibits stomatal opening. Stomatal closure reduces transpiration.",
    )
    .unwrap();
    fs::write(
        inputs.join("partial.json"),
        r#"{"nodes":[{"id":"n1","label":"Stomatal opening","val":40}],"links":[]}"#,
    )
    .unwrap();
    let output = dir.path().join("graph.json");

    extract::run(
        extract::ExtractArgs {
            inputs: vec![inputs],
            output: Some(output.clone()),
            existing: None,
            mode: MergeMode::Update,
            request_id: Some("it-1".into()),
        },
        &Config::defaults(),
    )
    .await
    .unwrap();

    let document = GraphDocument::load(&output).unwrap();
    let opening = document
        .nodes
        .iter()
        .find(|n| n.id == "stomatal_opening")
        .unwrap();
    assert_eq!(opening.size, 40.0);
    assert_eq!(document.metadata.extraction_method, "heuristic");
    assert_eq!(document.metadata.source_units.len(), 2);
    assert!(document.metadata.failed_units.is_empty());
}

#[test]
fn test_merge_into_existing_append_keeps_stored_edges() {
    let dir = TempDir::new().unwrap();
    let existing = dir.path().join("existing.json");
    fs::write(
        &existing,
        r#"{"nodes":[{"id":"leaf","label":"Leaf","type":"material","size":20},
                     {"id":"water","label":"Water","type":"material","size":20}],
            "edges":[{"source":"leaf","target":"water","relationshipType":"DEPENDS_ON",
                      "weight":4,"confidence":0.9}],
            "metadata":{"node_count":2,"edge_count":1,"extraction_method":"merge",
                        "extracted_at":"2024-05-01T12:00:00Z"}}"#,
    )
    .unwrap();
    let batch = dir.path().join("batch.json");
    fs::write(
        &batch,
        r#"{"nodes":[{"label":"Water"},{"label":"Leaf"},{"label":"Root"}],
            "edges":[{"source":"water","target":"leaf","relation":"CAUSES","weight":9},
                     {"source":"root","target":"water","relation":"DEPENDS_ON","weight":1}]}"#,
    )
    .unwrap();
    let output = dir.path().join("merged.json");

    merge::run(
        merge::MergeArgs {
            inputs: vec![batch],
            existing: Some(existing),
            mode: MergeMode::Append,
            output: Some(output.clone()),
        },
        &Config::defaults(),
    )
    .unwrap();

    let document = GraphDocument::load(&output).unwrap();
    assert_eq!(document.metadata.node_count, 3);
    assert_eq!(document.edges.len(), 2);
    let stored = document
        .edges
        .iter()
        .find(|e| e.touches("leaf") && e.touches("water"))
        .unwrap();
    assert_eq!(stored.weight, 4.0);
}
