use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::analytics::{GraphAnalytics, GraphPath, PathMode};
use crate::config::Config;
use crate::error::Error;
use crate::extraction::canonical_id;
use crate::model::Graph;

#[derive(Debug, Clone)]
pub struct PathsArgs {
    pub input: PathBuf,
    pub from: String,
    pub to: String,
    pub all: bool,
    pub max_hops: Option<usize>,
    pub output: Option<PathBuf>,
}

/// Accept either a stored id or a label that canonicalises to one.
fn resolve_node(graph: &Graph, raw: &str) -> Result<String> {
    if graph.contains_node(raw) {
        return Ok(raw.to_string());
    }
    let id = canonical_id(raw);
    if graph.contains_node(&id) {
        Ok(id)
    } else {
        Err(Error::NodeNotFound(raw.to_string()).into())
    }
}

pub fn find(args: &PathsArgs, config: &Config) -> Result<Vec<GraphPath>> {
    let graph = super::load_graph(&args.input)?;
    let from = resolve_node(&graph, &args.from).context("unknown start node")?;
    let to = resolve_node(&graph, &args.to).context("unknown end node")?;

    let mode = if args.all {
        PathMode::All
    } else {
        PathMode::Shortest
    };
    let max_hops = args.max_hops.unwrap_or(config.analytics.max_depth);
    let paths = GraphAnalytics::with_config(&graph, &config.analytics)
        .find_paths(&from, &to, mode, max_hops);
    info!(%from, %to, %mode, max_hops, found = paths.len(), "Path search finished");
    Ok(paths)
}

pub fn run(args: PathsArgs, config: &Config) -> Result<()> {
    let paths = find(&args, config)?;
    super::write_json(&paths, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, GraphDocument, Node, NodeType, RelationType};
    use tempfile::TempDir;

    fn stored_chain(dir: &TempDir) -> PathBuf {
        let graph = Graph::from_parts(
            [("light", "Light"), ("chlorophyll_a", "Chlorophyll a"), ("glucose", "Glucose")]
                .map(|(id, label)| Node::new(id, label, NodeType::Concept)),
            vec![
                Edge::new("light", "chlorophyll_a", RelationType::Activates),
                Edge::new("chlorophyll_a", "glucose", RelationType::Causes),
            ],
        );
        let path = dir.path().join("graph.json");
        GraphDocument::from_graph(&graph, "test").save(&path).unwrap();
        path
    }

    fn args(input: PathBuf, from: &str, to: &str) -> PathsArgs {
        PathsArgs {
            input,
            from: from.into(),
            to: to.into(),
            all: false,
            max_hops: None,
            output: None,
        }
    }

    #[test]
    fn labels_resolve_to_ids() {
        let dir = TempDir::new().unwrap();
        let input = stored_chain(&dir);
        let paths = find(&args(input, "Light", "glucose"), &Config::defaults()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].nodes, vec!["light", "chlorophyll_a", "glucose"]);
    }

    #[test]
    fn unknown_node_is_reported() {
        let dir = TempDir::new().unwrap();
        let input = stored_chain(&dir);
        let err = find(&args(input, "Light", "Oxygen"), &Config::defaults()).unwrap_err();
        assert!(err
            .chain()
            .any(|cause| cause.to_string().contains("Node not found: Oxygen")));
    }

    #[test]
    fn hop_limit_can_hide_paths() {
        let dir = TempDir::new().unwrap();
        let input = stored_chain(&dir);
        let mut request = args(input, "light", "glucose");
        request.max_hops = Some(1);
        request.all = true;
        assert!(find(&request, &Config::defaults()).unwrap().is_empty());
    }
}
