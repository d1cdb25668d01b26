use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::analytics::{CommunityStrategy, GraphAnalytics};
use crate::config::Config;
use crate::metrics;

#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub input: PathBuf,
    pub strategy: CommunityStrategy,
    pub top: Option<usize>,
    pub max_depth: Option<usize>,
    pub output: Option<PathBuf>,
}

/// Write the structural report for a stored graph document.
pub fn run(args: AnalyzeArgs, config: &Config) -> Result<()> {
    let graph = super::load_graph(&args.input)?;

    let mut analytics_config = config.analytics.clone();
    if let Some(top) = args.top {
        analytics_config.top_n = top;
    }
    if let Some(depth) = args.max_depth {
        analytics_config.max_depth = depth;
    }

    let report = GraphAnalytics::with_config(&graph, &analytics_config).report(args.strategy);
    metrics::record_graph_size("analyze", graph.node_count(), graph.edge_count());
    super::write_json(&report, args.output.as_deref())?;
    info!(
        input = %args.input.display(),
        strategy = %args.strategy,
        modularity = report.communities.modularity,
        "Analysis written"
    );
    Ok(())
}
