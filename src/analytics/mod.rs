//! Read-only structural analytics over a consolidated graph.
//!
//! Centrality is partly approximate: closeness uses a hop-bounded BFS with a
//! sentinel distance for unreachable nodes, and betweenness is the square of
//! the node degree rather than a shortest-path count.

mod centrality;
mod communities;
mod gaps;
mod paths;
mod report;

use std::collections::BTreeMap;

use crate::config::AnalyticsConfig;
use crate::model::Graph;

pub use centrality::{DegreeScore, NodeScore, UNREACHABLE_DISTANCE};
pub use communities::{Community, CommunityStrategy};
pub use gaps::{StructuralGap, WEAK_CONNECTION_RATIO};
pub use paths::{GraphPath, PathMode};
pub use report::{AnalyticsReport, BasicMetrics, CentralityReport, CommunityReport};

/// One undirected step out of a node.
#[derive(Debug, Clone, Copy)]
struct Step<'g> {
    neighbor: &'g str,
    edge: usize,
}

/// Analytics view over a fixed graph snapshot.
///
/// Holds a shared borrow, so the graph cannot be merged into while any
/// analytics are running on it.
pub struct GraphAnalytics<'g> {
    graph: &'g Graph,
    adjacency: BTreeMap<&'g str, Vec<Step<'g>>>,
    config: AnalyticsConfig,
}

impl<'g> GraphAnalytics<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self::with_config(graph, &AnalyticsConfig::default())
    }

    pub fn with_config(graph: &'g Graph, config: &AnalyticsConfig) -> Self {
        let mut adjacency: BTreeMap<&'g str, Vec<Step<'g>>> =
            graph.node_ids().map(|id| (id, Vec::new())).collect();

        for (edge, e) in graph.edges().iter().enumerate() {
            if !graph.contains_node(&e.source) || !graph.contains_node(&e.target) {
                continue;
            }
            if let Some(steps) = adjacency.get_mut(e.source.as_str()) {
                steps.push(Step {
                    neighbor: &e.target,
                    edge,
                });
            }
            if e.source != e.target {
                if let Some(steps) = adjacency.get_mut(e.target.as_str()) {
                    steps.push(Step {
                        neighbor: &e.source,
                        edge,
                    });
                }
            }
        }
        for steps in adjacency.values_mut() {
            steps.sort_by(|a, b| a.neighbor.cmp(b.neighbor).then(a.edge.cmp(&b.edge)));
        }

        Self {
            graph,
            adjacency,
            config: config.clone(),
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    fn steps(&self, id: &str) -> &[Step<'g>] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn label_of(&self, id: &str) -> String {
        self.graph
            .node(id)
            .map(|n| n.label.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Node and edge counts, density, average and max degree.
    pub fn basic_metrics(&self) -> BasicMetrics {
        let n = self.graph.node_count();
        let m = self.graph.edge_count();
        let density = if n < 2 {
            0.0
        } else {
            m as f64 / (n as f64 * (n as f64 - 1.0) / 2.0)
        };
        let average_degree = if n == 0 {
            0.0
        } else {
            2.0 * m as f64 / n as f64
        };
        let max_degree = self
            .directed_degrees()
            .values()
            .map(|(inn, out)| inn + out)
            .max()
            .unwrap_or(0);

        BasicMetrics {
            node_count: n,
            edge_count: m,
            density,
            average_degree,
            max_degree,
        }
    }
}
