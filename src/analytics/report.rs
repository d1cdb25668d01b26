use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{
    Community, CommunityStrategy, DegreeScore, GraphAnalytics, NodeScore, StructuralGap,
    UNREACHABLE_DISTANCE,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_degree: f64,
    pub max_degree: usize,
}

/// Top-N slices of each centrality ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityReport {
    pub top_n: usize,
    pub degree: Vec<DegreeScore>,
    pub closeness: Vec<NodeScore>,
    pub betweenness: Vec<NodeScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityReport {
    pub strategy: CommunityStrategy,
    pub communities: Vec<Community>,
    pub modularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub basic_metrics: BasicMetrics,
    pub centrality: CentralityReport,
    pub communities: CommunityReport,
    pub structural_gaps: Vec<StructuralGap>,
    /// Caveats on the approximated measures.
    pub notes: Vec<String>,
}

impl AnalyticsReport {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<'g> GraphAnalytics<'g> {
    pub fn centrality(&self) -> CentralityReport {
        let top_n = self.config.top_n;
        let mut degree = self.degree_centrality();
        let mut closeness = self.closeness_centrality();
        let mut betweenness = self.betweenness_centrality();
        degree.truncate(top_n);
        closeness.truncate(top_n);
        betweenness.truncate(top_n);
        CentralityReport {
            top_n,
            degree,
            closeness,
            betweenness,
        }
    }

    pub fn community_report(&self, strategy: CommunityStrategy) -> CommunityReport {
        let communities = self.communities(strategy);
        let modularity = self.modularity(&communities);
        CommunityReport {
            strategy,
            communities,
            modularity,
        }
    }

    /// Full structural report. Never fails: degenerate graphs produce zeros
    /// and empty lists.
    pub fn report(&self, strategy: CommunityStrategy) -> AnalyticsReport {
        let basic_metrics = self.basic_metrics();
        let centrality = self.centrality();
        let communities = self.community_report(strategy);
        let structural_gaps = self.structural_gaps(&communities.communities);

        info!(
            nodes = basic_metrics.node_count,
            edges = basic_metrics.edge_count,
            communities = communities.communities.len(),
            gaps = structural_gaps.len(),
            "Graph analysed"
        );

        AnalyticsReport {
            generated_at: Utc::now(),
            basic_metrics,
            centrality,
            communities,
            structural_gaps,
            notes: vec![
                format!(
                    "closeness uses BFS bounded to {} hops; unreachable nodes count as distance {}",
                    self.config.max_depth, UNREACHABLE_DISTANCE
                ),
                "betweenness is approximated as squared degree".to_string(),
            ],
        }
    }
}
