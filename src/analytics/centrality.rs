use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::GraphAnalytics;

/// Distance charged for a node that BFS could not reach within the depth bound.
pub const UNREACHABLE_DISTANCE: usize = 999;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeScore {
    pub id: String,
    pub label: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeScore {
    pub id: String,
    pub label: String,
    pub score: f64,
}

fn by_score_desc(a: &NodeScore, b: &NodeScore) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

impl<'g> GraphAnalytics<'g> {
    /// `(in, out)` degree per node, counting only edges between known nodes.
    pub(super) fn directed_degrees(&self) -> BTreeMap<&'g str, (usize, usize)> {
        let mut degrees: BTreeMap<&'g str, (usize, usize)> =
            self.adjacency.keys().map(|id| (*id, (0, 0))).collect();
        for e in self.graph.edges() {
            if !self.graph.contains_node(&e.source) || !self.graph.contains_node(&e.target) {
                continue;
            }
            if let Some((_, out)) = degrees.get_mut(e.source.as_str()) {
                *out += 1;
            }
            if let Some((inn, _)) = degrees.get_mut(e.target.as_str()) {
                *inn += 1;
            }
        }
        degrees
    }

    /// In, out and total degree per node.
    ///
    /// # Returns
    ///
    /// Every node, highest total first, ties by id.
    pub fn degree_centrality(&self) -> Vec<DegreeScore> {
        let mut scores: Vec<DegreeScore> = self
            .directed_degrees()
            .into_iter()
            .map(|(id, (in_degree, out_degree))| DegreeScore {
                id: id.to_string(),
                label: self.label_of(id),
                in_degree,
                out_degree,
                total: in_degree + out_degree,
            })
            .collect();
        scores.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.id.cmp(&b.id)));
        scores
    }

    /// Hop distances from `start` out to the configured depth.
    fn bounded_distances(&self, start: &'g str) -> HashMap<&'g str, usize> {
        let mut distances = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let depth = distances[current];
            if depth >= self.config.max_depth {
                continue;
            }
            for step in self.steps(current) {
                if !distances.contains_key(step.neighbor) {
                    distances.insert(step.neighbor, depth + 1);
                    queue.push_back(step.neighbor);
                }
            }
        }
        distances
    }

    /// Closeness from a depth-bounded BFS.
    ///
    /// Nodes that are not reached within `max_depth` hops count as
    /// [`UNREACHABLE_DISTANCE`] away, so isolated nodes score a small
    /// non-zero value instead of dividing by zero.
    ///
    /// # Returns
    ///
    /// `(n - 1) / sum of distances` per node, highest first. Zero for every
    /// node of a graph with at most one node.
    pub fn closeness_centrality(&self) -> Vec<NodeScore> {
        let n = self.adjacency.len();
        let mut scores: Vec<NodeScore> = self
            .adjacency
            .keys()
            .map(|&id| {
                let score = if n <= 1 {
                    0.0
                } else {
                    let distances = self.bounded_distances(id);
                    let total: usize = self
                        .adjacency
                        .keys()
                        .filter(|other| **other != id)
                        .map(|other| {
                            distances
                                .get(other)
                                .copied()
                                .unwrap_or(UNREACHABLE_DISTANCE)
                        })
                        .sum();
                    if total == 0 {
                        0.0
                    } else {
                        (n - 1) as f64 / total as f64
                    }
                };
                NodeScore {
                    id: id.to_string(),
                    label: self.label_of(id),
                    score,
                }
            })
            .collect();
        scores.sort_by(by_score_desc);
        scores
    }

    /// Betweenness approximated as the squared total degree.
    pub fn betweenness_centrality(&self) -> Vec<NodeScore> {
        let mut scores: Vec<NodeScore> = self
            .directed_degrees()
            .into_iter()
            .map(|(id, (inn, out))| {
                let degree = (inn + out) as f64;
                NodeScore {
                    id: id.to_string(),
                    label: self.label_of(id),
                    score: degree * degree,
                }
            })
            .collect();
        scores.sort_by(by_score_desc);
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::graph;
    use super::*;
    use crate::config::AnalyticsConfig;

    #[test]
    fn degree_ranks_hub_first() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("d", "a")]);
        let degrees = GraphAnalytics::new(&g).degree_centrality();

        assert_eq!(degrees[0].id, "a");
        assert_eq!(degrees[0].out_degree, 2);
        assert_eq!(degrees[0].in_degree, 1);
        assert_eq!(degrees[0].total, 3);
        let rest: Vec<_> = degrees[1..].iter().map(|d| d.id.as_str()).collect();
        assert_eq!(rest, vec!["b", "c", "d"]);
    }

    #[test]
    fn closeness_on_a_chain() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let closeness = GraphAnalytics::new(&g).closeness_centrality();

        assert_eq!(closeness[0].id, "b");
        assert!((closeness[0].score - 1.0).abs() < 1e-9);
        assert!((closeness[1].score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn isolated_node_gets_small_non_zero_closeness() {
        let g = graph(&["a", "b", "lonely"], &[("a", "b")]);
        let closeness = GraphAnalytics::new(&g).closeness_centrality();
        let lonely = closeness.iter().find(|s| s.id == "lonely").unwrap();
        assert!(lonely.score > 0.0);
        assert!((lonely.score - 1.0 / UNREACHABLE_DISTANCE as f64).abs() < 1e-12);
    }

    #[test]
    fn depth_bound_limits_reach() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d")],
        );
        let config = AnalyticsConfig {
            max_depth: 1,
            ..Default::default()
        };
        let closeness = GraphAnalytics::with_config(&g, &config).closeness_centrality();
        let a = closeness.iter().find(|s| s.id == "a").unwrap();
        let expected = 3.0 / (1 + 2 * UNREACHABLE_DISTANCE) as f64;
        assert!((a.score - expected).abs() < 1e-12);
    }

    #[test]
    fn single_node_scores_zero() {
        let g = graph(&["a"], &[]);
        let analytics = GraphAnalytics::new(&g);
        assert_eq!(analytics.closeness_centrality()[0].score, 0.0);
        assert_eq!(analytics.betweenness_centrality()[0].score, 0.0);
    }

    #[test]
    fn betweenness_is_degree_squared() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
        let betweenness = GraphAnalytics::new(&g).betweenness_centrality();
        assert_eq!(betweenness[0].id, "a");
        assert_eq!(betweenness[0].score, 4.0);
        assert_eq!(betweenness[1].score, 1.0);
    }
}
