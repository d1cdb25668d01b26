use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use super::GraphAnalytics;
use crate::model::RelationType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// One fewest-hop path.
    #[default]
    Shortest,
    /// Every simple path up to the hop and count limits.
    All,
}

impl fmt::Display for PathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PathMode::Shortest => "shortest",
            PathMode::All => "all",
        })
    }
}

impl FromStr for PathMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shortest" => Ok(PathMode::Shortest),
            "all" => Ok(PathMode::All),
            other => Err(format!("unknown path mode '{}'", other)),
        }
    }
}

/// A walk between two nodes, ignoring edge direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphPath {
    pub nodes: Vec<String>,
    pub relations: Vec<RelationType>,
    pub total_weight: f64,
}

impl GraphPath {
    pub fn hops(&self) -> usize {
        self.relations.len()
    }
}

impl<'g> GraphAnalytics<'g> {
    /// Paths from `source` to `target` of at most `max_hops` edges.
    ///
    /// Unknown endpoints give an empty result. In [`PathMode::All`] the
    /// search stops after the configured `max_paths`.
    pub fn find_paths(
        &self,
        source: &str,
        target: &str,
        mode: PathMode,
        max_hops: usize,
    ) -> Vec<GraphPath> {
        let (Some((&source, _)), Some((&target, _))) = (
            self.adjacency.get_key_value(source),
            self.adjacency.get_key_value(target),
        ) else {
            return Vec::new();
        };
        match mode {
            PathMode::Shortest => self
                .shortest_path(source, target, max_hops)
                .into_iter()
                .collect(),
            PathMode::All => self.all_paths(source, target, max_hops),
        }
    }

    fn build_path(&self, nodes: Vec<&str>, edges: &[usize]) -> GraphPath {
        let all = self.graph.edges();
        GraphPath {
            nodes: nodes.into_iter().map(str::to_string).collect(),
            relations: edges.iter().map(|&i| all[i].relationship_type).collect(),
            total_weight: edges.iter().map(|&i| all[i].weight).sum(),
        }
    }

    fn shortest_path(&self, source: &'g str, target: &'g str, max_hops: usize) -> Option<GraphPath> {
        if source == target {
            return Some(self.build_path(vec![source], &[]));
        }

        // child -> (parent, edge index)
        let mut parents: HashMap<&'g str, (&'g str, usize)> = HashMap::new();
        let mut queue = VecDeque::from([(source, 0usize)]);
        let mut visited = HashSet::from([source]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for step in self.steps(current) {
                if !visited.insert(step.neighbor) {
                    continue;
                }
                parents.insert(step.neighbor, (current, step.edge));
                if step.neighbor == target {
                    let mut nodes = vec![target];
                    let mut edges = Vec::new();
                    let mut cursor = target;
                    while let Some(&(parent, edge)) = parents.get(cursor) {
                        edges.push(edge);
                        nodes.push(parent);
                        cursor = parent;
                        if cursor == source {
                            break;
                        }
                    }
                    nodes.reverse();
                    edges.reverse();
                    return Some(self.build_path(nodes, &edges));
                }
                queue.push_back((step.neighbor, depth + 1));
            }
        }
        None
    }

    /// Depth-first enumeration of simple paths with an explicit stack.
    fn all_paths(&self, source: &'g str, target: &'g str, max_hops: usize) -> Vec<GraphPath> {
        let limit = self.config.max_paths;
        let mut found = Vec::new();
        if limit == 0 {
            return found;
        }
        if source == target {
            found.push(self.build_path(vec![source], &[]));
            return found;
        }

        let mut nodes = vec![source];
        let mut edges: Vec<usize> = Vec::new();
        let mut on_path = HashSet::from([source]);
        // Next neighbour index to try for each node on the path.
        let mut cursors = vec![0usize];

        while let Some(cursor) = cursors.last_mut() {
            let current = nodes[nodes.len() - 1];
            let steps = self.steps(current);

            if *cursor >= steps.len() || edges.len() >= max_hops {
                cursors.pop();
                if let Some(node) = nodes.pop() {
                    on_path.remove(node);
                }
                edges.pop();
                continue;
            }

            let step = steps[*cursor];
            *cursor += 1;
            if on_path.contains(step.neighbor) {
                continue;
            }

            if step.neighbor == target {
                let mut path_nodes = nodes.clone();
                path_nodes.push(target);
                let mut path_edges = edges.clone();
                path_edges.push(step.edge);
                found.push(self.build_path(path_nodes, &path_edges));
                if found.len() >= limit {
                    break;
                }
                continue;
            }

            nodes.push(step.neighbor);
            edges.push(step.edge);
            on_path.insert(step.neighbor);
            cursors.push(0);
        }

        found.sort_by_key(GraphPath::hops);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::graph;
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::model::{Edge, Graph, Node, NodeType};

    fn diamond() -> Graph {
        graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "d"), ("a", "c"), ("c", "d")],
        )
    }

    #[test]
    fn shortest_path_reports_relations_and_weight() {
        let g = Graph::from_parts(
            ["light", "chlorophyll", "glucose"].map(|id| Node::new(id, id, NodeType::Concept)),
            vec![
                Edge::new("chlorophyll", "light", RelationType::Activates).with_weight(2.0),
                Edge::new("chlorophyll", "glucose", RelationType::Causes).with_weight(3.0),
            ],
        );
        let paths = GraphAnalytics::new(&g).find_paths("light", "glucose", PathMode::Shortest, 5);

        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].nodes, vec!["light", "chlorophyll", "glucose"]);
        assert_eq!(
            paths[0].relations,
            vec![RelationType::Activates, RelationType::Causes]
        );
        assert_eq!(paths[0].total_weight, 5.0);
        assert_eq!(paths[0].hops(), 2);
    }

    #[test]
    fn all_paths_finds_both_branches() {
        let g = diamond();
        let paths = GraphAnalytics::new(&g).find_paths("a", "d", PathMode::All, 5);
        let mut routes: Vec<_> = paths.iter().map(|p| p.nodes.join(">")).collect();
        routes.sort();
        assert_eq!(routes, vec!["a>b>d", "a>c>d"]);
    }

    #[test]
    fn hop_limit_is_respected() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        let analytics = GraphAnalytics::new(&g);
        assert!(analytics.find_paths("a", "d", PathMode::Shortest, 2).is_empty());
        assert!(analytics.find_paths("a", "d", PathMode::All, 2).is_empty());
        assert_eq!(analytics.find_paths("a", "d", PathMode::All, 3).len(), 1);
    }

    #[test]
    fn path_count_is_capped() {
        let g = diamond();
        let config = AnalyticsConfig {
            max_paths: 1,
            ..Default::default()
        };
        let paths = GraphAnalytics::with_config(&g, &config).find_paths("a", "d", PathMode::All, 5);
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn unknown_nodes_give_no_paths() {
        let g = diamond();
        let analytics = GraphAnalytics::new(&g);
        assert!(analytics.find_paths("a", "zz", PathMode::Shortest, 5).is_empty());
        assert!(analytics.find_paths("zz", "a", PathMode::All, 5).is_empty());
    }

    #[test]
    fn disconnected_nodes_give_no_paths() {
        let g = graph(&["a", "b", "c"], &[("a", "b")]);
        assert!(GraphAnalytics::new(&g)
            .find_paths("a", "c", PathMode::Shortest, 5)
            .is_empty());
    }

    #[test]
    fn mode_parses() {
        assert_eq!("ALL".parse::<PathMode>(), Ok(PathMode::All));
        assert!("widest".parse::<PathMode>().is_err());
    }
}
