use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use super::GraphAnalytics;

/// How nodes are grouped into communities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityStrategy {
    /// One community per node type.
    #[default]
    NodeType,
    /// Connected components with at least two members.
    ConnectedComponents,
}

impl CommunityStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            CommunityStrategy::NodeType => "node_type",
            CommunityStrategy::ConnectedComponents => "connected_components",
        }
    }
}

impl fmt::Display for CommunityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "node_type" | "type" => Ok(CommunityStrategy::NodeType),
            "connected_components" | "components" => Ok(CommunityStrategy::ConnectedComponents),
            other => Err(format!("unknown community strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Community {
    pub id: usize,
    pub label: String,
    /// Member ids in canonical order.
    pub members: Vec<String>,
}

impl Community {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<'g> GraphAnalytics<'g> {
    /// Partition the graph with the given strategy.
    ///
    /// Node-type grouping covers every node. Component grouping leaves out
    /// isolated nodes, so the partition may be partial.
    pub fn communities(&self, strategy: CommunityStrategy) -> Vec<Community> {
        match strategy {
            CommunityStrategy::NodeType => self.communities_by_type(),
            CommunityStrategy::ConnectedComponents => self
                .connected_components()
                .into_iter()
                .filter(|members| members.len() >= 2)
                .enumerate()
                .map(|(id, members)| Community {
                    id,
                    label: format!("component {}", id + 1),
                    members: members.into_iter().map(str::to_string).collect(),
                })
                .collect(),
        }
    }

    fn communities_by_type(&self) -> Vec<Community> {
        let mut groups: BTreeMap<_, Vec<String>> = BTreeMap::new();
        for node in self.graph.nodes() {
            groups
                .entry(node.node_type)
                .or_default()
                .push(node.id.clone());
        }
        groups
            .into_iter()
            .enumerate()
            .map(|(id, (node_type, members))| Community {
                id,
                label: node_type.to_string(),
                members,
            })
            .collect()
    }

    /// All connected components, singletons included, largest first.
    ///
    /// Uses an explicit stack so deep chains cannot overflow the call stack.
    pub fn connected_components(&self) -> Vec<Vec<&'g str>> {
        let mut seen: BTreeSet<&'g str> = BTreeSet::new();
        let mut components = Vec::new();

        for &start in self.adjacency.keys() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut stack = vec![start];
            while let Some(current) = stack.pop() {
                for step in self.steps(current) {
                    if seen.insert(step.neighbor) {
                        component.push(step.neighbor);
                        stack.push(step.neighbor);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }

        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(b[0])));
        components
    }

    /// Newman modularity of a partition.
    ///
    /// Nodes outside every community contribute nothing. Zero when the graph
    /// has no edges.
    pub fn modularity(&self, communities: &[Community]) -> f64 {
        let membership = membership(communities);
        let mut internal = vec![0usize; communities.len()];
        let mut degree_sum = vec![0usize; communities.len()];
        let mut m = 0usize;

        for e in self.graph.edges() {
            if !self.graph.contains_node(&e.source) || !self.graph.contains_node(&e.target) {
                continue;
            }
            m += 1;
            let a = membership.get(e.source.as_str()).copied();
            let b = membership.get(e.target.as_str()).copied();
            if let Some(a) = a {
                degree_sum[a] += 1;
            }
            if let Some(b) = b {
                degree_sum[b] += 1;
            }
            if let (Some(a), Some(b)) = (a, b) {
                if a == b {
                    internal[a] += 1;
                }
            }
        }

        if m == 0 {
            return 0.0;
        }
        let m = m as f64;
        internal
            .iter()
            .zip(&degree_sum)
            .map(|(&l, &d)| l as f64 / m - (d as f64 / (2.0 * m)).powi(2))
            .sum()
    }
}

/// Node id to community position.
pub(super) fn membership(communities: &[Community]) -> HashMap<&str, usize> {
    communities
        .iter()
        .enumerate()
        .flat_map(|(index, c)| c.members.iter().map(move |m| (m.as_str(), index)))
        .collect()
}
