use serde::Serialize;
use std::collections::BTreeMap;

use super::communities::{membership, Community};
use super::GraphAnalytics;

/// A pair of communities is weakly connected when the links between them
/// fall below this share of the smaller community's size.
pub const WEAK_CONNECTION_RATIO: f64 = 0.1;

/// Communities larger than this with no outside links are reported.
const ISOLATED_MIN_MEMBERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralGap {
    WeakConnection {
        first: usize,
        second: usize,
        actual_links: usize,
        expected_links: f64,
    },
    IsolatedCluster {
        community: usize,
        size: usize,
    },
}

impl<'g> GraphAnalytics<'g> {
    /// Weak bridges and isolated clusters between the given communities.
    pub fn structural_gaps(&self, communities: &[Community]) -> Vec<StructuralGap> {
        let membership = membership(communities);
        let mut between: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        let mut external = vec![0usize; communities.len()];

        for e in self.graph.edges() {
            let (Some(&a), Some(&b)) = (
                membership.get(e.source.as_str()),
                membership.get(e.target.as_str()),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            *between.entry((a.min(b), a.max(b))).or_default() += 1;
            external[a] += 1;
            external[b] += 1;
        }

        let mut gaps = Vec::new();
        for ((a, b), actual) in between {
            let smaller = communities[a].len().min(communities[b].len());
            let expected = WEAK_CONNECTION_RATIO * smaller as f64;
            if (actual as f64) < expected {
                gaps.push(StructuralGap::WeakConnection {
                    first: communities[a].id,
                    second: communities[b].id,
                    actual_links: actual,
                    expected_links: expected,
                });
            }
        }
        for (index, community) in communities.iter().enumerate() {
            if external[index] == 0 && community.len() > ISOLATED_MIN_MEMBERS {
                gaps.push(StructuralGap::IsolatedCluster {
                    community: community.id,
                    size: community.len(),
                });
            }
        }
        gaps
    }
}
