use std::collections::{BTreeMap, HashSet};

use crate::canonical::Ranking;
use crate::traits::{AtomId, MolecularGraph};

/// One position of a DFS spanning tree.
///
/// The atom label and the bond label to `parent` are read from the graph the
/// forest was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeNode {
    pub atom: AtomId,
    pub parent: Option<AtomId>,
}

/// DFS spanning trees of every connected component plus the ring closures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanningForest {
    components: Vec<Vec<TreeNode>>,
    closures: BTreeMap<AtomId, Vec<AtomId>>,
}

impl SpanningForest {
    /// Trees in root-rank order, each a DFS preorder.
    pub fn components(&self) -> &[Vec<TreeNode>] {
        &self.components
    }

    /// Earlier-visited partners of the ring bonds discovered at `atom`.
    pub fn closures(&self, atom: AtomId) -> &[AtomId] {
        self.closures.get(&atom).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn closure_count(&self) -> usize {
        self.closures.values().map(Vec::len).sum()
    }
}

pub fn compile<G: MolecularGraph>(graph: &G, ranking: &Ranking) -> SpanningForest {
    let total = graph.atom_count();
    let mut seen: HashSet<AtomId> = HashSet::with_capacity(total);
    let mut forest = SpanningForest::default();

    // neighbors in ascending (rank, id) order; the stack pops them highest first
    let sorted_neighbors = |atom: AtomId| -> Vec<AtomId> {
        let mut neighbors: Vec<AtomId> = graph.bonds_of(atom).map(|(nb, _)| nb).collect();
        neighbors.sort_unstable_by_key(|&nb| (ranking.rank_of(nb), nb));
        neighbors
    };

    while seen.len() < total {
        let Some(root) = graph
            .atom_ids()
            .filter(|atom| !seen.contains(atom))
            .max_by_key(|&atom| (ranking.rank_of(atom), std::cmp::Reverse(atom)))
        else {
            break;
        };
        seen.insert(root);

        let mut order = vec![TreeNode {
            atom: root,
            parent: None,
        }];
        let mut stack: Vec<(AtomId, AtomId)> = sorted_neighbors(root)
            .into_iter()
            .map(|nb| (nb, root))
            .collect();

        while let Some((front, back)) = stack.pop() {
            if seen.contains(&front) {
                continue;
            }
            order.push(TreeNode {
                atom: front,
                parent: Some(back),
            });
            for nb in sorted_neighbors(front) {
                if nb == back {
                    continue;
                }
                if seen.contains(&nb) {
                    forest.closures.entry(front).or_default().push(nb);
                } else {
                    stack.push((nb, front));
                }
            }
            seen.insert(front);
        }
        forest.components.push(order);
    }
    forest
}
