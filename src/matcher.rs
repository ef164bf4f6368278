use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::trace;

use crate::spanning::{SpanningForest, TreeNode};
use crate::traits::{AtomId, MolecularGraph};

/// Query atom -> target atom.
pub type Mapping = BTreeMap<AtomId, AtomId>;

/// Target atoms bound along the current search branch.
///
/// `path[i]` is the image of the query atom at tree position `i`. Moving to a
/// sibling branch is always a `truncate` to the depth of the popped state,
/// which unbinds everything deeper in one place.
#[derive(Debug, Default)]
struct SearchState {
    path: Vec<AtomId>,
    used: HashSet<AtomId>,
}

impl SearchState {
    fn truncate(&mut self, depth: usize) {
        if depth < self.path.len() {
            for atom in self.path.drain(depth..) {
                self.used.remove(&atom);
            }
        }
    }

    fn push(&mut self, atom: AtomId) {
        self.path.push(atom);
        self.used.insert(atom);
    }

    fn contains(&self, atom: AtomId) -> bool {
        self.used.contains(&atom)
    }

    fn at(&self, position: usize) -> Option<AtomId> {
        self.path.get(position).copied()
    }
}

/// Lazy enumeration of the embeddings of one query spanning tree.
///
/// Yields every mapping of the atoms in `order` onto `candidates` atoms of
/// the target that preserves atom labels, tree bonds and ring closures, in
/// depth-first order. The search uses an explicit stack and does no work
/// beyond what the next item needs.
pub struct ComponentMatches<'a, Q, T, FA, FB> {
    query: &'a Q,
    target: &'a T,
    order: &'a [TreeNode],
    forest: &'a SpanningForest,
    positions: HashMap<AtomId, usize>,
    candidates: HashSet<AtomId>,
    atom_match: FA,
    bond_match: FB,
    stack: Vec<(AtomId, usize)>,
    state: SearchState,
}

impl<'a, Q, T, FA, FB> ComponentMatches<'a, Q, T, FA, FB>
where
    Q: MolecularGraph,
    T: MolecularGraph,
    FA: Fn(&Q::Atom, &T::Atom) -> bool,
    FB: Fn(&Q::Bond, &T::Bond) -> bool,
{
    pub fn new(
        query: &'a Q,
        order: &'a [TreeNode],
        forest: &'a SpanningForest,
        target: &'a T,
        candidates: &[AtomId],
        atom_match: FA,
        bond_match: FB,
    ) -> Self {
        let positions = order
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.atom, pos))
            .collect();

        let mut stack = Vec::new();
        if let Some(root) = order.first() {
            let root_atom = query.atom(root.atom);
            stack.extend(
                candidates
                    .iter()
                    .filter(|&&atom| atom_match(root_atom, target.atom(atom)))
                    .map(|&atom| (atom, 0)),
            );
        }
        trace!(seeds = stack.len(), size = order.len(), "component search");

        Self {
            query,
            target,
            order,
            forest,
            positions,
            candidates: candidates.iter().copied().collect(),
            atom_match,
            bond_match,
            stack,
            state: SearchState::default(),
        }
    }

    /// Pushes every target atom that can take tree position `next`.
    fn expand(&mut self, next: usize) {
        let query = self.query;
        let target = self.target;
        let forest = self.forest;

        let node = self.order[next];
        let Some(parent) = node.parent else {
            return;
        };
        let (Some(&parent_pos), Some(q_bond)) =
            (self.positions.get(&parent), query.bond(node.atom, parent))
        else {
            return;
        };
        let Some(fork) = self.state.at(parent_pos) else {
            return;
        };
        let q_atom = query.atom(node.atom);
        let closures = forest.closures(node.atom);

        for (candidate, t_bond) in target.bonds_of(fork) {
            if !self.candidates.contains(&candidate) || self.state.contains(candidate) {
                continue;
            }
            if !(self.bond_match)(q_bond, t_bond)
                || !(self.atom_match)(q_atom, target.atom(candidate))
            {
                continue;
            }
            if closures
                .iter()
                .all(|&partner| self.closes_ring(node.atom, partner, candidate))
            {
                self.stack.push((candidate, next));
            }
        }
    }

    /// Whether the ring bond `atom`-`partner` of the query exists between
    /// `candidate` and the image of `partner`.
    fn closes_ring(&self, atom: AtomId, partner: AtomId, candidate: AtomId) -> bool {
        let Some(mapped) = self
            .positions
            .get(&partner)
            .and_then(|&pos| self.state.at(pos))
        else {
            return false;
        };
        match (self.query.bond(atom, partner), self.target.bond(mapped, candidate)) {
            (Some(q_bond), Some(t_bond)) => (self.bond_match)(q_bond, t_bond),
            _ => false,
        }
    }
}

impl<'a, Q, T, FA, FB> Iterator for ComponentMatches<'a, Q, T, FA, FB>
where
    Q: MolecularGraph,
    T: MolecularGraph,
    FA: Fn(&Q::Atom, &T::Atom) -> bool,
    FB: Fn(&Q::Bond, &T::Bond) -> bool,
{
    type Item = Mapping;

    fn next(&mut self) -> Option<Mapping> {
        let last = self.order.len().checked_sub(1)?;
        while let Some((atom, depth)) = self.stack.pop() {
            self.state.truncate(depth);
            if depth == last {
                let mut mapping: Mapping = self
                    .order
                    .iter()
                    .map(|node| node.atom)
                    .zip(self.state.path.iter().copied())
                    .collect();
                mapping.insert(self.order[depth].atom, atom);
                return Some(mapping);
            }
            self.state.push(atom);
            self.expand(depth + 1);
        }
        None
    }
}
