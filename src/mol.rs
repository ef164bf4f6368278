use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Dfs;

use crate::canonical::{rank, Ranking};
use crate::error::GraphError;
use crate::spanning::{compile, SpanningForest};
use crate::traits::{AtomId, MolecularGraph};

/// Values derived from the graph structure, computed on first use.
///
/// Every mutation of the owning [`Mol`] replaces the cache with an empty one,
/// so a filled cell always describes the current graph version.
#[derive(Clone, Default)]
struct Cache {
    ranking: OnceLock<Ranking>,
    forest: OnceLock<SpanningForest>,
}

/// Labelled molecular graph keyed by opaque atom ids.
///
/// `A` is the atom label and `B` the bond label. Topology lives in a petgraph
/// [`UnGraphMap`] whose nodes are the atom ids; labels of atoms are kept next
/// to it in id order.
#[derive(Clone)]
pub struct Mol<A, B> {
    atoms: BTreeMap<AtomId, A>,
    graph: UnGraphMap<AtomId, B>,
    version: u64,
    cache: Cache,
}

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            atoms: BTreeMap::new(),
            graph: UnGraphMap::new(),
            version: 0,
            cache: Cache::default(),
        }
    }

    /// Builds a graph from explicit atom ids and bonds.
    pub fn from_parts(
        atoms: impl IntoIterator<Item = (AtomId, A)>,
        bonds: impl IntoIterator<Item = (AtomId, AtomId, B)>,
    ) -> Result<Self, GraphError> {
        let mut mol = Self::new();
        for (id, atom) in atoms {
            mol.insert_atom(id, atom)?;
        }
        for (a, b, bond) in bonds {
            mol.add_bond(a, b, bond)?;
        }
        Ok(mol)
    }

    /// Adds an atom under the next free id (largest id + 1, starting at 1).
    pub fn add_atom(&mut self, atom: A) -> AtomId {
        let id = self.atoms.keys().next_back().map_or(1, |&last| last + 1);
        self.atoms.insert(id, atom);
        self.graph.add_node(id);
        self.touch();
        id
    }

    pub fn insert_atom(&mut self, id: AtomId, atom: A) -> Result<(), GraphError> {
        if self.atoms.contains_key(&id) {
            return Err(GraphError::DuplicateAtom(id));
        }
        self.atoms.insert(id, atom);
        self.graph.add_node(id);
        self.touch();
        Ok(())
    }

    pub fn add_bond(&mut self, a: AtomId, b: AtomId, bond: B) -> Result<(), GraphError> {
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        for id in [a, b] {
            if !self.atoms.contains_key(&id) {
                return Err(GraphError::AtomNotFound(id));
            }
        }
        if self.graph.contains_edge(a, b) {
            return Err(GraphError::AlreadyBonded(a, b));
        }
        self.graph.add_edge(a, b, bond);
        self.touch();
        Ok(())
    }

    /// Removes an atom and every bond incident to it.
    pub fn delete_atom(&mut self, id: AtomId) -> Result<A, GraphError> {
        let atom = self.atoms.remove(&id).ok_or(GraphError::AtomNotFound(id))?;
        self.graph.remove_node(id);
        self.touch();
        Ok(atom)
    }

    pub fn delete_bond(&mut self, a: AtomId, b: AtomId) -> Result<B, GraphError> {
        let bond = self
            .graph
            .remove_edge(a, b)
            .ok_or(GraphError::BondNotFound(a, b))?;
        self.touch();
        Ok(bond)
    }

    /// Label of an atom. Panics if `id` is not part of the graph.
    pub fn atom(&self, id: AtomId) -> &A {
        &self.atoms[&id]
    }

    pub fn get_atom(&self, id: AtomId) -> Option<&A> {
        self.atoms.get(&id)
    }

    /// Mutable access to an atom label. Invalidates the cached ranking.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut A> {
        if !self.atoms.contains_key(&id) {
            return None;
        }
        self.touch();
        self.atoms.get_mut(&id)
    }

    pub fn bond(&self, a: AtomId, b: AtomId) -> Option<&B> {
        self.graph.edge_weight(a, b)
    }

    /// Mutable access to a bond label. Invalidates the cached ranking.
    pub fn bond_mut(&mut self, a: AtomId, b: AtomId) -> Option<&mut B> {
        if !self.graph.contains_edge(a, b) {
            return None;
        }
        self.touch();
        self.graph.edge_weight_mut(a, b)
    }

    pub fn has_atom(&self, id: AtomId) -> bool {
        self.atoms.contains_key(&id)
    }

    pub fn has_bond(&self, a: AtomId, b: AtomId) -> bool {
        self.graph.contains_edge(a, b)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Atoms in ascending id order.
    pub fn atoms(&self) -> impl Iterator<Item = (AtomId, &A)> + '_ {
        self.atoms.iter().map(|(&id, atom)| (id, atom))
    }

    /// Every bond exactly once.
    pub fn bonds(&self) -> impl Iterator<Item = (AtomId, AtomId, &B)> + '_ {
        self.graph.all_edges()
    }

    pub fn neighbors(&self, id: AtomId) -> impl Iterator<Item = AtomId> + '_ {
        self.graph.neighbors(id)
    }

    /// Token that changes on every mutation of atoms, bonds or labels.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn flush_cache(&mut self) {
        self.cache = Cache::default();
    }

    fn touch(&mut self) {
        self.version += 1;
        self.cache = Cache::default();
    }
}

impl<A: Clone, B: Clone> Mol<A, B> {
    /// Copy of the graph with atoms renumbered through `mapping`.
    ///
    /// Atoms missing from `mapping` keep their id.
    pub fn remap(&self, mapping: &HashMap<AtomId, AtomId>) -> Result<Self, GraphError> {
        let renumber = |id: AtomId| mapping.get(&id).copied().unwrap_or(id);
        let mut seen = HashSet::with_capacity(self.atoms.len());
        for &id in self.atoms.keys() {
            let new_id = renumber(id);
            if !seen.insert(new_id) {
                return Err(GraphError::MappingOverlap(new_id));
            }
        }
        Self::from_parts(
            self.atoms().map(|(id, atom)| (renumber(id), atom.clone())),
            self.bonds()
                .map(|(a, b, bond)| (renumber(a), renumber(b), bond.clone())),
        )
    }
}

impl<A: Ord, B: Ord> Mol<A, B> {
    /// Canonical atom ranking, computed once per graph version.
    pub fn atoms_order(&self) -> &Ranking {
        self.cache.ranking.get_or_init(|| rank(self))
    }

    /// Spanning forest and ring closures used when this graph is a query.
    pub fn spanning_forest(&self) -> &SpanningForest {
        self.cache
            .forest
            .get_or_init(|| compile(self, self.atoms_order()))
    }
}

impl<A, B> MolecularGraph for Mol<A, B> {
    type Atom = A;
    type Bond = B;

    fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    fn atom_ids(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.atoms.keys().copied()
    }

    fn atom(&self, id: AtomId) -> &A {
        &self.atoms[&id]
    }

    fn bonds_of(&self, id: AtomId) -> impl Iterator<Item = (AtomId, &B)> + '_ {
        self.graph.edges(id).map(|(_, nb, bond)| (nb, bond))
    }

    fn bond(&self, a: AtomId, b: AtomId) -> Option<&B> {
        self.graph.edge_weight(a, b)
    }

    fn connected_components(&self) -> Vec<Vec<AtomId>> {
        let mut seen = HashSet::with_capacity(self.atoms.len());
        let mut components = Vec::new();
        for &start in self.atoms.keys() {
            if seen.contains(&start) {
                continue;
            }
            let mut component = Vec::new();
            let mut dfs = Dfs::new(&self.graph, start);
            while let Some(atom) = dfs.next(&self.graph) {
                seen.insert(atom);
                component.push(atom);
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity comparison: same atom ids, labels and bonds.
///
/// Structural equality up to renumbering is
/// [`is_equal`](crate::substruct::is_equal).
impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        self.atoms == other.atoms
            && self.bond_count() == other.bond_count()
            && self
                .bonds()
                .all(|(a, b, bond)| other.bond(a, b) == Some(bond))
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .field("version", &self.version)
            .finish()
    }
}
