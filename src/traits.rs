/// Atom identifier. Opaque and unique within one graph.
pub type AtomId = u32;

/// Read-only view of a labelled, simple, undirected graph.
///
/// This is everything the ranking and matching engines need from a host
/// object model. Implementations must keep the adjacency symmetric (if `a`
/// lists `b`, `b` lists `a` with an equal bond label) and must not report
/// self-loops; the engines do not validate either.
pub trait MolecularGraph {
    type Atom;
    type Bond;

    fn atom_count(&self) -> usize;

    fn atom_ids(&self) -> impl Iterator<Item = AtomId> + '_;

    /// Label of an atom. Panics if `id` is not part of the graph.
    fn atom(&self, id: AtomId) -> &Self::Atom;

    /// Neighbors of `id` together with the label of the connecting bond.
    fn bonds_of(&self, id: AtomId) -> impl Iterator<Item = (AtomId, &Self::Bond)> + '_;

    fn bond(&self, a: AtomId, b: AtomId) -> Option<&Self::Bond>;

    /// Atom ids of every connected piece, each sorted, pieces ordered by
    /// their smallest id.
    fn connected_components(&self) -> Vec<Vec<AtomId>> {
        crate::graph_ops::connected_components(self)
    }
}
