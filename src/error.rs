use thiserror::Error;

use crate::traits::AtomId;

/// Errors produced when building or editing a [`Mol`](crate::Mol).
///
/// The ranking and matching engines never fail; these errors only guard the
/// invariants of the host graph (simple, undirected, unique atom ids).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The atom id is not part of the graph.
    #[error("atom {0} not found")]
    AtomNotFound(AtomId),
    /// An atom with the same id already exists.
    #[error("atom {0} already exists")]
    DuplicateAtom(AtomId),
    /// A bond from an atom to itself was requested.
    #[error("atom {0} cannot be bonded to itself")]
    SelfLoop(AtomId),
    /// The two atoms are already bonded.
    #[error("atoms {0} and {1} are already bonded")]
    AlreadyBonded(AtomId, AtomId),
    /// There is no bond between the two atoms.
    #[error("no bond between atoms {0} and {1}")]
    BondNotFound(AtomId, AtomId),
    /// A renumbering sends more than one atom to the same id.
    #[error("renumbering maps several atoms to {0}")]
    MappingOverlap(AtomId),
    /// Two graphs that must be disjoint share an atom id.
    #[error("atom {0} is present in both graphs")]
    NotDisjoint(AtomId),
    /// A substructure was requested for an empty atom selection.
    #[error("empty atom selection")]
    EmptySelection,
}
