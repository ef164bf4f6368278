use std::collections::{BTreeSet, HashSet};

use crate::error::GraphError;
use crate::mol::Mol;
use crate::traits::{AtomId, MolecularGraph};

pub fn connected_components<G: MolecularGraph + ?Sized>(graph: &G) -> Vec<Vec<AtomId>> {
    let mut visited = HashSet::with_capacity(graph.atom_count());
    let mut components = Vec::new();
    let mut starts: Vec<AtomId> = graph.atom_ids().collect();
    starts.sort_unstable();
    for node in starts {
        if visited.contains(&node) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            component.push(current);
            for (neighbor, _) in graph.bonds_of(current) {
                if !visited.contains(&neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

/// Graph induced by `atoms`: the selected atoms and every bond between them.
pub fn substructure<A: Clone, B: Clone>(
    mol: &Mol<A, B>,
    atoms: &[AtomId],
) -> Result<Mol<A, B>, GraphError> {
    if atoms.is_empty() {
        return Err(GraphError::EmptySelection);
    }
    let selected: BTreeSet<AtomId> = atoms.iter().copied().collect();
    if let Some(&missing) = selected.iter().find(|&&id| !mol.has_atom(id)) {
        return Err(GraphError::AtomNotFound(missing));
    }
    Mol::from_parts(
        selected.iter().map(|&id| (id, mol.atom(id).clone())),
        mol.bonds()
            .filter(|(a, b, _)| selected.contains(a) && selected.contains(b))
            .map(|(a, b, bond)| (a, b, bond.clone())),
    )
}

/// Substructure of `atoms` grown by `deep` bond shells.
///
/// Growth stops early once a shell adds no new atoms.
pub fn augmented_substructure<A: Clone, B: Clone>(
    mol: &Mol<A, B>,
    atoms: &[AtomId],
    deep: usize,
) -> Result<Mol<A, B>, GraphError> {
    let shells = shells(mol, atoms, deep)?;
    let outer: Vec<AtomId> = shells
        .last()
        .map(|shell| shell.iter().copied().collect())
        .unwrap_or_default();
    substructure(mol, &outer)
}

/// One substructure per shell: `atoms`, then `atoms` plus their neighbors,
/// and so on up to `deep` shells or until nothing new is reached.
pub fn augmented_substructures<A: Clone, B: Clone>(
    mol: &Mol<A, B>,
    atoms: &[AtomId],
    deep: usize,
) -> Result<Vec<Mol<A, B>>, GraphError> {
    shells(mol, atoms, deep)?
        .iter()
        .map(|shell| {
            let selected: Vec<AtomId> = shell.iter().copied().collect();
            substructure(mol, &selected)
        })
        .collect()
}

fn shells<A, B>(
    mol: &Mol<A, B>,
    atoms: &[AtomId],
    deep: usize,
) -> Result<Vec<BTreeSet<AtomId>>, GraphError> {
    let core: BTreeSet<AtomId> = atoms.iter().copied().collect();
    if let Some(&missing) = core.iter().find(|&&id| !mol.has_atom(id)) {
        return Err(GraphError::AtomNotFound(missing));
    }
    let mut shells = vec![core];
    for _ in 0..deep {
        let Some(last) = shells.last() else { break };
        let grown: BTreeSet<AtomId> = last
            .iter()
            .flat_map(|&id| mol.neighbors(id))
            .chain(last.iter().copied())
            .collect();
        if grown.len() == last.len() {
            break;
        }
        shells.push(grown);
    }
    Ok(shells)
}

/// Substructure of every atom except `atoms`.
///
/// Removing every atom is rejected with [`GraphError::EmptySelection`].
pub fn without<A: Clone, B: Clone>(
    mol: &Mol<A, B>,
    atoms: &[AtomId],
) -> Result<Mol<A, B>, GraphError> {
    let excluded: BTreeSet<AtomId> = atoms.iter().copied().collect();
    if let Some(&missing) = excluded.iter().find(|&&id| !mol.has_atom(id)) {
        return Err(GraphError::AtomNotFound(missing));
    }
    let kept: Vec<AtomId> = mol
        .atoms()
        .map(|(id, _)| id)
        .filter(|id| !excluded.contains(id))
        .collect();
    substructure(mol, &kept)
}

/// One graph per connected component, in component order.
pub fn split<A: Clone, B: Clone>(mol: &Mol<A, B>) -> Vec<Mol<A, B>> {
    MolecularGraph::connected_components(mol)
        .iter()
        .filter_map(|component| substructure(mol, component).ok())
        .collect()
}

/// Disjoint union of two graphs. Atom ids must not overlap.
pub fn union<A: Clone, B: Clone>(
    left: &Mol<A, B>,
    right: &Mol<A, B>,
) -> Result<Mol<A, B>, GraphError> {
    if let Some((shared, _)) = right.atoms().find(|&(id, _)| left.has_atom(id)) {
        return Err(GraphError::NotDisjoint(shared));
    }
    Mol::from_parts(
        left.atoms()
            .chain(right.atoms())
            .map(|(id, atom)| (id, atom.clone())),
        left.bonds()
            .chain(right.bonds())
            .map(|(a, b, bond)| (a, b, bond.clone())),
    )
}
