use std::cmp::Ordering;
use std::collections::HashSet;
use std::iter;

use itertools::Itertools;
use tracing::debug;

use crate::matcher::{ComponentMatches, Mapping};
use crate::mol::Mol;
use crate::spanning::SpanningForest;
use crate::traits::{AtomId, MolecularGraph};

/// Mapping stream of [`get_mapping`], matching labels by equality.
pub type ExactMappings<'a, A, B, T> =
    Mappings<'a, A, B, T, fn(&A, &A) -> bool, fn(&B, &B) -> bool>;

/// All mappings of `query` into `target`, produced on demand (see
/// [`Mappings`] for when work is done eagerly).
///
/// With `automorphism_filter` set, a mapping is skipped when its set of
/// target atoms was already reported, so each occurrence of the query in the
/// target shows up once instead of once per symmetry of the query.
pub fn get_mapping<'a, A, B, T>(
    query: &'a Mol<A, B>,
    target: &'a T,
    automorphism_filter: bool,
) -> ExactMappings<'a, A, B, T>
where
    A: Ord,
    B: Ord,
    T: MolecularGraph<Atom = A, Bond = B>,
{
    get_mapping_with(
        query,
        target,
        automorphism_filter,
        <A as PartialEq>::eq as fn(&A, &A) -> bool,
        <B as PartialEq>::eq as fn(&B, &B) -> bool,
    )
}

/// [`get_mapping`] with caller-supplied label predicates.
///
/// `atom_match(query_atom, target_atom)` and `bond_match(query_bond,
/// target_bond)` decide compatibility, so query and target may carry
/// different label types.
pub fn get_mapping_with<'a, A, B, T, FA, FB>(
    query: &'a Mol<A, B>,
    target: &'a T,
    automorphism_filter: bool,
    atom_match: FA,
    bond_match: FB,
) -> Mappings<'a, A, B, T, FA, FB>
where
    A: Ord,
    B: Ord,
    T: MolecularGraph,
    FA: Fn(&A, &T::Atom) -> bool + Clone + 'a,
    FB: Fn(&B, &T::Bond) -> bool + Clone + 'a,
{
    let forest = query.spanning_forest();
    let target_components = target.connected_components();
    let wanted = forest.components().len();
    debug!(
        query_components = wanted,
        target_components = target_components.len(),
        "substructure search"
    );

    let assignments: Box<dyn Iterator<Item = Vec<usize>> + 'a> = if wanted == 0 {
        Box::new(iter::once(Vec::new()))
    } else {
        Box::new((0..target_components.len()).permutations(wanted))
    };

    Mappings {
        query,
        forest,
        target,
        target_components,
        assignments,
        current: None,
        seen: automorphism_filter.then(HashSet::new),
        atom_match,
        bond_match,
    }
}

/// Stream of mappings returned by [`get_mapping`] and [`get_mapping_with`].
///
/// Target component assignments are visited one at a time. A connected
/// query streams its matches straight from the backtracking search. For a
/// query with several components, every match of every component under the
/// current assignment is collected before the first combined mapping of
/// that assignment is produced; only the assignments themselves stay lazy.
pub struct Mappings<'a, A, B, T, FA, FB> {
    query: &'a Mol<A, B>,
    forest: &'a SpanningForest,
    target: &'a T,
    target_components: Vec<Vec<AtomId>>,
    assignments: Box<dyn Iterator<Item = Vec<usize>> + 'a>,
    current: Option<Box<dyn Iterator<Item = Mapping> + 'a>>,
    seen: Option<HashSet<Vec<AtomId>>>,
    atom_match: FA,
    bond_match: FB,
}

impl<'a, A, B, T, FA, FB> Mappings<'a, A, B, T, FA, FB>
where
    T: MolecularGraph,
    FA: Fn(&A, &T::Atom) -> bool + Clone + 'a,
    FB: Fn(&B, &T::Bond) -> bool + Clone + 'a,
{
    /// Merged mappings for one assignment of target components (by index)
    /// to the query components.
    fn assignment_stream(&self, assignment: &[usize]) -> Box<dyn Iterator<Item = Mapping> + 'a> {
        let trees = self.forest.components();
        if trees.is_empty() {
            return Box::new(iter::once(Mapping::new()));
        }

        let mut streams = trees.iter().zip(assignment).map(|(order, &component)| {
            ComponentMatches::new(
                self.query,
                order,
                self.forest,
                self.target,
                &self.target_components[component],
                self.atom_match.clone(),
                self.bond_match.clone(),
            )
        });

        if trees.len() == 1 {
            return match streams.next() {
                Some(stream) => Box::new(stream),
                None => Box::new(iter::empty()),
            };
        }

        let parts: Vec<Vec<Mapping>> = streams.map(|stream| stream.collect()).collect();
        if parts.iter().any(Vec::is_empty) {
            return Box::new(iter::empty());
        }
        Box::new(
            parts
                .into_iter()
                .map(Vec::into_iter)
                .multi_cartesian_product()
                .map(|combination| combination.into_iter().flatten().collect::<Mapping>()),
        )
    }
}

impl<'a, A, B, T, FA, FB> Iterator for Mappings<'a, A, B, T, FA, FB>
where
    T: MolecularGraph,
    FA: Fn(&A, &T::Atom) -> bool + Clone + 'a,
    FB: Fn(&B, &T::Bond) -> bool + Clone + 'a,
{
    type Item = Mapping;

    fn next(&mut self) -> Option<Mapping> {
        loop {
            if let Some(stream) = self.current.as_mut() {
                for mapping in stream.by_ref() {
                    if admit(&mut self.seen, &mapping) {
                        return Some(mapping);
                    }
                }
                self.current = None;
            }
            let assignment = self.assignments.next()?;
            self.current = Some(self.assignment_stream(&assignment));
        }
    }
}

fn admit(seen: &mut Option<HashSet<Vec<AtomId>>>, mapping: &Mapping) -> bool {
    match seen {
        None => true,
        Some(seen) => {
            let mut atoms: Vec<AtomId> = mapping.values().copied().collect();
            atoms.sort_unstable();
            seen.insert(atoms)
        }
    }
}

/// Whether `query` occurs in `target`.
pub fn is_substructure<A, B, T>(query: &Mol<A, B>, target: &T) -> bool
where
    A: Ord,
    B: Ord,
    T: MolecularGraph<Atom = A, Bond = B>,
{
    get_mapping(query, target, false).next().is_some()
}

pub fn is_substructure_with<A, B, T, FA, FB>(
    query: &Mol<A, B>,
    target: &T,
    atom_match: FA,
    bond_match: FB,
) -> bool
where
    A: Ord,
    B: Ord,
    T: MolecularGraph,
    FA: Fn(&A, &T::Atom) -> bool + Clone,
    FB: Fn(&B, &T::Bond) -> bool + Clone,
{
    get_mapping_with(query, target, false, atom_match, bond_match)
        .next()
        .is_some()
}

/// Same atom count and `query` occurs in `target`.
///
/// Bonds of `target` that no query bond maps onto are not checked, so this
/// is not symmetric: a chain is "equal" to the ring closing it.
pub fn is_equal<A, B, T>(query: &Mol<A, B>, target: &T) -> bool
where
    A: Ord,
    B: Ord,
    T: MolecularGraph<Atom = A, Bond = B>,
{
    query.atom_count() == target.atom_count() && is_substructure(query, target)
}

/// `query < target`: strictly fewer atoms and a substructure.
pub fn is_proper_substructure<A: Ord, B: Ord>(query: &Mol<A, B>, target: &Mol<A, B>) -> bool {
    query.atom_count() < target.atom_count() && is_substructure(query, target)
}

/// `this >= other`: `other` occurs in `this`.
pub fn is_superstructure<A: Ord, B: Ord>(this: &Mol<A, B>, other: &Mol<A, B>) -> bool {
    is_substructure(other, this)
}

/// `this > other`: strictly more atoms and `other` occurs in `this`.
pub fn is_proper_superstructure<A: Ord, B: Ord>(this: &Mol<A, B>, other: &Mol<A, B>) -> bool {
    this.atom_count() > other.atom_count() && is_substructure(other, this)
}

/// Containment order between two graphs.
///
/// `Less` means `a` is a proper substructure of `b`, `Greater` the reverse,
/// `Equal` that the sizes agree and `a` occurs in `b`. Graphs where neither
/// contains the other are incomparable. This is a partial order by size and
/// containment, not a total order.
pub fn structure_cmp<A: Ord, B: Ord>(a: &Mol<A, B>, b: &Mol<A, B>) -> Option<Ordering> {
    let ordering = a.atom_count().cmp(&b.atom_count());
    let contained = match ordering {
        Ordering::Less | Ordering::Equal => is_substructure(a, b),
        Ordering::Greater => is_substructure(b, a),
    };
    contained.then_some(ordering)
}

impl<A: Ord, B: Ord> Mol<A, B> {
    /// Mappings of `self` into `other`; see [`get_mapping`].
    pub fn get_mapping<'a>(
        &'a self,
        other: &'a Mol<A, B>,
        automorphism_filter: bool,
    ) -> ExactMappings<'a, A, B, Mol<A, B>> {
        get_mapping(self, other, automorphism_filter)
    }

    /// Whether `self` occurs in `other`.
    pub fn is_substructure(&self, other: &Mol<A, B>) -> bool {
        is_substructure(self, other)
    }

    pub fn is_equal(&self, other: &Mol<A, B>) -> bool {
        is_equal(self, other)
    }

    pub fn structure_cmp(&self, other: &Mol<A, B>) -> Option<Ordering> {
        structure_cmp(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::{BondOrder, DynamicBond};

    type TestMol = Mol<Atom, BondOrder>;

    fn mol(atoms: &[(AtomId, u8)], bonds: &[(AtomId, AtomId, BondOrder)]) -> TestMol {
        Mol::from_parts(
            atoms.iter().map(|&(id, z)| (id, Atom::new(z))),
            bonds.iter().copied(),
        )
        .unwrap_or_else(|e| panic!("bad test graph: {e}"))
    }

    fn ring(n: AtomId, z: u8, order: BondOrder) -> TestMol {
        let atoms: Vec<(AtomId, u8)> = (1..=n).map(|id| (id, z)).collect();
        let bonds: Vec<_> = (1..=n).map(|id| (id, id % n + 1, order)).collect();
        mol(&atoms, &bonds)
    }

    fn chain(labels: &[u8]) -> TestMol {
        let n = labels.len() as AtomId;
        let atoms: Vec<(AtomId, u8)> = (1..=n).zip(labels.iter().copied()).collect();
        let bonds: Vec<_> = (1..n).map(|id| (id, id + 1, BondOrder::Single)).collect();
        mol(&atoms, &bonds)
    }

    fn assert_valid(query: &TestMol, target: &TestMol, mapping: &Mapping) {
        assert_eq!(mapping.len(), query.atom_count());
        let mut images: Vec<AtomId> = mapping.values().copied().collect();
        images.sort_unstable();
        images.dedup();
        assert_eq!(images.len(), mapping.len(), "mapping must be injective");
        for (&q, &t) in mapping {
            assert_eq!(query.atom(q), target.atom(t));
        }
        for (a, b, bond) in query.bonds() {
            assert_eq!(target.bond(mapping[&a], mapping[&b]), Some(bond));
        }
    }

    #[test]
    fn chain_onto_itself_is_identity() {
        let query = chain(&[6, 7, 8, 16]);
        let target = chain(&[6, 7, 8, 16]);
        let all: Vec<Mapping> = get_mapping(&query, &target, false).collect();
        assert_eq!(all.len(), 1);
        assert!(all[0].iter().all(|(q, t)| q == t));
    }

    #[test]
    fn triangle_filtered_to_one_occurrence() {
        let query = ring(3, 6, BondOrder::Single);
        let target = ring(3, 6, BondOrder::Single);
        let filtered: Vec<Mapping> = get_mapping(&query, &target, true).collect();
        assert_eq!(filtered.len(), 1);
        let unfiltered: Vec<Mapping> = get_mapping(&query, &target, false).collect();
        assert_eq!(unfiltered.len(), 6);
        for mapping in &unfiltered {
            assert_valid(&query, &target, mapping);
        }
    }

    #[test]
    fn disconnected_query_tries_both_assignments() {
        let query = mol(&[(1, 11), (2, 17)], &[]);
        let target = mol(&[(10, 17), (20, 11)], &[]);
        let all: Vec<Mapping> = get_mapping(&query, &target, false).collect();
        assert_eq!(all, vec![Mapping::from([(1, 20), (2, 10)])]);
    }

    #[test]
    fn disconnected_query_product_of_components() {
        // two carbons in a target with three isolated carbons
        let query = mol(&[(1, 6), (2, 6)], &[]);
        let target = mol(&[(1, 6), (2, 6), (3, 6)], &[]);
        assert_eq!(get_mapping(&query, &target, false).count(), 6);
        assert_eq!(get_mapping(&query, &target, true).count(), 3);
    }

    #[test]
    fn assignment_yields_full_component_product() {
        // two separate C-C edges into two separate propane chains
        let single = BondOrder::Single;
        let query = mol(&[(1, 6), (2, 6), (3, 6), (4, 6)], &[(1, 2, single), (3, 4, single)]);
        let target = mol(
            &[(1, 6), (2, 6), (3, 6), (4, 6), (5, 6), (6, 6)],
            &[(1, 2, single), (2, 3, single), (4, 5, single), (5, 6, single)],
        );
        // 4 placements per edge and per chain, times 2 chain assignments
        let all: Vec<Mapping> = get_mapping(&query, &target, false).collect();
        assert_eq!(all.len(), 32);
        for mapping in &all {
            assert_valid(&query, &target, mapping);
            let first_chain = mapping[&1] <= 3;
            assert_eq!(mapping[&2] <= 3, first_chain);
            assert_ne!(mapping[&3] <= 3, first_chain);
        }
        assert_eq!(get_mapping(&query, &target, true).count(), 4);
        assert_eq!(get_mapping(&query, &target, false).take(1).count(), 1);
    }

    #[test]
    fn disconnected_query_needs_enough_target_components() {
        let query = mol(&[(1, 6), (2, 6)], &[]);
        let target = chain(&[6, 6]);
        assert!(!is_substructure(&query, &target));
    }

    #[test]
    fn missing_label_means_no_match() {
        let query = chain(&[9]);
        let target = chain(&[6, 7, 8]);
        assert_eq!(get_mapping(&query, &target, true).count(), 0);
        assert!(!is_substructure(&query, &target));
    }

    #[test]
    fn empty_query_matches_once() {
        let query = TestMol::new();
        let target = chain(&[6, 8]);
        let all: Vec<Mapping> = get_mapping(&query, &target, true).collect();
        assert_eq!(all, vec![Mapping::new()]);
        assert!(is_substructure(&query, &TestMol::new()));
    }

    #[test]
    fn reflexive_substructure_and_equality() {
        for graph in [
            chain(&[6, 6, 8]),
            ring(6, 6, BondOrder::Aromatic),
            mol(&[(1, 11), (2, 17), (3, 8)], &[]),
        ] {
            assert!(is_substructure(&graph, &graph));
            assert!(is_equal(&graph, &graph));
            assert_eq!(structure_cmp(&graph, &graph), Some(Ordering::Equal));
        }
    }

    #[test]
    fn equality_short_circuits_on_size() {
        let small = chain(&[6, 6]);
        let large = chain(&[6, 6, 6]);
        assert!(is_substructure(&small, &large));
        assert!(!is_equal(&small, &large));
    }

    #[test]
    fn partial_order_by_size_and_containment() {
        let ethane = chain(&[6, 6]);
        let propane = chain(&[6, 6, 6]);
        let water = chain(&[8]);

        assert!(is_proper_substructure(&ethane, &propane));
        assert!(!is_proper_substructure(&ethane, &ethane));
        assert!(is_proper_superstructure(&propane, &ethane));
        assert!(is_superstructure(&propane, &ethane));
        assert!(is_superstructure(&ethane, &ethane));
        assert_eq!(structure_cmp(&ethane, &propane), Some(Ordering::Less));
        assert_eq!(structure_cmp(&propane, &ethane), Some(Ordering::Greater));
        assert_eq!(structure_cmp(&water, &propane), None);

        let methanol = chain(&[6, 8]);
        assert_eq!(ethane.structure_cmp(&methanol), None);
    }

    #[test]
    fn bond_labels_must_agree() {
        let double = mol(&[(1, 6), (2, 6)], &[(1, 2, BondOrder::Double)]);
        let single = chain(&[6, 6]);
        assert!(!is_substructure(&double, &single));
        assert!(!is_substructure(&single, &double));
    }

    #[test]
    fn ring_closure_bond_label_checked() {
        let mut target = ring(3, 6, BondOrder::Single);
        *target.bond_mut(3, 1).unwrap() = BondOrder::Double;
        let query = ring(3, 6, BondOrder::Single);
        assert!(!is_substructure(&query, &target));
    }

    #[test]
    fn filter_never_adds_node_sets() {
        let query = chain(&[6, 6]);
        let target = ring(6, 6, BondOrder::Single);
        let key = |m: &Mapping| {
            let mut atoms: Vec<AtomId> = m.values().copied().collect();
            atoms.sort_unstable();
            atoms
        };
        let unfiltered: HashSet<Vec<AtomId>> =
            get_mapping(&query, &target, false).map(|m| key(&m)).collect();
        let filtered: Vec<Vec<AtomId>> =
            get_mapping(&query, &target, true).map(|m| key(&m)).collect();
        assert_eq!(filtered.len(), unfiltered.len());
        assert_eq!(filtered.len(), 6);
        assert!(filtered.iter().all(|set| unfiltered.contains(set)));
    }

    #[test]
    fn every_mapping_is_valid() {
        let query = ring(6, 6, BondOrder::Aromatic);
        let mut target = ring(6, 6, BondOrder::Aromatic);
        let o = target.add_atom(Atom::new(8));
        target.add_bond(1, o, BondOrder::Single).unwrap();
        let all: Vec<Mapping> = get_mapping(&query, &target, false).collect();
        assert_eq!(all.len(), 12);
        for mapping in &all {
            assert_valid(&query, &target, mapping);
        }
    }

    #[test]
    fn laziness_allows_partial_consumption() {
        let query = chain(&[6, 6]);
        let target = ring(20, 6, BondOrder::Single);
        let first_three: Vec<Mapping> = get_mapping(&query, &target, false).take(3).collect();
        assert_eq!(first_three.len(), 3);
    }

    #[test]
    fn custom_matchers_cross_label_types() {
        // plain single-bond query against a CGR whose bond is being broken
        let query = chain(&[6, 6]);
        let cgr: Mol<Atom, DynamicBond> = Mol::from_parts(
            [(1, Atom::new(6)), (2, Atom::new(6))],
            [(1, 2, DynamicBond::new(Some(BondOrder::Single), None))],
        )
        .unwrap();
        let reactant_side = |q: &BondOrder, t: &DynamicBond| t.order == Some(*q);
        let product_side = |q: &BondOrder, t: &DynamicBond| t.p_order == Some(*q);
        let atoms = |q: &Atom, t: &Atom| q == t;
        assert!(is_substructure_with(&query, &cgr, atoms, reactant_side));
        assert!(!is_substructure_with(&query, &cgr, atoms, product_side));
    }

    #[test]
    fn element_only_matching_ignores_charge() {
        let query = chain(&[8]);
        let target: TestMol = Mol::from_parts(
            [(
                1,
                Atom {
                    formal_charge: -1,
                    ..Atom::new(8)
                },
            )],
            [],
        )
        .unwrap();
        assert!(!is_substructure(&query, &target));
        let by_element = |q: &Atom, t: &Atom| q.atomic_num == t.atomic_num;
        let any_bond = |_: &BondOrder, _: &BondOrder| true;
        assert_eq!(
            get_mapping_with(&query, &target, true, by_element, any_bond).count(),
            1
        );
    }
}
