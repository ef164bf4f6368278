use std::collections::{BTreeMap, HashMap};

use tracing::{trace, warn};

use crate::traits::{AtomId, MolecularGraph};

/// Heuristic constants of the Morgan refinement loop.
///
/// The defaults are the thresholds the rankings of this crate are calibrated
/// on. They are a pragmatic stopping rule, not a proof of canonicity: highly
/// symmetric graphs may stop with classes that are not orbits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorganOptions {
    /// Round budget per atom.
    pub budget_factor: usize,
    /// Non-improving rounds tolerated while the lowest class is still shared.
    pub tied_rounds: usize,
    /// Non-improving rounds tolerated once the lowest class is a singleton.
    pub stagnant_rounds: usize,
}

impl Default for MorganOptions {
    fn default() -> Self {
        Self {
            budget_factor: 4,
            tied_rounds: 3,
            stagnant_rounds: 2,
        }
    }
}

/// Which stopping rule ended the refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convergence {
    /// Every atom ended in its own class.
    Discriminated,
    /// The number of classes stopped growing.
    Stable,
    /// The round budget ran out; ranks are usable but not settled.
    Exhausted,
}

/// Canonical rank of every atom of a graph.
///
/// Ranks are class ids: atoms with the same extended neighborhood share a
/// rank, and a higher rank means the atom is visited earlier when the graph
/// is traversed.
///
/// Classes are numbered in the lexicographic order of their sorted factor
/// multisets, not in the numeric order of a prime-weight product. The
/// partition into classes is the same either way, but the rank values (and
/// with them the traversal root and visit order) can differ: `{1, 1, 4}`
/// ranks below `{2, 2, 2}` here although `2·2·7 > 3·3·3` with primes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    ranks: BTreeMap<AtomId, usize>,
    convergence: Convergence,
}

impl Ranking {
    pub fn get(&self, atom: AtomId) -> Option<usize> {
        self.ranks.get(&atom).copied()
    }

    /// Rank of an atom; atoms outside the graph sort below every atom.
    pub fn rank_of(&self, atom: AtomId) -> usize {
        self.get(atom).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomId, usize)> + '_ {
        self.ranks.iter().map(|(&atom, &rank)| (atom, rank))
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn class_count(&self) -> usize {
        count_distinct(self.ranks.values().copied())
    }

    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    pub fn is_converged(&self) -> bool {
        self.convergence != Convergence::Exhausted
    }
}

pub fn rank<G>(graph: &G) -> Ranking
where
    G: MolecularGraph,
    G::Atom: Ord,
    G::Bond: Ord,
{
    rank_with(graph, &MorganOptions::default())
}

pub fn rank_with<G>(graph: &G, options: &MorganOptions) -> Ranking
where
    G: MolecularGraph,
    G::Atom: Ord,
    G::Bond: Ord,
{
    let mut atoms: Vec<AtomId> = graph.atom_ids().collect();
    atoms.sort_unstable();

    match atoms.len() {
        0 => {
            return Ranking {
                ranks: BTreeMap::new(),
                convergence: Convergence::Discriminated,
            }
        }
        1 => {
            return Ranking {
                ranks: BTreeMap::from([(atoms[0], 1)]),
                convergence: Convergence::Discriminated,
            }
        }
        _ => {}
    }

    let index: HashMap<AtomId, usize> = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
    let adjacency: Vec<Vec<usize>> = atoms
        .iter()
        .map(|&atom| graph.bonds_of(atom).map(|(nb, _)| index[&nb]).collect())
        .collect();

    let signatures: Vec<(&G::Atom, Vec<&G::Bond>)> = atoms
        .iter()
        .map(|&atom| {
            let mut bonds: Vec<&G::Bond> = graph.bonds_of(atom).map(|(_, bond)| bond).collect();
            bonds.sort_unstable();
            (graph.atom(atom), bonds)
        })
        .collect();

    let mut weights = classes_from_keys(&signatures);
    let budget = options.budget_factor * atoms.len();
    let convergence = morgan_refine(&adjacency, &mut weights, budget, options);

    Ranking {
        ranks: atoms.into_iter().zip(weights).collect(),
        convergence,
    }
}

/// Assigns class ids 1, 2, 3, … to the distinct keys in ascending key order.
fn classes_from_keys<K: Ord>(keys: &[K]) -> Vec<usize> {
    let n = keys.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut classes = vec![0usize; n];
    let mut class = 0;
    for (i, &idx) in indices.iter().enumerate() {
        if i == 0 || keys[idx] != keys[indices[i - 1]] {
            class += 1;
        }
        classes[idx] = class;
    }
    classes
}

fn count_distinct(classes: impl IntoIterator<Item = usize>) -> usize {
    let mut sorted: Vec<usize> = classes.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Number of atoms sharing the lowest class id.
fn lowest_class_size(weights: &[usize]) -> usize {
    let lowest = weights.iter().copied().min().unwrap_or(0);
    weights.iter().filter(|&&w| w == lowest).count()
}

/// One refinement round.
///
/// The new weight of an atom is w² · ∏ w(neighbor). Class ids are small
/// consecutive integers, so the product itself could alias different
/// neighborhoods; the exact factor multiset is compared instead. Two atoms
/// share a class afterwards iff their factor multisets are equal, the same
/// relation a product of distinct primes would induce. New ids follow the
/// lexicographic order of the multisets.
fn refine_once(adjacency: &[Vec<usize>], weights: &[usize]) -> Vec<usize> {
    let factors: Vec<Vec<usize>> = adjacency
        .iter()
        .enumerate()
        .map(|(i, neighbors)| {
            let mut product = Vec::with_capacity(neighbors.len() + 2);
            product.push(weights[i]);
            product.push(weights[i]);
            product.extend(neighbors.iter().map(|&nb| weights[nb]));
            product.sort_unstable();
            product
        })
        .collect();
    classes_from_keys(&factors)
}

fn morgan_refine(
    adjacency: &[Vec<usize>],
    weights: &mut Vec<usize>,
    budget: usize,
    options: &MorganOptions,
) -> Convergence {
    let n = weights.len();
    let mut tries = budget;
    let mut distinct = count_distinct(weights.iter().copied());
    let mut stable_rounds = 0;
    let mut bonus_used = false;

    while tries > 0 {
        let previous = distinct;
        *weights = refine_once(adjacency, weights);
        distinct = count_distinct(weights.iter().copied());
        trace!(classes = distinct, previous, "morgan round");

        if distinct == n {
            return Convergence::Discriminated;
        } else if distinct == previous {
            if lowest_class_size(weights) > 1 {
                if stable_rounds == options.tied_rounds {
                    return Convergence::Stable;
                }
            } else if stable_rounds >= options.stagnant_rounds {
                return Convergence::Stable;
            }
            stable_rounds += 1;
        } else if stable_rounds > 0 {
            stable_rounds = 0;
        }

        tries -= 1;
        if tries == 0 && distinct < previous && !bonus_used {
            warn!(
                classes = distinct,
                previous, "morgan: round budget spent while classes merged, one more round"
            );
            bonus_used = true;
            tries = 1;
        }
    }

    warn!(
        classes = distinct,
        atoms = n,
        "morgan: round budget spent, ranking did not fully converge"
    );
    Convergence::Exhausted
}
