pub mod atom;
pub mod bond;
pub mod canonical;
pub mod error;
pub mod graph_ops;
pub mod matcher;
pub mod mol;
pub mod spanning;
pub mod substruct;
pub mod traits;

pub use atom::Atom;
pub use bond::{BondOrder, DynamicBond};
pub use canonical::{rank, rank_with, Convergence, MorganOptions, Ranking};
pub use error::GraphError;
pub use graph_ops::{
    augmented_substructure, augmented_substructures, split, substructure, union, without,
};
pub use matcher::{ComponentMatches, Mapping};
pub use mol::Mol;
pub use spanning::{compile, SpanningForest, TreeNode};
pub use substruct::{
    get_mapping, get_mapping_with, is_equal, is_proper_substructure, is_proper_superstructure,
    is_substructure, is_substructure_with, is_superstructure, structure_cmp, ExactMappings,
    Mappings,
};
pub use traits::{AtomId, MolecularGraph};
