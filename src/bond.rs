#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

/// Bond label of a condensed graph of reaction.
///
/// `order` is the bond in the reactants and `p_order` the bond in the
/// products; `None` on one side marks a bond that is formed or broken by the
/// reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DynamicBond {
    pub order: Option<BondOrder>,
    pub p_order: Option<BondOrder>,
}

impl DynamicBond {
    pub fn new(order: Option<BondOrder>, p_order: Option<BondOrder>) -> Self {
        Self { order, p_order }
    }

    /// A bond present on both sides with the same order.
    pub fn unchanged(order: BondOrder) -> Self {
        Self::new(Some(order), Some(order))
    }

    pub fn is_dynamic(&self) -> bool {
        self.order != self.p_order
    }
}

impl From<BondOrder> for DynamicBond {
    fn from(order: BondOrder) -> Self {
        Self::unchanged(order)
    }
}
