/// Default atom label for a molecular or reaction graph node.
///
/// `Atom` stores the intrinsic properties that distinguish one atom from
/// another when comparing structures. The matching and ranking engines treat
/// it as an opaque value: two atoms match when their labels are equal, and
/// ranking only needs the derived total order.
///
/// # Examples
///
/// ```
/// use cgrmatch::Atom;
///
/// let carbon = Atom::new(6);
/// let oxide = Atom { formal_charge: -1, ..Atom::new(8) };
/// assert_ne!(carbon, oxide);
/// assert!(carbon < oxide);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, …). Identifies the element.
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Mass number. `0` means natural isotopic abundance.
    pub isotope: u16,
    /// Whether the atom carries an unpaired electron.
    pub is_radical: bool,
}

impl Atom {
    /// A neutral, non-radical atom of natural isotopic abundance.
    pub fn new(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_dominates_ordering() {
        let anion = Atom {
            formal_charge: -1,
            ..Atom::new(6)
        };
        assert!(anion < Atom::new(7));
        assert!(Atom::new(6) > anion);
    }

    #[test]
    fn radical_flag_distinguishes() {
        let radical = Atom {
            is_radical: true,
            ..Atom::new(6)
        };
        assert_ne!(radical, Atom::new(6));
    }
}
