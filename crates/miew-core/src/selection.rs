//! Visibility selection used to filter surface vertices by owner atom.

use std::collections::{BTreeSet, HashSet};

use crate::atoms::AtomId;

/// Decides whether an atom is part of the visible selection.
pub trait VisibilitySelector {
    /// Returns true if `atom` is selected.
    fn includes_atom(&self, atom: AtomId) -> bool;
}

impl<F> VisibilitySelector for F
where
    F: Fn(AtomId) -> bool,
{
    fn includes_atom(&self, atom: AtomId) -> bool {
        self(atom)
    }
}

impl<S: std::hash::BuildHasher> VisibilitySelector for HashSet<AtomId, S> {
    fn includes_atom(&self, atom: AtomId) -> bool {
        self.contains(&atom)
    }
}

impl VisibilitySelector for BTreeSet<AtomId> {
    fn includes_atom(&self, atom: AtomId) -> bool {
        self.contains(&atom)
    }
}
