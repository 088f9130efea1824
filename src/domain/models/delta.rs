//! Atoms and deltas: the ordered subsets the search operates on.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An indivisible element of the search universe.
///
/// Atoms are addressed by index; the oracle owns the mapping from an index to
/// whatever it stands for (a source line, a symbol, a configuration flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Atom(pub u32);

impl Atom {
    /// Index of the atom in the universe.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Atom {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// An ordered subset of atoms.
///
/// Order is preserved by every operation so that splits stay contiguous with
/// respect to the original universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(Vec<Atom>);

impl Delta {
    /// Wrap atoms as they are, keeping their order.
    pub const fn new(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }

    /// Build a delta from raw atom indices.
    pub fn from_ids<I: IntoIterator<Item = u32>>(ids: I) -> Self {
        ids.into_iter().map(Atom).collect()
    }

    /// The universe `0..size`.
    pub fn range(size: u32) -> Self {
        Self::from_ids(0..size)
    }

    /// Atoms in delta order.
    pub fn atoms(&self) -> &[Atom] {
        &self.0
    }

    pub fn into_atoms(self) -> Vec<Atom> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, atom: Atom) -> bool {
        self.0.contains(&atom)
    }

    /// Whether every atom of `other` belongs to this delta.
    pub fn contains_all(&self, other: &Self) -> bool {
        let own: HashSet<Atom> = self.0.iter().copied().collect();
        other.0.iter().all(|atom| own.contains(atom))
    }

    /// Split into `min(n, len)` contiguous, non-empty parts.
    ///
    /// Part `i` receives `(len - start) / (n - i)` atoms, so sizes differ by
    /// at most one and earlier parts are never larger than later ones.
    pub fn split(&self, n: usize) -> Vec<Self> {
        let n = n.clamp(1, self.len().max(1));
        let mut parts = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let size = (self.len() - start) / (n - i);
            parts.push(Self(self.0[start..start + size].to_vec()));
            start += size;
        }
        parts
    }

    /// Ordered set difference `self \ other`.
    pub fn minus(&self, other: &Self) -> Self {
        let removed: HashSet<Atom> = other.0.iter().copied().collect();
        self.0
            .iter()
            .copied()
            .filter(|atom| !removed.contains(atom))
            .collect()
    }

    /// Ordered set difference against the union of several deltas.
    pub fn minus_all<'a, I>(&self, others: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let removed: HashSet<Atom> = others
            .into_iter()
            .flat_map(|delta| delta.0.iter().copied())
            .collect();
        self.0
            .iter()
            .copied()
            .filter(|atom| !removed.contains(atom))
            .collect()
    }

    /// Concatenate disjoint parts back into one delta.
    pub fn union<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        parts
            .into_iter()
            .flat_map(|delta| delta.0.iter().copied())
            .collect()
    }

    /// Order-independent identity used for deduplication.
    pub fn canonical_key(&self) -> Vec<Atom> {
        let mut key = self.0.clone();
        key.sort_unstable();
        key
    }
}

impl FromIterator<Atom> for Delta {
    fn from_iter<T: IntoIterator<Item = Atom>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, atom) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{atom}")?;
        }
        write!(f, "]")
    }
}

/// Failing subsets merged without duplicates.
///
/// Two deltas holding the same atoms in a different order count as the same
/// subset; the first one inserted keeps its position.
#[derive(Debug, Clone, Default)]
pub struct FailingSets {
    sets: Vec<Delta>,
    seen: HashSet<Vec<Atom>>,
}

impl FailingSets {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a subset, returning `false` if an equivalent one is present.
    pub fn insert(&mut self, delta: Delta) -> bool {
        if self.seen.insert(delta.canonical_key()) {
            self.sets.push(delta);
            true
        } else {
            false
        }
    }

    /// Insert every subset, returning the ones that were new.
    pub fn extend_new<I: IntoIterator<Item = Delta>>(&mut self, deltas: I) -> Vec<Delta> {
        deltas
            .into_iter()
            .filter(|delta| self.insert(delta.clone()))
            .collect()
    }

    /// Subsets in insertion order.
    pub fn as_slice(&self) -> &[Delta] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn into_vec(self) -> Vec<Delta> {
        self.sets
    }
}

impl Extend<Delta> for FailingSets {
    fn extend<T: IntoIterator<Item = Delta>>(&mut self, iter: T) {
        for delta in iter {
            self.insert(delta);
        }
    }
}

impl FromIterator<Delta> for FailingSets {
    fn from_iter<T: IntoIterator<Item = Delta>>(iter: T) -> Self {
        let mut sets = Self::new();
        sets.extend(iter);
        sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_contiguous_and_balanced() {
        let delta = Delta::range(5);
        let parts = delta.split(2);
        assert_eq!(parts, vec![Delta::from_ids([0, 1]), Delta::from_ids([2, 3, 4])]);

        let parts = Delta::range(10).split(3);
        let sizes: Vec<usize> = parts.iter().map(Delta::len).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
    }

    #[test]
    fn test_split_caps_at_length() {
        let parts = Delta::from_ids([7, 8]).split(5);
        assert_eq!(parts, vec![Delta::from_ids([7]), Delta::from_ids([8])]);
    }

    #[test]
    fn test_minus_preserves_order() {
        let delta = Delta::from_ids([5, 1, 4, 2]);
        assert_eq!(delta.minus(&Delta::from_ids([4])), Delta::from_ids([5, 1, 2]));
        assert_eq!(
            delta.minus_all([&Delta::from_ids([5]), &Delta::from_ids([2])]),
            Delta::from_ids([1, 4])
        );
    }

    #[test]
    fn test_failing_sets_dedup_by_canonical_key() {
        let mut sets = FailingSets::new();
        assert!(sets.insert(Delta::from_ids([1, 2])));
        assert!(!sets.insert(Delta::from_ids([2, 1])));
        assert!(sets.insert(Delta::from_ids([3])));
        assert_eq!(sets.len(), 2);
        assert_eq!(sets.as_slice()[0], Delta::from_ids([1, 2]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Delta::from_ids([0, 32]).to_string(), "[0, 32]");
        assert_eq!(Delta::default().to_string(), "[]");
    }
}
