//! Partitions of a delta into disjoint parts, with bisection lineage.

use serde::{Deserialize, Serialize};

use super::delta::Delta;

/// What is known about how a part was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "link", content = "with", rename_all = "snake_case")]
pub enum Link {
    /// Produced by the same bisection as the part at this index; the universe
    /// minus both parts is a subset of a complement already known to pass.
    Sibling(usize),
    /// A single atom that could not be split further.
    Leaf,
    /// No structural knowledge.
    Loose,
}

/// An ordered subdivision of a universe into disjoint, non-empty parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    parts: Vec<Delta>,
    links: Vec<Link>,
}

impl Partition {
    /// Contiguous split of `delta` into at most `n` parts.
    pub fn contiguous(delta: &Delta, n: usize) -> Self {
        let parts = delta.split(n);
        let links = vec![Link::Loose; parts.len()];
        Self { parts, links }
    }

    /// Bisect every delta: a part of two or more atoms becomes a sibling
    /// pair, a single atom is kept as a leaf.
    pub fn bisect_all<'a, I>(deltas: I) -> Self
    where
        I: IntoIterator<Item = &'a Delta>,
    {
        let mut parts = Vec::new();
        let mut links = Vec::new();
        for delta in deltas {
            if delta.len() >= 2 {
                let base = parts.len();
                parts.extend(delta.split(2));
                links.push(Link::Sibling(base + 1));
                links.push(Link::Sibling(base));
            } else if !delta.is_empty() {
                parts.push(delta.clone());
                links.push(Link::Leaf);
            }
        }
        Self { parts, links }
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Parts in order.
    pub fn parts(&self) -> &[Delta] {
        &self.parts
    }

    /// Part at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn part(&self, index: usize) -> &Delta {
        &self.parts[index]
    }

    /// How the part at `index` relates to the others.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn link(&self, index: usize) -> Link {
        self.links[index]
    }

    /// Index of the bisection sibling of a part, if it has one.
    pub fn sibling_of(&self, index: usize) -> Option<usize> {
        match self.links[index] {
            Link::Sibling(other) => Some(other),
            Link::Leaf | Link::Loose => None,
        }
    }

    /// The reunited delta.
    pub fn universe(&self) -> Delta {
        Delta::union(&self.parts)
    }

    /// The universe without one part.
    pub fn complement(&self, index: usize) -> Delta {
        Delta::union(
            self.parts
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, part)| part),
        )
    }

    /// The universe without every listed part.
    pub fn complement_of(&self, excluded: &[usize]) -> Delta {
        Delta::union(
            self.parts
                .iter()
                .enumerate()
                .filter(|(i, _)| !excluded.contains(i))
                .map(|(_, part)| part),
        )
    }

    /// Every part is a single atom.
    pub fn is_atomic(&self) -> bool {
        self.parts.iter().all(|part| part.len() == 1)
    }

    /// Bisect every part.
    pub fn refine(&self) -> Self {
        Self::bisect_all(&self.parts)
    }

    /// Bisect every part that is not excluded.
    pub fn refine_excluding(&self, excluded: &[usize]) -> Self {
        Self::bisect_all(
            self.parts
                .iter()
                .enumerate()
                .filter(|(i, _)| !excluded.contains(i))
                .map(|(_, part)| part),
        )
    }

    /// Drop the excluded parts, keeping the others unchanged. Sibling links
    /// are re-indexed; a sibling whose partner was dropped becomes loose.
    pub fn without(&self, excluded: &[usize]) -> Self {
        let mut remap = vec![None; self.parts.len()];
        let mut next = 0;
        for (i, slot) in remap.iter_mut().enumerate() {
            if !excluded.contains(&i) {
                *slot = Some(next);
                next += 1;
            }
        }

        let mut parts = Vec::with_capacity(next);
        let mut links = Vec::with_capacity(next);
        for (i, part) in self.parts.iter().enumerate() {
            if remap[i].is_none() {
                continue;
            }
            parts.push(part.clone());
            links.push(match self.links[i] {
                Link::Sibling(other) => remap[other].map_or(Link::Loose, Link::Sibling),
                link => link,
            });
        }
        Self { parts, links }
    }
}
