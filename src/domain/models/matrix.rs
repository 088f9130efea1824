//! Pairwise conflict matrix built by the analyser.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Shape of the failing complements, as read from the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degree {
    /// Every pair of failing complements still fails together: a single
    /// cause lives outside all failing parts.
    One,
    /// Two causes, separated by the failing pair `(first, second)` whose
    /// intersection passes.
    Two { first: usize, second: usize },
    /// Neither shape fits.
    General,
}

/// Symmetric `n × n` table over the parts of a partition.
///
/// Cell `(i, j)` is `true` when the universe minus parts `i` and `j` still
/// fails. The diagonal holds the complement outcome of each part. Cells never
/// probed default to `false`: for sibling pairs and for rows whose complement
/// passed, a subset of a passing set is known to pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictMatrix {
    size: usize,
    cells: Vec<bool>,
}

impl ConflictMatrix {
    /// A matrix over `size` parts with every cell passing.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
        }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// Record whether the universe minus parts `i` and `j` fails. Sets both
    /// `(i, j)` and `(j, i)`.
    pub fn set_still_fails(&mut self, i: usize, j: usize, fails: bool) {
        self.cells[i * self.size + j] = fails;
        self.cells[j * self.size + i] = fails;
    }

    /// Whether the universe minus parts `i` and `j` fails; `(i, i)` is the
    /// complement of part `i`.
    pub fn still_fails(&self, i: usize, j: usize) -> bool {
        self.cells[i * self.size + j]
    }

    /// Indices whose complement failed.
    pub fn failing(&self) -> Vec<usize> {
        (0..self.size).filter(|&i| self.still_fails(i, i)).collect()
    }

    /// Failing indices `k` such that removing parts `i` and `k` still fails.
    fn fails_with(&self, i: usize, failing: &[usize]) -> Vec<usize> {
        failing
            .iter()
            .copied()
            .filter(|&k| self.still_fails(i, k))
            .collect()
    }

    fn all_fail(&self, rows: &[usize], cols: &[usize]) -> bool {
        rows.iter()
            .all(|&i| cols.iter().all(|&j| self.still_fails(i, j)))
    }

    fn all_pass(&self, rows: &[usize], cols: &[usize]) -> bool {
        rows.iter()
            .all(|&i| cols.iter().all(|&j| !self.still_fails(i, j)))
    }

    /// Failing indices that still fail together with part `i`.
    pub fn group_of(&self, i: usize) -> Vec<usize> {
        self.fails_with(i, &self.failing())
    }

    /// Classify the failing indices.
    pub fn classify(&self) -> DomainResult<Degree> {
        let failing = self.failing();
        if failing.len() < 2 {
            return Err(DomainError::StructuralInvariant(format!(
                "conflict matrix classification needs at least two failing complements, got {}",
                failing.len()
            )));
        }

        if self.all_fail(&failing, &failing) {
            return Ok(Degree::One);
        }

        let candidates: Vec<(usize, usize)> = failing
            .iter()
            .enumerate()
            .flat_map(|(pos, &a)| failing[pos + 1..].iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| !self.still_fails(a, b))
            .collect();

        if candidates.is_empty() {
            return Err(DomainError::StructuralInvariant(
                "degree-1 check failed but no failing pair passes together".to_string(),
            ));
        }

        Ok(candidates
            .into_iter()
            .find(|&(a, b)| self.separates(a, b, &failing))
            .map_or(Degree::General, |(first, second)| Degree::Two { first, second }))
    }

    /// Whether the failing pair `(a, b)` splits the failing indices into two
    /// groups, one per cause.
    fn separates(&self, a: usize, b: usize, failing: &[usize]) -> bool {
        let group_a = self.fails_with(a, failing);
        let group_b = self.fails_with(b, failing);

        if !self.all_fail(&group_a, &group_a) || !self.all_fail(&group_b, &group_b) {
            return false;
        }

        if failing
            .iter()
            .any(|&k| !self.still_fails(a, k) && !self.still_fails(b, k))
        {
            return false;
        }

        let only_a: Vec<usize> = group_a
            .iter()
            .copied()
            .filter(|k| !group_b.contains(k))
            .collect();
        let only_b: Vec<usize> = group_b
            .iter()
            .copied()
            .filter(|k| !group_a.contains(k))
            .collect();

        self.all_pass(&only_a, &only_b)
    }
}
