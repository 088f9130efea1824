use serde::{Deserialize, Serialize};
use std::fmt;

use super::delta::{Delta, FailingSets};

/// Binary verdict of the oracle on a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// The failure does not reproduce.
    Pass,
    /// The failure reproduces.
    Fail,
}

impl Outcome {
    /// Map the oracle's boolean, where `true` means the subset passed.
    pub const fn from_pass(passed: bool) -> Self {
        if passed {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub const fn is_fail(self) -> bool {
        matches!(self, Self::Fail)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value produced by one node of the decomposition.
///
/// `Passed` carries no subsets and `Failed` carries at least one, so the
/// outcome can always be read off the found subsets. `Probed` is the marker of
/// a probe-only test that observed a failure without recursing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "subsets", rename_all = "snake_case")]
pub enum NodeResult {
    Passed,
    Failed(Vec<Delta>),
    Probed,
}

impl NodeResult {
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Passed => Outcome::Pass,
            Self::Failed(_) | Self::Probed => Outcome::Fail,
        }
    }

    pub const fn is_fail(&self) -> bool {
        self.outcome().is_fail()
    }

    /// The failing subsets found below this node.
    pub fn found(&self) -> &[Delta] {
        match self {
            Self::Failed(sets) => sets,
            Self::Passed | Self::Probed => &[],
        }
    }

    /// Take the failing subsets found below this node.
    pub fn into_found(self) -> Vec<Delta> {
        match self {
            Self::Failed(sets) => sets,
            Self::Passed | Self::Probed => Vec::new(),
        }
    }

    /// Merge every child's findings without duplicates. An empty merge is a
    /// pass.
    pub fn merge<I: IntoIterator<Item = Self>>(results: I) -> Self {
        let sets: FailingSets = results.into_iter().flat_map(Self::into_found).collect();
        if sets.is_empty() {
            Self::Passed
        } else {
            Self::Failed(sets.into_vec())
        }
    }
}
