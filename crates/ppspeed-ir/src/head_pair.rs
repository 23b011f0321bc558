use serde::{Deserialize, Serialize};

use crate::protocol::StateId;

/// An unordered pair of states, i.e. a 2-element multiset.
///
/// Used both for interaction heads (the `pre` of a transition) and for the
/// `post` of a transition. The elements are stored sorted, so the derived
/// equality, ordering and hashing are invariant under swapping the
/// constructor arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(StateId, StateId)", into = "(StateId, StateId)")]
pub struct HeadPair {
    lo: StateId,
    hi: StateId,
}

impl HeadPair {
    pub fn new(a: StateId, b: StateId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// Some element of the pair.
    pub fn some(&self) -> StateId {
        self.lo
    }

    /// The element paired with `x`. Meaningful only when `x` is in the pair.
    pub fn other(&self, x: StateId) -> StateId {
        if self.lo == x {
            self.hi
        } else {
            self.lo
        }
    }

    pub fn contains(&self, x: StateId) -> bool {
        self.lo == x || self.hi == x
    }

    /// Multiplicity of `x`: 0, 1 or 2.
    pub fn count(&self, x: StateId) -> usize {
        usize::from(self.lo == x) + usize::from(self.hi == x)
    }

    /// Both elements are the same state.
    pub fn is_degenerate(&self) -> bool {
        self.lo == self.hi
    }

    pub fn elements(&self) -> (StateId, StateId) {
        (self.lo, self.hi)
    }

    pub fn iter(&self) -> impl Iterator<Item = StateId> {
        [self.lo, self.hi].into_iter()
    }

    /// States of the pair that also occur in `other`, without repetition.
    pub fn shared_states(&self, other: &HeadPair) -> Vec<StateId> {
        let mut shared: Vec<StateId> = self.iter().filter(|q| other.contains(*q)).collect();
        shared.dedup();
        shared
    }
}

impl From<(StateId, StateId)> for HeadPair {
    fn from((a, b): (StateId, StateId)) -> Self {
        HeadPair::new(a, b)
    }
}

impl From<HeadPair> for (StateId, StateId) {
    fn from(pair: HeadPair) -> Self {
        pair.elements()
    }
}
