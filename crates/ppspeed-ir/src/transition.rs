use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::head_pair::HeadPair;
use crate::protocol::StateId;

/// A pairwise interaction: the agents in `pre` move to `post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Transition {
    pub pre: HeadPair,
    pub post: HeadPair,
}

impl Transition {
    pub fn new(pre: impl Into<HeadPair>, post: impl Into<HeadPair>) -> Self {
        Self {
            pre: pre.into(),
            post: post.into(),
        }
    }

    /// States of `pre` as a plain set (one or two elements).
    pub fn preset(&self) -> BTreeSet<StateId> {
        self.pre.iter().collect()
    }

    /// States of `post` as a plain set (one or two elements).
    pub fn postset(&self) -> BTreeSet<StateId> {
        self.post.iter().collect()
    }

    pub fn is_silent(&self) -> bool {
        self.pre == self.post
    }

    pub fn increased(&self, q: StateId) -> bool {
        self.pre.count(q) < self.post.count(q)
    }

    pub fn decreased(&self, q: StateId) -> bool {
        self.pre.count(q) > self.post.count(q)
    }

    pub fn unchanged(&self, q: StateId) -> bool {
        self.pre.count(q) == self.post.count(q)
    }

    /// Net change of the number of agents in `q` when the transition fires.
    pub fn delta(&self, q: StateId) -> i64 {
        self.post.count(q) as i64 - self.pre.count(q) as i64
    }
}
