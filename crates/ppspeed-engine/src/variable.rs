//! Symbolic variables and their valuations.
//!
//! Each state `q` has two boolean variables describing the pair of agents
//! about to interact: the plain variable "some agent of the pair is in `q`"
//! and the unique variable "both agents are in `q`". Together they encode
//! multiplicities 0, 1 and 2 without integer arithmetic.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ppspeed_ir::StateId;
use ppspeed_smt::sorts::SmtSort;
use ppspeed_smt::terms::{Declaration, SmtTerm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    pub state: StateId,
    pub unique: bool,
}

impl Var {
    pub fn new(state: StateId, unique: bool) -> Self {
        Self { state, unique }
    }

    pub fn plain(state: StateId) -> Self {
        Self::new(state, false)
    }

    pub fn unique(state: StateId) -> Self {
        Self::new(state, true)
    }

    pub fn opposite(self) -> Self {
        Self::new(self.state, !self.unique)
    }

    /// Name of the variable in solver sessions.
    pub fn smt_name(self) -> String {
        if self.unique {
            format!("s{}_u", self.state)
        } else {
            format!("s{}", self.state)
        }
    }

    pub fn term(self) -> SmtTerm {
        SmtTerm::var(self.smt_name())
    }

    pub fn declaration(self) -> Declaration {
        (self.smt_name(), SmtSort::Bool)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.state, if self.unique { "!" } else { "" })
    }
}

/// A truth assignment to variables.
///
/// Writes propagate: a unique variable set to true also sets its plain
/// counterpart, and a plain variable set to false also clears its unique
/// counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Valuation {
    values: BTreeMap<Var, bool>,
}

impl Valuation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, var: Var, value: bool) {
        self.values.insert(var, value);
        if var.unique && value {
            self.values.insert(var.opposite(), true);
        } else if !var.unique && !value {
            self.values.insert(var.opposite(), false);
        }
    }

    pub fn get(&self, var: Var) -> Option<bool> {
        self.values.get(&var).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Var, bool)> + '_ {
        self.values.iter().map(|(v, b)| (*v, *b))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn states_where(&self, pred: impl Fn(Var, bool) -> bool) -> BTreeSet<StateId> {
        self.iter()
            .filter(|(v, b)| pred(*v, *b))
            .map(|(v, _)| v.state)
            .collect()
    }

    /// States with some variable set to true.
    pub fn present_states(&self) -> BTreeSet<StateId> {
        self.states_where(|_, b| b)
    }

    /// States whose plain variable is false.
    pub fn absent_states(&self) -> BTreeSet<StateId> {
        self.states_where(|v, b| !v.unique && !b)
    }

    /// States whose unique variable is true.
    pub fn unique_states(&self) -> BTreeSet<StateId> {
        self.states_where(|v, b| v.unique && b)
    }

    /// States whose unique variable is false.
    pub fn non_unique_states(&self) -> BTreeSet<StateId> {
        self.states_where(|v, b| v.unique && !b)
    }

    /// States whose plain variable is true.
    pub fn plain_present_states(&self) -> BTreeSet<StateId> {
        self.states_where(|v, b| !v.unique && b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_true_forces_plain_true() {
        let mut val = Valuation::new();
        val.set(Var::unique(2), true);
        assert_eq!(val.get(Var::plain(2)), Some(true));
        assert_eq!(val.unique_states(), BTreeSet::from([2]));
        assert_eq!(val.present_states(), BTreeSet::from([2]));
    }

    #[test]
    fn plain_false_forces_unique_false() {
        let mut val = Valuation::new();
        val.set(Var::plain(1), false);
        assert_eq!(val.get(Var::unique(1)), Some(false));
        assert_eq!(val.absent_states(), BTreeSet::from([1]));
        assert_eq!(val.non_unique_states(), BTreeSet::from([1]));
    }

    #[test]
    fn other_writes_do_not_propagate() {
        let mut val = Valuation::new();
        val.set(Var::plain(0), true);
        val.set(Var::unique(3), false);
        assert_eq!(val.len(), 2);
        assert_eq!(val.get(Var::unique(0)), None);
        assert_eq!(val.get(Var::plain(3)), None);
    }

    #[test]
    fn names_distinguish_the_two_variables_of_a_state() {
        assert_eq!(Var::plain(4).smt_name(), "s4");
        assert_eq!(Var::unique(4).smt_name(), "s4_u");
        assert_eq!(Var::plain(4).opposite(), Var::unique(4));
        assert_eq!(Var::unique(4).to_string(), "4!");
    }
}
