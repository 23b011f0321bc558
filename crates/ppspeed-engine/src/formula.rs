//! Boolean constraints over presence variables.
//!
//! A [`Formula`] is a conjunction of assertions together with the set of
//! variables it mentions. Every satisfiability question conjoins the
//! consistency constraints of that domain, which mirror the propagation rule
//! of [`Valuation`].

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use ppspeed_ir::{HeadPair, StateId};
use ppspeed_smt::backends::smtlib_printer::to_smtlib;
use ppspeed_smt::terms::{Declaration, SmtTerm};

use crate::error::EngineResult;
use crate::oracle::SatOracle;
use crate::variable::{Valuation, Var};

#[derive(Debug, Clone, Default)]
pub struct Formula {
    domain: BTreeSet<Var>,
    assertions: Vec<SmtTerm>,
}

/// `¬v` for the variable of every state, plus those variables.
fn negated_states<S>(states: S, unique: bool) -> (Vec<SmtTerm>, BTreeSet<Var>)
where
    S: IntoIterator,
    S::Item: Borrow<StateId>,
{
    let vars: BTreeSet<Var> = states
        .into_iter()
        .map(|q| Var::new(*q.borrow(), unique))
        .collect();
    let terms = vars.iter().map(|v| v.term().not()).collect();
    (terms, vars)
}

/// One "pair absent" constraint per head.
///
/// For `p != q` the pair is absent when not both states are present. For the
/// degenerate pair `(p, p)` the constraint is `¬p ∨ p!`.
fn pair_constraints<P>(pairs: P) -> (Vec<SmtTerm>, BTreeSet<Var>)
where
    P: IntoIterator,
    P::Item: Borrow<HeadPair>,
{
    let mut terms = Vec::new();
    let mut vars = BTreeSet::new();
    for pair in pairs {
        let (p, q) = pair.borrow().elements();
        if p != q {
            vars.extend([Var::plain(p), Var::plain(q)]);
            terms.push(SmtTerm::or(vec![
                Var::plain(p).term().not(),
                Var::plain(q).term().not(),
            ]));
        } else {
            vars.extend([Var::plain(p), Var::unique(p)]);
            terms.push(SmtTerm::or(vec![
                Var::plain(p).term().not(),
                Var::unique(p).term(),
            ]));
        }
    }
    (terms, vars)
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(&self) -> &BTreeSet<Var> {
        &self.domain
    }

    pub fn assertions(&self) -> &[SmtTerm] {
        &self.assertions
    }

    fn push(&mut self, assertion: SmtTerm, vars: BTreeSet<Var>) {
        self.assertions.push(assertion);
        self.domain.extend(vars);
    }

    pub fn assert_some_states_present<S>(&mut self, states: S, unique: bool)
    where
        S: IntoIterator,
        S::Item: Borrow<StateId>,
    {
        let (negs, vars) = negated_states(states, unique);
        self.push(SmtTerm::and(negs).not(), vars);
    }

    pub fn assert_all_states_present<S>(&mut self, states: S, unique: bool)
    where
        S: IntoIterator,
        S::Item: Borrow<StateId>,
    {
        let (negs, vars) = negated_states(states, unique);
        self.push(SmtTerm::or(negs).not(), vars);
    }

    pub fn assert_some_states_absent<S>(&mut self, states: S, unique: bool)
    where
        S: IntoIterator,
        S::Item: Borrow<StateId>,
    {
        let (negs, vars) = negated_states(states, unique);
        self.push(SmtTerm::or(negs), vars);
    }

    pub fn assert_all_states_absent<S>(&mut self, states: S, unique: bool)
    where
        S: IntoIterator,
        S::Item: Borrow<StateId>,
    {
        let (negs, vars) = negated_states(states, unique);
        self.push(SmtTerm::and(negs), vars);
    }

    pub fn assert_all_pairs_absent<P>(&mut self, pairs: P)
    where
        P: IntoIterator,
        P::Item: Borrow<HeadPair>,
    {
        let (constraints, vars) = pair_constraints(pairs);
        self.push(SmtTerm::and(constraints), vars);
    }

    pub fn assert_some_pair_present<P>(&mut self, pairs: P)
    where
        P: IntoIterator,
        P::Item: Borrow<HeadPair>,
    {
        let (constraints, vars) = pair_constraints(pairs);
        self.push(SmtTerm::and(constraints).not(), vars);
    }

    pub fn assert_some_pair_absent<P>(&mut self, pairs: P)
    where
        P: IntoIterator,
        P::Item: Borrow<HeadPair>,
    {
        let (constraints, vars) = pair_constraints(pairs);
        self.push(SmtTerm::or(constraints), vars);
    }

    pub fn assert_all_pairs_present<P>(&mut self, pairs: P)
    where
        P: IntoIterator,
        P::Item: Borrow<HeadPair>,
    {
        let (constraints, vars) = pair_constraints(pairs);
        self.push(SmtTerm::or(constraints).not(), vars);
    }

    /// Conjoin another formula.
    pub fn assert_formula(&mut self, other: &Formula) {
        self.domain.extend(other.domain.iter().copied());
        self.assertions.extend(other.assertions.iter().cloned());
    }

    /// Replace the assertions by their disjunction.
    pub fn make_disjunctive(&mut self) {
        let assertions = std::mem::take(&mut self.assertions);
        self.assertions.push(SmtTerm::or(assertions));
    }

    fn consistency_constraints(&self) -> SmtTerm {
        SmtTerm::and(
            self.domain
                .iter()
                .map(|v| {
                    if v.unique {
                        v.term().implies(v.opposite().term())
                    } else {
                        v.term().not().implies(v.opposite().term().not())
                    }
                })
                .collect(),
        )
    }

    /// Declarations for the domain, `extra`, and the opposites of both.
    fn declarations<'a>(&'a self, extra: impl IntoIterator<Item = &'a Var>) -> Vec<Declaration> {
        let vars: BTreeSet<Var> = self
            .domain
            .iter()
            .chain(extra)
            .flat_map(|v| [*v, v.opposite()])
            .collect();
        vars.into_iter().map(Var::declaration).collect()
    }

    fn conjunction(&self) -> SmtTerm {
        SmtTerm::and(self.assertions.clone())
    }

    /// The formula forces every pair in `pairs` absent.
    pub fn implies_all_absent<P>(&self, oracle: &dyn SatOracle, pairs: P) -> EngineResult<bool>
    where
        P: IntoIterator,
        P::Item: Borrow<HeadPair>,
    {
        let (constraints, vars) = pair_constraints(pairs);
        let decls = self.declarations(&vars);
        let terms = [
            self.consistency_constraints(),
            self.conjunction().implies(SmtTerm::and(constraints)).not(),
        ];
        Ok(oracle.check(&decls, &terms)?.is_unsat())
    }

    /// The formula forces at least one pair in `pairs` present.
    pub fn implies_some_present<P>(&self, oracle: &dyn SatOracle, pairs: P) -> EngineResult<bool>
    where
        P: IntoIterator,
        P::Item: Borrow<HeadPair>,
    {
        let (constraints, vars) = pair_constraints(pairs);
        let decls = self.declarations(&vars);
        let mut terms = vec![self.consistency_constraints()];
        terms.extend(self.assertions.iter().cloned());
        terms.push(SmtTerm::and(constraints));
        Ok(oracle.check(&decls, &terms)?.is_unsat())
    }

    /// The formula forces every state in `states` absent.
    pub fn implies_all_states_absent<S>(&self, oracle: &dyn SatOracle, states: S) -> EngineResult<bool>
    where
        S: IntoIterator,
        S::Item: Borrow<StateId>,
    {
        let (negs, vars) = negated_states(states, false);
        let decls = self.declarations(&vars);
        let terms = [
            self.consistency_constraints(),
            self.conjunction().implies(SmtTerm::and(negs)).not(),
        ];
        Ok(oracle.check(&decls, &terms)?.is_unsat())
    }

    /// Both formulas hold under their consistency constraints whenever this
    /// one does.
    pub fn implies(&self, other: &Formula, oracle: &dyn SatOracle) -> EngineResult<bool> {
        let decls = self.declarations(&other.domain);
        let terms = [
            self.consistency_constraints(),
            other.consistency_constraints(),
            self.conjunction().implies(other.conjunction()).not(),
        ];
        Ok(oracle.check(&decls, &terms)?.is_unsat())
    }

    /// All satisfying valuations over the domain, by solve-and-block.
    pub fn solutions(&self, oracle: &dyn SatOracle) -> EngineResult<Vec<Valuation>> {
        let decls = self.declarations(None);
        let query: Vec<Declaration> = self.domain.iter().map(|v| v.declaration()).collect();
        let mut terms = vec![self.consistency_constraints()];
        terms.extend(self.assertions.iter().cloned());

        let mut solutions = Vec::new();
        while let Some(model) = oracle.model(&decls, &terms, &query)? {
            let mut valuation = Valuation::new();
            for var in &self.domain {
                let value = model.get_bool(&var.smt_name()).unwrap_or(false);
                valuation.set(*var, value);
            }
            let blocking = valuation
                .iter()
                .map(|(v, b)| if b { v.term().not() } else { v.term() })
                .collect();
            terms.push(SmtTerm::or(blocking));
            solutions.push(valuation);
        }
        Ok(solutions)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_smtlib(&self.conjunction()))
    }
}
