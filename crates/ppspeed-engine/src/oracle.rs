//! Satisfiability oracle sessions.
//!
//! Every call opens a fresh solver, declares and asserts everything it
//! needs, asks one question and drops the solver. Nothing survives between
//! calls, so an analysis can be abandoned at any point.

use ppspeed_smt::backends::z3_backend::Z3Solver;
use ppspeed_smt::solver::{Model, SatResult, SmtSolver};
use ppspeed_smt::terms::{Declaration, SmtTerm};
use tracing::trace;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Satisfiability {
    Sat,
    Unsat,
}

impl Satisfiability {
    pub fn is_unsat(self) -> bool {
        self == Satisfiability::Unsat
    }
}

pub trait SatOracle {
    /// Decide the conjunction of `terms` over the declared variables.
    fn check(&self, decls: &[Declaration], terms: &[SmtTerm]) -> EngineResult<Satisfiability>;

    /// One model of `terms` restricted to `query`, or `None` when unsat.
    fn model(
        &self,
        decls: &[Declaration],
        terms: &[SmtTerm],
        query: &[Declaration],
    ) -> EngineResult<Option<Model>>;
}

/// Oracle opening one solver from `factory` per call.
pub struct SessionOracle<F> {
    factory: F,
}

impl<F, S> SessionOracle<F>
where
    F: Fn() -> S,
    S: SmtSolver,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    fn open(&self, decls: &[Declaration], terms: &[SmtTerm]) -> EngineResult<S> {
        let mut solver = (self.factory)();
        for (name, sort) in decls {
            solver.declare_var(name, sort).map_err(solver_error)?;
        }
        for term in terms {
            solver.assert(term).map_err(solver_error)?;
        }
        Ok(solver)
    }
}

fn solver_error(err: impl std::error::Error) -> EngineError {
    EngineError::Solver(err.to_string())
}

fn decide(result: SatResult) -> EngineResult<Satisfiability> {
    match result {
        SatResult::Sat => Ok(Satisfiability::Sat),
        SatResult::Unsat => Ok(Satisfiability::Unsat),
        SatResult::Unknown(reason) => Err(EngineError::Inconclusive(reason)),
    }
}

impl<F, S> SatOracle for SessionOracle<F>
where
    F: Fn() -> S,
    S: SmtSolver,
{
    fn check(&self, decls: &[Declaration], terms: &[SmtTerm]) -> EngineResult<Satisfiability> {
        trace!(vars = decls.len(), assertions = terms.len(), "oracle check");
        let mut solver = self.open(decls, terms)?;
        decide(solver.check_sat().map_err(solver_error)?)
    }

    fn model(
        &self,
        decls: &[Declaration],
        terms: &[SmtTerm],
        query: &[Declaration],
    ) -> EngineResult<Option<Model>> {
        trace!(vars = decls.len(), assertions = terms.len(), "oracle model");
        let mut solver = self.open(decls, terms)?;
        let query: Vec<(&str, &_)> = query.iter().map(|(name, sort)| (name.as_str(), sort)).collect();
        let (result, model) = solver.check_sat_with_model(&query).map_err(solver_error)?;
        match decide(result)? {
            Satisfiability::Sat => Ok(Some(model.unwrap_or_default())),
            Satisfiability::Unsat => Ok(None),
        }
    }
}

/// The default oracle, backed by Z3.
#[derive(Debug, Clone, Copy, Default)]
pub struct Z3Oracle {
    timeout_secs: u64,
}

impl Z3Oracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-call solver timeout; 0 disables it.
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    fn sessions(&self) -> SessionOracle<impl Fn() -> Z3Solver> {
        let timeout_secs = self.timeout_secs;
        SessionOracle::new(move || Z3Solver::with_timeout_secs(timeout_secs))
    }
}

impl SatOracle for Z3Oracle {
    fn check(&self, decls: &[Declaration], terms: &[SmtTerm]) -> EngineResult<Satisfiability> {
        self.sessions().check(decls, terms)
    }

    fn model(
        &self,
        decls: &[Declaration],
        terms: &[SmtTerm],
        query: &[Declaration],
    ) -> EngineResult<Option<Model>> {
        self.sessions().model(decls, terms, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppspeed_smt::solver::ModelValue;
    use ppspeed_smt::sorts::SmtSort;
    use std::cell::Cell;
    use std::io;

    struct ScriptedSolver {
        answer: SatResult,
        asserted: usize,
    }

    impl SmtSolver for ScriptedSolver {
        type Error = io::Error;

        fn declare_var(&mut self, _name: &str, _sort: &SmtSort) -> Result<(), io::Error> {
            Ok(())
        }

        fn assert(&mut self, _term: &SmtTerm) -> Result<(), io::Error> {
            self.asserted += 1;
            Ok(())
        }

        fn push(&mut self) -> Result<(), io::Error> {
            Ok(())
        }

        fn pop(&mut self) -> Result<(), io::Error> {
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, io::Error> {
            if self.asserted == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "nothing asserted"));
            }
            Ok(self.answer.clone())
        }

        fn check_sat_with_model(
            &mut self,
            var_names: &[(&str, &SmtSort)],
        ) -> Result<(SatResult, Option<Model>), io::Error> {
            let mut model = Model::default();
            for (name, _) in var_names {
                model.values.insert(name.to_string(), ModelValue::Bool(true));
            }
            Ok((self.check_sat()?, Some(model)))
        }

        fn reset(&mut self) -> Result<(), io::Error> {
            self.asserted = 0;
            Ok(())
        }
    }

    fn decls() -> Vec<Declaration> {
        vec![("s0".to_string(), SmtSort::Bool)]
    }

    #[test]
    fn every_call_opens_a_fresh_session() {
        let opened = Cell::new(0);
        let oracle = SessionOracle::new(|| {
            opened.set(opened.get() + 1);
            ScriptedSolver {
                answer: SatResult::Unsat,
                asserted: 0,
            }
        });
        let terms = [SmtTerm::var("s0")];
        for _ in 0..3 {
            assert_eq!(oracle.check(&decls(), &terms).expect("decided"), Satisfiability::Unsat);
        }
        assert_eq!(opened.get(), 3);
    }

    #[test]
    fn unknown_answer_is_fatal() {
        let oracle = SessionOracle::new(|| ScriptedSolver {
            answer: SatResult::Unknown("timeout".into()),
            asserted: 0,
        });
        let err = oracle
            .check(&decls(), &[SmtTerm::var("s0")])
            .expect_err("unknown must not be decided");
        assert!(matches!(err, EngineError::Inconclusive(ref r) if r == "timeout"));
    }

    #[test]
    fn backend_failures_become_solver_errors() {
        let oracle = SessionOracle::new(|| ScriptedSolver {
            answer: SatResult::Sat,
            asserted: 0,
        });
        let err = oracle.check(&decls(), &[]).expect_err("scripted failure");
        assert!(matches!(err, EngineError::Solver(ref m) if m.contains("nothing asserted")));
    }

    #[test]
    fn model_is_none_when_unsat() {
        let oracle = SessionOracle::new(|| ScriptedSolver {
            answer: SatResult::Unsat,
            asserted: 0,
        });
        let model = oracle
            .model(&decls(), &[SmtTerm::var("s0")], &decls())
            .expect("decided");
        assert!(model.is_none());
    }

    #[test]
    fn z3_oracle_decides_and_models() {
        let oracle = Z3Oracle::new();
        let terms = [SmtTerm::var("s0"), SmtTerm::var("s0").not()];
        assert!(oracle.check(&decls(), &terms).expect("decided").is_unsat());

        let model = oracle
            .model(&decls(), &[SmtTerm::var("s0")], &decls())
            .expect("decided")
            .expect("satisfiable");
        assert_eq!(model.get_bool("s0"), Some(true));
    }
}
