use std::collections::HashMap;

use thiserror::Error;
use z3::SatResult as Z3SatResult;

use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
}

pub struct Z3Solver {
    solver: z3::Solver,
    int_vars: HashMap<String, z3::ast::Int>,
    bool_vars: HashMap<String, z3::ast::Bool>,
    params: Option<z3::Params>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            params: None,
        }
    }

    /// A solver whose checks give up after `timeout_secs` (0 disables).
    ///
    /// A check that runs out of time answers `unknown`, which the engine
    /// treats as fatal.
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout_ms = timeout_secs.saturating_mul(1000).min(u64::from(u32::MAX));
        params.set_u32("timeout", timeout_ms as u32);
        solver.set_params(&params);
        Self {
            solver,
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            params: Some(params),
        }
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => {
                if let Some(v) = self.bool_vars.get(name) {
                    Ok(Z3Term::Bool(v.clone()))
                } else if let Some(v) = self.int_vars.get(name) {
                    Ok(Z3Term::Int(v.clone()))
                } else {
                    Err(Z3Error::UnknownVariable(name.clone()))
                }
            }
            SmtTerm::IntLit(n) => Ok(Z3Term::Int(z3::ast::Int::from_i64(*n))),
            SmtTerm::BoolLit(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            SmtTerm::Add(terms) => {
                let mut summands = terms.iter().map(|t| self.translate_term(t)?.into_int());
                let mut acc = match summands.next() {
                    Some(first) => first?,
                    None => z3::ast::Int::from_i64(0),
                };
                for summand in summands {
                    let summand = summand?;
                    acc = &acc + &summand;
                }
                Ok(Z3Term::Int(acc))
            }
            SmtTerm::Mul(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_int()?;
                let r = self.translate_term(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l * &r))
            }
            SmtTerm::Eq(lhs, rhs) => {
                let l = self.translate_term(lhs)?;
                let r = self.translate_term(rhs)?;
                match (l, r) {
                    (Z3Term::Int(li), Z3Term::Int(ri)) => Ok(Z3Term::Bool(li.eq(&ri))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    _ => Err(Z3Error::Internal("Sort mismatch in Eq".into())),
                }
            }
            SmtTerm::Ge(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_int()?;
                let r = self.translate_term(rhs)?.into_int()?;
                Ok(Z3Term::Bool(l.ge(&r)))
            }
            SmtTerm::And(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            SmtTerm::Implies(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bool()?;
                let r = self.translate_term(rhs)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
        }
    }

    fn translate_bools(&self, terms: &[SmtTerm]) -> Result<Vec<z3::ast::Bool>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(Z3Term::into_bool))
            .collect()
    }
}

enum Z3Term {
    Int(z3::ast::Int),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            Z3Term::Bool(_) => Err(Z3Error::Internal("Expected Int, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) => Err(Z3Error::Internal("Expected Bool, got Int".into())),
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

fn sat_result(result: Z3SatResult) -> SatResult {
    match result {
        Z3SatResult::Sat => SatResult::Sat,
        Z3SatResult::Unsat => SatResult::Unsat,
        Z3SatResult::Unknown => SatResult::Unknown("Z3 returned unknown".into()),
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        match sort {
            SmtSort::Int => {
                let v = z3::ast::Int::new_const(name);
                self.int_vars.insert(name.to_string(), v);
            }
            SmtSort::Bool => {
                let v = z3::ast::Bool::new_const(name);
                self.bool_vars.insert(name.to_string(), v);
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        Ok(sat_result(self.solver.check()))
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        let result = sat_result(self.solver.check());
        if result != SatResult::Sat {
            return Ok((result, None));
        }

        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
        let mut values = HashMap::new();

        for &(name, sort) in var_names {
            match sort {
                SmtSort::Int => {
                    let v = self
                        .int_vars
                        .get(name)
                        .ok_or_else(|| Z3Error::UnknownVariable(name.to_string()))?;
                    if let Some(n) = z3_model
                        .eval::<z3::ast::Int>(v, true)
                        .and_then(|val| val.as_i64())
                    {
                        values.insert(name.to_string(), ModelValue::Int(n));
                    }
                }
                SmtSort::Bool => {
                    let v = self
                        .bool_vars
                        .get(name)
                        .ok_or_else(|| Z3Error::UnknownVariable(name.to_string()))?;
                    if let Some(b) = z3_model
                        .eval::<z3::ast::Bool>(v, true)
                        .and_then(|val| val.as_bool())
                    {
                        values.insert(name.to_string(), ModelValue::Bool(b));
                    }
                }
            }
        }

        Ok((SatResult::Sat, Some(Model { values })))
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.int_vars.clear();
        self.bool_vars.clear();
        Ok(())
    }
}
