#![doc = include_str!("../README.md")]

//! Solver-agnostic terms and satisfiability backends.
//!
//! Stage formulas and T-invariant systems are built as [`terms::SmtTerm`]s
//! and decided through the [`solver::SmtSolver`] trait, with Z3 as the
//! shipped backend.

pub mod backends;
pub mod solver;
pub mod sorts;
pub mod terms;
