#![doc = include_str!("../README.md")]

//! ppspeed analysis engine.
//!
//! This crate builds the stage tree of a population protocol: presence
//! formulas decided by a satisfiability oracle, transformation graphs,
//! the refinement of disabled heads, termination witnesses and the speed
//! classification derived from them.

pub mod context;
pub mod error;
pub mod formula;
pub mod graph;
pub mod oracle;
pub mod refinement;
pub mod result;
pub mod stage;
pub mod stage_tree;
pub mod variable;
pub mod visualization;
pub mod witness;

use ppspeed_ir::Protocol;

use crate::context::Context;
use crate::error::EngineResult;
use crate::stage_tree::{AnalysisOptions, StageTree};

/// Build the stage tree of `protocol` with the Z3 oracle.
pub fn analyze(protocol: &Protocol, options: &AnalysisOptions) -> EngineResult<StageTree> {
    let oracle = options.oracle();
    StageTree::build(Context::new(protocol, &oracle), options)
}
