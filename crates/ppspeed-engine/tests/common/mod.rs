#![allow(dead_code)]

use ppspeed_engine::context::Context;
use ppspeed_engine::oracle::Z3Oracle;
use ppspeed_engine::stage_tree::{AnalysisOptions, StageTree};
use ppspeed_ir::Protocol;

/// Build a protocol from state names, transitions and output sets; every
/// listed initial state is its own input symbol.
pub fn protocol(
    states: &[&str],
    transitions: &[((&str, &str), (&str, &str))],
    initial: &[&str],
    true_states: &[&str],
    false_states: &[&str],
) -> Protocol {
    let mut p = Protocol::new();
    for q in states {
        p.add_state(*q).unwrap_or_else(|e| panic!("state {q}: {e}"));
    }
    for (pre, post) in transitions {
        p.add_transition(*pre, *post)
            .unwrap_or_else(|e| panic!("transition {pre:?} -> {post:?}: {e}"));
    }
    for q in initial {
        p.add_input(*q, q).unwrap_or_else(|e| panic!("input {q}: {e}"));
    }
    for q in true_states {
        p.set_output(q, true).unwrap_or_else(|e| panic!("output {q}: {e}"));
    }
    for q in false_states {
        p.set_output(q, false).unwrap_or_else(|e| panic!("output {q}: {e}"));
    }
    p
}

/// `{Yes, No}` without transitions.
pub fn yes_no() -> Protocol {
    protocol(&["Yes", "No"], &[], &["Yes"], &["Yes"], &["No"])
}

/// A single always-true state.
pub fn always_true() -> Protocol {
    protocol(&["A"], &[], &["A"], &["A"], &[])
}

/// `(A, B) -> (B, B)` with B true and A false.
pub fn one_way() -> Protocol {
    protocol(&["A", "B"], &[(("A", "B"), ("B", "B"))], &["A", "B"], &["B"], &["A"])
}

pub fn build(protocol: &Protocol, options: &AnalysisOptions) -> StageTree {
    let oracle = Z3Oracle::with_timeout_secs(options.solver_timeout_secs);
    StageTree::build(Context::new(protocol, &oracle), options)
        .unwrap_or_else(|e| panic!("stage tree construction failed: {e}"))
}

pub fn graph_options() -> AnalysisOptions {
    AnalysisOptions {
        use_t_invariants: false,
        ..AnalysisOptions::default()
    }
}

/// The crossing head `(A, B)` is re-created by `(B, C) -> (A, B)`, whose
/// head lies in the cycle between A and C; refining K leaves nothing.
pub fn rederiving_cycle() -> Protocol {
    protocol(
        &["A", "B", "C", "D"],
        &[
            (("A", "B"), ("B", "B")),
            (("B", "C"), ("A", "B")),
            (("A", "D"), ("C", "D")),
        ],
        &["A", "B"],
        &["B"],
        &["A"],
    )
}

/// Two true states absorbing a false one, with the head `(B, C)` marked
/// problematic. Once `(A, B)` and `(A, C)` are gone, `(B, C)` can only
/// occur without A.
pub fn problematic_true_pair() -> Protocol {
    let mut p = protocol(
        &["A", "B", "C"],
        &[
            (("A", "B"), ("B", "B")),
            (("A", "C"), ("C", "C")),
            (("B", "C"), ("B", "B")),
        ],
        &["A", "B", "C"],
        &["B", "C"],
        &["A"],
    );
    p.add_problematic_head("B", "C").unwrap_or_else(|e| panic!("head: {e}"));
    p
}

/// D only leaves through `(B, D)`, which is disabled whenever B is gone,
/// even while A still interacts with itself.
pub fn stranded_drain() -> Protocol {
    protocol(
        &["A", "B", "D"],
        &[
            (("A", "A"), ("B", "B")),
            (("B", "D"), ("B", "B")),
            (("A", "B"), ("B", "B")),
        ],
        &["A", "D"],
        &["B"],
        &["A", "D"],
    )
}
