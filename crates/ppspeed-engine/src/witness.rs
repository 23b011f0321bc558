//! Termination witnesses and the speed classification of a stage.

use ppspeed_ir::{HeadPair, StateId};
use tracing::debug;

use crate::context::Context;
use crate::error::EngineResult;
use crate::graph::TransformationGraph;
use crate::refinement::{compute_k, refine_k, HeadSet, KCache, KMethod, TransitionSet};
use crate::stage::{stage_formula, Stage};

/// Classify the disablement decisions of `stage` against the concrete
/// protocol.
///
/// Returns `Some(true)` for a strong witness, `Some(false)` for a weak one
/// and `None` when neither can be established.
pub fn check_termination_witness(
    ctx: Context<'_>,
    stage: &Stage,
    refined: bool,
) -> EngineResult<Option<bool>> {
    let protocol = ctx.protocol;
    let (k_c, t_c): (HeadSet, TransitionSet) = if refined {
        (stage.k().clone(), stage.t().clone())
    } else {
        let t_c: TransitionSet = protocol
            .transitions
            .iter()
            .filter(|t| !stage.disabled.contains(&t.pre))
            .copied()
            .collect();
        (t_c.iter().map(|t| t.pre).collect(), t_c)
    };

    // Heads that may lack a concrete witness, or that some transition
    // outside T_C could still fire.
    let p_c: HeadSet = k_c
        .iter()
        .filter(|head| {
            protocol.problematic_heads.contains(*head)
                || protocol
                    .transitions
                    .iter()
                    .any(|t| t.pre == **head && !t_c.contains(t))
        })
        .copied()
        .collect();

    if p_c.is_empty() {
        return Ok(Some(true));
    }

    let mut phi = stage_formula(stage);
    phi.assert_all_pairs_absent(k_c.difference(&p_c));
    phi.assert_some_pair_present(&p_c);
    let weak = phi.implies_all_states_absent(ctx.oracle, protocol.false_states())?
        || phi.implies_all_states_absent(ctx.oracle, protocol.true_states())?;
    debug!(problematic = p_c.len(), weak, "termination witness");
    Ok(if weak { Some(false) } else { None })
}

/// Whether `stage` is compatible with the `n² log n` bound.
///
/// For every state `A` outside a bottom component, the stage must force
/// some head of `K_A` present, where `K_A` are the heads containing `A`
/// whose transitions all move `A` into another component.
pub fn is_good(
    ctx: Context<'_>,
    stage: &Stage,
    cache: &mut KCache,
    method: KMethod,
) -> EngineResult<bool> {
    let graph = TransformationGraph::build(ctx, stage)?;

    let (k_c, t_c) = match method {
        KMethod::TInvariants => {
            // Compare against the graph-based refinement.
            let (k, t) = compute_k(ctx, stage, cache)?;
            let k_c = refine_k(ctx, stage, &k)?;
            if &k_c != stage.k() {
                return Ok(false);
            }
            let t_c: TransitionSet = t.into_iter().filter(|t| k_c.contains(&t.pre)).collect();
            (k_c, t_c)
        }
        KMethod::Graph => (stage.k().clone(), stage.t().clone()),
    };

    let a_c = graph.non_bottom_states();

    let generates_edge = |head: &HeadPair, a: StateId| {
        let i = graph.component(a);
        t_c.iter().filter(|t| t.pre == *head).all(|t| {
            let c = t.post.some();
            let d = t.post.other(c);
            let leaves_to = |x: StateId| {
                graph.edge_transitions(a, x).is_some_and(|ts| ts.contains(t))
                    && graph.precedes(i, graph.component(x))
            };
            leaves_to(c) || leaves_to(d)
        })
    };

    for &a in &a_c {
        let k_a: HeadSet = k_c
            .iter()
            .filter(|head| head.contains(a) && generates_edge(head, a))
            .copied()
            .collect();
        let u_a: Vec<StateId> = a_c
            .iter()
            .copied()
            .filter(|b| graph.precedes(graph.component(*b), graph.component(a)))
            .collect();

        let mut phi = stage_formula(stage);
        phi.assert_some_states_present([a], false);
        phi.assert_all_states_absent(&u_a, false);
        phi.assert_some_pair_present(&k_c);
        if !phi.implies_some_present(ctx.oracle, &k_a)? {
            debug!(state = a, "stage is not good");
            return Ok(false);
        }
    }
    Ok(true)
}
