//! Computing the children of a stage.
//!
//! A stage is refined by finding a set `K` of heads that must eventually be
//! disabled, shrinking it to a self-sustaining core, and branching over the
//! heads that may still occur once `K` is gone.

use std::collections::{BTreeSet, HashMap};

use ppspeed_ir::{HeadPair, StateId, Transition};
use ppspeed_smt::sorts::SmtSort;
use ppspeed_smt::terms::{Declaration, SmtTerm};
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::EngineResult;
use crate::formula::Formula;
use crate::graph::TransformationGraph;
use crate::oracle::Satisfiability;
use crate::stage::{stage_formula, Stage, StageKey};
use crate::variable::Valuation;

pub type HeadSet = BTreeSet<HeadPair>;
pub type TransitionSet = BTreeSet<Transition>;

/// Memoized `(K, T)` pairs of the transformation-graph method, keyed by
/// stage. Entries are written once and never replaced.
#[derive(Debug, Default)]
pub struct KCache {
    entries: HashMap<StageKey, (HeadSet, TransitionSet)>,
}

impl KCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &StageKey) -> Option<&(HeadSet, TransitionSet)> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: StageKey, value: (HeadSet, TransitionSet)) -> (HeadSet, TransitionSet) {
        self.entries.entry(key).or_insert(value).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Heads of transitions crossing components of the transformation graph,
/// and those transitions.
pub fn compute_k(
    ctx: Context<'_>,
    stage: &Stage,
    cache: &mut KCache,
) -> EngineResult<(HeadSet, TransitionSet)> {
    let key = stage.key();
    if let Some(hit) = cache.get(&key) {
        return Ok(hit.clone());
    }
    let graph = TransformationGraph::build(ctx, stage)?;
    let t: TransitionSet = graph.crossing_transitions().copied().collect();
    let k = t.iter().map(|t| t.pre).collect();
    Ok(cache.insert(key, (k, t)))
}

/// One removal round: every head that some transition can still re-derive
/// while all of `x` is disabled. All heads are judged against the same `x`.
fn refine_round(ctx: Context<'_>, stage: &Stage, x: &HeadSet) -> EngineResult<HeadSet> {
    let mut kept = HeadSet::new();
    for ef in x {
        let mut rederived = false;
        for t in &ctx.protocol.transitions {
            let mut phi = stage_formula(stage);
            phi.assert_all_pairs_absent(x);

            if t.post == *ef {
                rederived = !phi.implies_all_absent(ctx.oracle, [t.pre])?;
            } else if let &[e] = t.post.shared_states(ef).as_slice() {
                let f = ef.other(e);
                if e != f {
                    phi.assert_all_states_absent([e], false);
                    phi.assert_all_states_present([f], false);
                    rederived = !phi.implies_all_absent(ctx.oracle, [t.pre])?;
                } else {
                    phi.assert_all_states_present([e], true);
                    rederived =
                        !(t.pre.contains(e) || phi.implies_all_absent(ctx.oracle, [t.pre])?);
                }
            }
            if rederived {
                break;
            }
        }
        if !rederived {
            kept.insert(*ef);
        }
    }
    Ok(kept)
}

/// Greatest subset of `k` that stays disabled once all of it is disabled.
///
/// Not memoized: the graph and T-invariant methods may refine different
/// candidate sets for the same stage.
pub fn refine_k(ctx: Context<'_>, stage: &Stage, k: &HeadSet) -> EngineResult<HeadSet> {
    let mut current = k.clone();
    loop {
        let next = refine_round(ctx, stage, &current)?;
        if next == current {
            return Ok(current);
        }
        current = next;
    }
}

/// Post-heads of live transitions the children must branch over.
pub fn compute_u(
    ctx: Context<'_>,
    disabled: &HeadSet,
    k_: &HeadSet,
    refined: bool,
) -> HeadSet {
    // Every head pairing `a` with a partner is in K_ also when `b` replaces `a`.
    let less = |a: StateId, b: StateId| {
        k_.iter()
            .filter(|head| head.contains(a))
            .all(|head| k_.contains(&HeadPair::new(b, head.other(a))))
    };
    let less_pair = |x: &HeadPair, y: &HeadPair| {
        let (a, b) = x.elements();
        let (c, d) = y.elements();
        (less(a, c) && less(b, d)) || (less(a, d) && less(b, c))
    };

    ctx.protocol
        .transitions
        .iter()
        .filter(|t| !disabled.contains(&t.pre) && !k_.contains(&t.post))
        .filter(|t| !refined || !less_pair(&t.pre, &t.post))
        .map(|t| t.post)
        .collect()
}

/// The three state sets of a child stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    pub present: BTreeSet<StateId>,
    pub present_unique: BTreeSet<StateId>,
    pub absent: BTreeSet<StateId>,
}

/// Shrink the sets read off `valuation` to their greatest fixed point: a
/// state stays only if every head that could invalidate it is forced absent
/// once `k_` is disabled.
pub fn enlarge_stage_components(
    ctx: Context<'_>,
    stage: &Stage,
    valuation: &Valuation,
    k_: &HeadSet,
) -> EngineResult<Components> {
    let transitions = &ctx.protocol.transitions;
    let mut current = Components {
        present: valuation.plain_present_states(),
        present_unique: valuation.unique_states(),
        absent: valuation.absent_states(),
    };

    loop {
        let mut phi = stage_formula(stage);
        phi.assert_all_pairs_absent(k_);
        phi.assert_all_states_present(&current.present, false);
        phi.assert_all_states_present(&current.present_unique, true);
        phi.assert_all_states_absent(&current.absent, false);

        let stays = |heads: HeadSet| phi.implies_all_absent(ctx.oracle, &heads);
        let mut next = Components {
            present: BTreeSet::new(),
            present_unique: BTreeSet::new(),
            absent: BTreeSet::new(),
        };

        for &x in &current.present {
            // XY -> CD with C != X != D
            let heads = transitions
                .iter()
                .filter(|t| t.pre.contains(x) && !t.post.contains(x))
                .map(|t| t.pre)
                .collect();
            if stays(heads)? {
                next.present.insert(x);
            }
        }

        for &x in &current.present_unique {
            let heads = transitions
                .iter()
                .filter(|t| {
                    // XY -> CD with X != Y and either C = D = X or C != X != D
                    let splits = t.pre.other(x) != x
                        && (t.postset() == BTreeSet::from([x]) || !t.post.contains(x));
                    // CD -> XY with C != X != D
                    let enters = t.post.contains(x) && !t.pre.contains(x);
                    splits || enters
                })
                .map(|t| t.pre)
                .collect();
            if stays(heads)? {
                next.present_unique.insert(x);
            }
        }

        for &x in &current.absent {
            // CD -> XY with C != X != D
            let heads = transitions
                .iter()
                .filter(|t| t.post.contains(x) && !t.pre.contains(x))
                .map(|t| t.pre)
                .collect();
            if stays(heads)? {
                next.absent.insert(x);
            }
        }

        if next == current {
            return Ok(current);
        }
        current = next;
    }
}

/// `(K, T)` from T-invariants: a live transition belongs to `T` when no
/// non-negative flow through it balances every state.
pub fn compute_k_from_invariants(
    ctx: Context<'_>,
    stage: &Stage,
) -> EngineResult<(HeadSet, TransitionSet)> {
    let phi = stage_formula(stage);
    let mut live = Vec::new();
    for t in &ctx.protocol.transitions {
        if !t.is_silent() && !phi.implies_all_absent(ctx.oracle, [t.pre])? {
            live.push(*t);
        }
    }

    let var = |i: usize| SmtTerm::var(format!("t{i}"));
    let decls: Vec<Declaration> = (0..live.len()).map(|i| (format!("t{i}"), SmtSort::Int)).collect();
    let mut system: Vec<SmtTerm> = (0..live.len()).map(|i| var(i).ge(SmtTerm::int(0))).collect();
    for q in ctx.protocol.state_ids() {
        let flow = live
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.unchanged(q))
            .map(|(i, t)| match t.delta(q) {
                1 => var(i),
                d => SmtTerm::int(d).mul(var(i)),
            })
            .collect();
        system.push(SmtTerm::sum(flow).eq(SmtTerm::int(0)));
    }

    let mut t_set = TransitionSet::new();
    for (i, t) in live.iter().enumerate() {
        system.push(var(i).ge(SmtTerm::int(1)));
        let answer = ctx.oracle.check(&decls, &system)?;
        system.pop();
        if answer == Satisfiability::Unsat {
            t_set.insert(*t);
        }
    }
    let k_set = t_set.iter().map(|t| t.pre).collect();
    Ok((k_set, t_set))
}

/// How `K` is found for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KMethod {
    /// Components of the transformation graph.
    Graph,
    /// Transitions outside every T-invariant.
    #[default]
    TInvariants,
}

/// Result of expanding one stage.
#[derive(Debug)]
pub struct Expansion {
    /// `None` when no head could be found to disable.
    pub children: Option<Vec<Stage>>,
    /// `false` when `K` was empty or its refinement collapsed.
    pub refined: bool,
}

/// Children of `stage`; records `(K_, T_)` on the stage.
pub fn new_stages(
    ctx: Context<'_>,
    stage: &mut Stage,
    cache: &mut KCache,
    method: KMethod,
) -> EngineResult<Expansion> {
    let protocol = ctx.protocol;
    if protocol.false_states().is_subset(&stage.absent)
        || protocol.true_states().is_subset(&stage.absent)
    {
        return Ok(Expansion {
            children: Some(Vec::new()),
            refined: true,
        });
    }

    let (k, t) = match method {
        KMethod::TInvariants => compute_k_from_invariants(ctx, stage)?,
        KMethod::Graph => compute_k(ctx, stage, cache)?,
    };
    if k.is_empty() {
        return Ok(Expansion {
            children: None,
            refined: false,
        });
    }

    let mut k_ = refine_k(ctx, stage, &k)?;
    let mut t_: TransitionSet = t.iter().filter(|t| k_.contains(&t.pre)).copied().collect();
    let mut refined = true;
    if k_.is_empty() {
        warn!(heads = k.len(), "refinement collapsed, falling back to unrefined K");
        k_ = k;
        t_ = t;
        refined = false;
    }
    debug!(k = k_.len(), t = t_.len(), refined, "stage refinement");
    stage.record_refinement(k_.clone(), t_);

    let u = compute_u(ctx, &stage.disabled, &k_, refined);

    let mut phi_ = Formula::new();
    phi_.assert_formula(&stage.formula);
    phi_.assert_some_pair_present(&u);
    phi_.make_disjunctive();

    let mut phi = stage_formula(stage);
    phi.assert_all_pairs_absent(&k_);
    phi.assert_formula(&phi_);

    let disabled: HeadSet = stage.disabled.union(&k_).copied().collect();
    let mut children = Vec::new();
    for valuation in phi.solutions(ctx.oracle)? {
        let c = enlarge_stage_components(ctx, stage, &valuation, &k_)?;
        children.push(
            Stage::new(c.present, c.present_unique, c.absent, disabled.clone(), phi_.clone())
                .child_of(stage),
        );
    }
    debug!(children = children.len(), "stage expanded");

    Ok(Expansion {
        children: Some(children),
        refined,
    })
}
