//! Algebraic properties of formulas, valuations and refinement.

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use ppspeed_engine::context::Context;
use ppspeed_engine::formula::Formula;
use ppspeed_engine::oracle::Z3Oracle;
use ppspeed_engine::refinement::{compute_k, refine_k, KCache};
use ppspeed_engine::stage::{stage_formula, Stage};
use ppspeed_engine::variable::Var;
use ppspeed_ir::proptest_generators::arb_protocol;
use ppspeed_ir::{HeadPair, StateId};

fn stage_with(
    present: &[StateId],
    unique: &[StateId],
    absent: &[StateId],
    disabled: &[(StateId, StateId)],
    formula: Formula,
) -> Stage {
    Stage::new(
        present.iter().copied().collect(),
        unique.iter().copied().collect(),
        absent.iter().copied().collect(),
        disabled.iter().map(|p| HeadPair::from(*p)).collect(),
        formula,
    )
}

fn stage(
    present: &[StateId],
    unique: &[StateId],
    absent: &[StateId],
    disabled: &[(StateId, StateId)],
) -> Stage {
    stage_with(present, unique, absent, disabled, Formula::new())
}

#[test]
fn all_present_and_some_absent_are_complements() {
    let oracle = Z3Oracle::new();
    for states in [vec![0usize], vec![0, 1], vec![0, 1, 2]] {
        for unique in [false, true] {
            let mut all = Formula::new();
            all.assert_all_states_present(&states, unique);
            let mut some = Formula::new();
            some.assert_some_states_absent(&states, unique);

            let mut both = all.clone();
            both.assert_formula(&some);
            assert!(both.solutions(&oracle).expect("decided").is_empty());

            let total = all.solutions(&oracle).expect("decided").len()
                + some.solutions(&oracle).expect("decided").len();
            assert_eq!(total, 1 << states.len());
        }
    }
}

#[test]
fn some_present_and_all_absent_are_complements() {
    let oracle = Z3Oracle::new();
    let states = [0usize, 1];
    let mut some = Formula::new();
    some.assert_some_states_present(states, false);
    let mut none = Formula::new();
    none.assert_all_states_absent(states, false);

    let mut both = some.clone();
    both.assert_formula(&none);
    assert!(both.solutions(&oracle).expect("decided").is_empty());
    assert!(none.implies_all_states_absent(&oracle, states).expect("decided"));
    assert!(!some.implies_all_states_absent(&oracle, states).expect("decided"));
}

#[test]
fn pair_dual_forms_are_complements() {
    let oracle = Z3Oracle::new();
    let pairs = [HeadPair::new(0, 1), HeadPair::new(1, 1)];
    let assert_form = |phi: &mut Formula, form: usize| match form {
        0 => phi.assert_all_pairs_absent(pairs),
        1 => phi.assert_some_pair_present(pairs),
        2 => phi.assert_some_pair_absent(pairs),
        _ => phi.assert_all_pairs_present(pairs),
    };
    for (a, b) in [(0, 1), (2, 3)] {
        let mut phi = Formula::new();
        assert_form(&mut phi, a);
        assert_form(&mut phi, b);
        assert!(phi.solutions(&oracle).expect("decided").is_empty());
    }
}

#[test]
fn solutions_respect_valuation_propagation() {
    let oracle = Z3Oracle::new();
    let mut phi = Formula::new();
    phi.assert_some_pair_present([HeadPair::new(0, 0), HeadPair::new(1, 2)]);
    phi.assert_some_states_absent([0usize, 1, 2], true);
    let solutions = phi.solutions(&oracle).expect("decided");
    assert!(!solutions.is_empty());
    for valuation in &solutions {
        for q in 0..3 {
            if valuation.get(Var::unique(q)) == Some(true) {
                assert_eq!(valuation.get(Var::plain(q)), Some(true));
            }
            if valuation.get(Var::plain(q)) == Some(false) {
                assert_ne!(valuation.get(Var::unique(q)), Some(true));
            }
        }
    }
}

#[test]
fn stage_formula_depends_only_on_the_key() {
    let oracle = Z3Oracle::new();
    let a = stage(&[0], &[1], &[2], &[(0, 3), (3, 3)]);
    let mut extra = Formula::new();
    extra.assert_some_states_present([3usize], false);
    let b = stage_with(&[0], &[1], &[2], &[(3, 3), (3, 0)], extra);
    let (phi, psi) = (stage_formula(&a), stage_formula(&b));
    assert!(phi.implies(&psi, &oracle).expect("decided"));
    assert!(psi.implies(&phi, &oracle).expect("decided"));

    let c = stage(&[0], &[], &[2], &[(0, 3), (3, 3)]);
    assert!(!stage_formula(&c).implies(&phi, &oracle).expect("decided"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn refinement_is_a_subset_and_a_fixed_point(p in arb_protocol()) {
        let oracle = Z3Oracle::new();
        let ctx = Context::new(&p, &oracle);
        let root = Stage::root(&p);
        let (k, _) = compute_k(ctx, &root, &mut KCache::new()).expect("decided");
        let refined = refine_k(ctx, &root, &k).expect("decided");
        prop_assert!(refined.is_subset(&k));
        prop_assert_eq!(refine_k(ctx, &root, &refined).expect("decided"), refined);
    }

    #[test]
    fn k_is_cached_per_stage_key(p in arb_protocol()) {
        let oracle = Z3Oracle::new();
        let ctx = Context::new(&p, &oracle);
        let mut cache = KCache::new();
        let root = Stage::root(&p);
        let first = compute_k(ctx, &root, &mut cache).expect("decided");
        let again = compute_k(ctx, &root, &mut cache).expect("decided");
        prop_assert_eq!(first, again);
        prop_assert_eq!(cache.len(), 1);
        let heads: BTreeSet<HeadPair> = p.transitions.iter().map(|t| t.pre).collect();
        prop_assert!(cache.get(&root.key()).expect("cached").0.is_subset(&heads));
    }
}
