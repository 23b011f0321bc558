use std::collections::BTreeSet;
use std::fmt;

use ppspeed_ir::{HeadPair, Protocol, StateId, Transition};

use crate::formula::Formula;

/// Index of a stage in its [`StageTree`](crate::stage_tree::StageTree).
pub type StageId = usize;

static NO_HEADS: BTreeSet<HeadPair> = BTreeSet::new();
static NO_TRANSITIONS: BTreeSet<Transition> = BTreeSet::new();

/// A refined subset of reachable configurations.
///
/// Stages are read-only outside the engine. The refinement `(K_C, T_C)` is
/// recorded at most once, when the stage is expanded.
#[derive(Debug, Clone)]
pub struct Stage {
    /// States known to be present (`E`).
    pub(crate) present: BTreeSet<StateId>,
    /// States known to be present exactly once (`E!`).
    pub(crate) present_unique: BTreeSet<StateId>,
    /// States known to be absent (`D`).
    pub(crate) absent: BTreeSet<StateId>,
    /// Heads known to be disabled.
    pub(crate) disabled: BTreeSet<HeadPair>,
    pub(crate) formula: Formula,
    pub(crate) parent: Option<StageId>,
    pub(crate) depth: usize,
    refinement: Option<(BTreeSet<HeadPair>, BTreeSet<Transition>)>,
}

/// Canonical identity of a stage's configuration space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageKey {
    pub present: BTreeSet<StateId>,
    pub present_unique: BTreeSet<StateId>,
    pub absent: BTreeSet<StateId>,
    pub disabled: BTreeSet<HeadPair>,
}

impl Stage {
    pub fn new(
        present: BTreeSet<StateId>,
        present_unique: BTreeSet<StateId>,
        absent: BTreeSet<StateId>,
        disabled: BTreeSet<HeadPair>,
        formula: Formula,
    ) -> Self {
        Self {
            present,
            present_unique,
            absent,
            disabled,
            formula,
            parent: None,
            depth: 0,
            refinement: None,
        }
    }

    /// The root stage: some initial state is present, nothing else is known.
    pub fn root(protocol: &Protocol) -> Self {
        let mut phi = Formula::new();
        phi.assert_some_states_present(protocol.initial_states(), false);
        Self::new(
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
            phi,
        )
    }

    pub(crate) fn child_of(mut self, parent: &Stage) -> Self {
        self.depth = parent.depth + 1;
        self
    }

    pub fn present(&self) -> &BTreeSet<StateId> {
        &self.present
    }

    pub fn present_unique(&self) -> &BTreeSet<StateId> {
        &self.present_unique
    }

    pub fn absent(&self) -> &BTreeSet<StateId> {
        &self.absent
    }

    pub fn disabled(&self) -> &BTreeSet<HeadPair> {
        &self.disabled
    }

    /// The formula the stage was created with (`φ`).
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn parent(&self) -> Option<StageId> {
        self.parent
    }

    /// Distance from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn key(&self) -> StageKey {
        StageKey {
            present: self.present.clone(),
            present_unique: self.present_unique.clone(),
            absent: self.absent.clone(),
            disabled: self.disabled.clone(),
        }
    }

    /// Heads disabled by this stage's refinement (`K_C`).
    pub fn k(&self) -> &BTreeSet<HeadPair> {
        self.refinement.as_ref().map_or(&NO_HEADS, |(k, _)| k)
    }

    /// Transitions used to disable `K_C` (`T_C`).
    pub fn t(&self) -> &BTreeSet<Transition> {
        self.refinement.as_ref().map_or(&NO_TRANSITIONS, |(_, t)| t)
    }

    /// Store `(K_C, T_C)`. The first recorded pair is kept.
    pub(crate) fn record_refinement(&mut self, k: BTreeSet<HeadPair>, t: BTreeSet<Transition>) {
        if self.refinement.is_none() {
            self.refinement = Some((k, t));
        }
    }

    pub fn has_refinement(&self) -> bool {
        self.refinement.is_some()
    }

    /// Multi-line description using state names.
    pub fn describe(&self, protocol: &Protocol) -> String {
        let mut out = format!(
            "E = {}\nE! = {}\nD = {}\nT = {}",
            protocol.states_label(&self.present),
            protocol.states_label(&self.present_unique),
            protocol.states_label(&self.absent),
            protocol.pairs_label(&self.disabled),
        );
        if self.has_refinement() {
            let transitions: Vec<String> =
                self.t().iter().map(|t| protocol.transition_label(t)).collect();
            out.push_str(&format!(
                "\nK_C = {}\nT_C = {{{}}}",
                protocol.pairs_label(self.k()),
                transitions.join(", ")
            ));
        }
        out
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "E = {:?}, E! = {:?}, D = {:?}, T = {:?}",
            self.present, self.present_unique, self.absent, self.disabled
        )
    }
}

/// The canonical formula `Φ_C` of a stage.
///
/// Depends only on the four sets of [`StageKey`].
pub fn stage_formula(stage: &Stage) -> Formula {
    let mut phi = Formula::new();
    phi.assert_all_states_present(&stage.present, false);
    phi.assert_all_states_present(&stage.present_unique, true);
    phi.assert_all_states_absent(&stage.absent, false);
    phi.assert_all_pairs_absent(&stage.disabled);
    phi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Z3Oracle;

    fn stage(present: &[StateId], absent: &[StateId], disabled: &[HeadPair]) -> Stage {
        Stage::new(
            present.iter().copied().collect(),
            BTreeSet::new(),
            absent.iter().copied().collect(),
            disabled.iter().copied().collect(),
            Formula::new(),
        )
    }

    #[test]
    fn equal_keys_give_equivalent_formulas() {
        let oracle = Z3Oracle::new();
        let a = stage(&[0, 1], &[2], &[HeadPair::new(1, 3)]);
        let mut b = stage(&[1, 0], &[2], &[HeadPair::new(3, 1)]);
        b.formula.assert_all_states_absent([0usize], false);

        assert_eq!(a.key(), b.key());
        let (phi, psi) = (stage_formula(&a), stage_formula(&b));
        assert!(phi.implies(&psi, &oracle).expect("decided"));
        assert!(psi.implies(&phi, &oracle).expect("decided"));
    }

    #[test]
    fn stage_formula_disables_heads_on_absent_states() {
        let oracle = Z3Oracle::new();
        let phi = stage_formula(&stage(&[0], &[1], &[]));
        assert!(phi.implies_all_absent(&oracle, [HeadPair::new(1, 2)]).expect("decided"));
        assert!(!phi.implies_all_absent(&oracle, [HeadPair::new(0, 2)]).expect("decided"));
    }

    #[test]
    fn describe_lists_refinement_once_recorded() {
        let mut p = Protocol::new();
        p.add_state("A").expect("A");
        p.add_state("B").expect("B");
        let t = p.add_transition(("A", "B"), ("B", "B")).expect("t");

        let mut s = stage(&[0], &[], &[]);
        assert_eq!(s.describe(&p), "E = {A}\nE! = {}\nD = {}\nT = {}");
        s.record_refinement(BTreeSet::from([t.pre]), BTreeSet::from([t]));
        assert!(s.describe(&p).ends_with("K_C = {⟅A, B⟆}\nT_C = {⟅A, B⟆ → ⟅B, B⟆}"));
    }

    #[test]
    fn refinement_is_recorded_once() {
        let mut s = stage(&[0], &[], &[]);
        assert!(!s.has_refinement());
        assert!(s.k().is_empty() && s.t().is_empty());

        let first = HeadPair::new(0, 1);
        s.record_refinement(BTreeSet::from([first]), BTreeSet::new());
        s.record_refinement(BTreeSet::from([HeadPair::new(2, 2)]), BTreeSet::new());
        assert!(s.has_refinement());
        assert_eq!(s.k(), &BTreeSet::from([first]));
    }
}
