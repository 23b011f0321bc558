use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::head_pair::HeadPair;
use crate::transition::Transition;

/// A unique identifier for a protocol state (index into `Protocol::states`).
pub type StateId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Unknown state '{0}'")]
    UnknownState(String),
    #[error("Duplicate state '{0}'")]
    DuplicateState(String),
    #[error("State id {0} is not declared")]
    UndeclaredStateId(StateId),
    #[error("Protocol has no states")]
    EmptyStateSet,
}

/// A finite population protocol.
///
/// This is the output of the (external) predicate-abstraction step: every
/// agent is in one of finitely many states, and a pair of interacting agents
/// changes state according to `transitions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protocol {
    /// Human-readable protocol name.
    pub title: Option<String>,
    /// State names; the position of a name is its `StateId`.
    pub states: IndexSet<String>,
    /// The interaction relation.
    pub transitions: BTreeSet<Transition>,
    /// Input mapping from alphabet symbols to initial states.
    pub input: IndexMap<String, StateId>,
    /// Output of each state; states without an entry have undefined output.
    pub output: BTreeMap<StateId, bool>,
    /// Heads that may lack a concrete witnessing transition.
    pub problematic_heads: BTreeSet<HeadPair>,
}

impl Protocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn add_state(&mut self, name: impl Into<String>) -> Result<StateId, ProtocolError> {
        let name = name.into();
        let (id, inserted) = self.states.insert_full(name.clone());
        if !inserted {
            return Err(ProtocolError::DuplicateState(name));
        }
        Ok(id)
    }

    pub fn state_id(&self, name: &str) -> Result<StateId, ProtocolError> {
        self.states
            .get_index_of(name)
            .ok_or_else(|| ProtocolError::UnknownState(name.to_string()))
    }

    pub fn state_name(&self, id: StateId) -> &str {
        self.states.get_index(id).map(String::as_str).unwrap_or("?")
    }

    pub fn add_transition(
        &mut self,
        pre: (&str, &str),
        post: (&str, &str),
    ) -> Result<Transition, ProtocolError> {
        let t = Transition::new(
            (self.state_id(pre.0)?, self.state_id(pre.1)?),
            (self.state_id(post.0)?, self.state_id(post.1)?),
        );
        self.transitions.insert(t);
        Ok(t)
    }

    /// Map an alphabet symbol to the initial state `state`.
    pub fn add_input(&mut self, symbol: impl Into<String>, state: &str) -> Result<(), ProtocolError> {
        let id = self.state_id(state)?;
        self.input.insert(symbol.into(), id);
        Ok(())
    }

    pub fn set_output(&mut self, state: &str, value: bool) -> Result<(), ProtocolError> {
        let id = self.state_id(state)?;
        self.output.insert(id, value);
        Ok(())
    }

    pub fn add_problematic_head(&mut self, a: &str, b: &str) -> Result<(), ProtocolError> {
        let head = HeadPair::new(self.state_id(a)?, self.state_id(b)?);
        self.problematic_heads.insert(head);
        Ok(())
    }

    /// All state ids.
    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        0..self.states.len()
    }

    pub fn alphabet(&self) -> impl Iterator<Item = &str> {
        self.input.keys().map(String::as_str)
    }

    /// Image of the input mapping.
    pub fn initial_states(&self) -> BTreeSet<StateId> {
        self.input.values().copied().collect()
    }

    pub fn true_states(&self) -> BTreeSet<StateId> {
        self.states_with_output(true)
    }

    pub fn false_states(&self) -> BTreeSet<StateId> {
        self.states_with_output(false)
    }

    fn states_with_output(&self, value: bool) -> BTreeSet<StateId> {
        self.output
            .iter()
            .filter(|(_, out)| **out == value)
            .map(|(q, _)| *q)
            .collect()
    }

    /// Check that every state referenced anywhere is declared.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.states.is_empty() {
            return Err(ProtocolError::EmptyStateSet);
        }
        let n = self.states.len();
        let check = |q: StateId| {
            if q < n {
                Ok(())
            } else {
                Err(ProtocolError::UndeclaredStateId(q))
            }
        };

        for t in &self.transitions {
            t.pre.iter().chain(t.post.iter()).try_for_each(check)?;
        }
        self.input.values().copied().try_for_each(check)?;
        self.output.keys().copied().try_for_each(check)?;
        for head in &self.problematic_heads {
            head.iter().try_for_each(check)?;
        }
        Ok(())
    }

    pub fn pair_label(&self, pair: &HeadPair) -> String {
        let (a, b) = pair.elements();
        format!("⟅{}, {}⟆", self.state_name(a), self.state_name(b))
    }

    pub fn transition_label(&self, t: &Transition) -> String {
        format!("{} → {}", self.pair_label(&t.pre), self.pair_label(&t.post))
    }

    pub fn states_label<'a>(&self, states: impl IntoIterator<Item = &'a StateId>) -> String {
        let names: Vec<&str> = states.into_iter().map(|q| self.state_name(*q)).collect();
        format!("{{{}}}", names.join(", "))
    }

    pub fn pairs_label<'a>(&self, pairs: impl IntoIterator<Item = &'a HeadPair>) -> String {
        let labels: Vec<String> = pairs.into_iter().map(|p| self.pair_label(p)).collect();
        format!("{{{}}}", labels.join(", "))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "{title}")?;
        }
        let names: Vec<&str> = self.states.iter().map(String::as_str).collect();
        writeln!(f, "Q = {{{}}}", names.join(", "))?;
        let transitions: Vec<String> = self
            .transitions
            .iter()
            .map(|t| self.transition_label(t))
            .collect();
        writeln!(f, "T = {{{}}}", transitions.join(", "))?;
        let alphabet: Vec<&str> = self.alphabet().collect();
        writeln!(f, "Σ = {{{}}}", alphabet.join(", "))?;
        let input: Vec<String> = self
            .input
            .iter()
            .map(|(a, q)| format!("{a} ↦ {}", self.state_name(*q)))
            .collect();
        writeln!(f, "I = {{{}}}", input.join(", "))?;
        let output: Vec<String> = self
            .output
            .iter()
            .map(|(q, b)| format!("{} ↦ {}", self.state_name(*q), u8::from(*b)))
            .collect();
        writeln!(f, "O = {{{}}}", output.join(", "))?;
        writeln!(f, "H = {}", self.pairs_label(&self.problematic_heads))
    }
}
