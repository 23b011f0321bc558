//! The transformation graph of a stage.
//!
//! Vertices are protocol states. An edge `p -> q` records that some
//! transition still possible in the stage can move an agent from `p` to `q`.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use ppspeed_ir::{StateId, Transition};
use tracing::trace;

use crate::context::Context;
use crate::error::EngineResult;
use crate::stage::{stage_formula, Stage};

/// Transformation graph with its strongly connected components.
#[derive(Debug, Clone)]
pub struct TransformationGraph {
    graph: DiGraph<StateId, ()>,
    edges: BTreeMap<(StateId, StateId), BTreeSet<Transition>>,
    component: Vec<usize>,
    bottom: Vec<bool>,
}

impl TransformationGraph {
    /// Build the graph for `stage`, skipping silent transitions and those
    /// whose head the stage formula proves absent.
    pub fn build(ctx: Context<'_>, stage: &Stage) -> EngineResult<Self> {
        let mut graph = DiGraph::new();
        for q in ctx.protocol.state_ids() {
            graph.add_node(q);
        }
        let mut edges: BTreeMap<(StateId, StateId), BTreeSet<Transition>> = BTreeMap::new();
        let mut add_edge = |p: StateId, q: StateId, t: Transition| {
            graph.add_edge(NodeIndex::new(p), NodeIndex::new(q), ());
            edges.entry((p, q)).or_default().insert(t);
        };

        let phi = stage_formula(stage);
        for t in &ctx.protocol.transitions {
            if t.is_silent() || phi.implies_all_absent(ctx.oracle, [t.pre])? {
                continue;
            }
            match t.pre.shared_states(&t.post).first() {
                None => {
                    let (a, b) = t.pre.elements();
                    let (c, d) = t.post.elements();
                    add_edge(a, c, *t);
                    add_edge(a, d, *t);
                    add_edge(b, c, *t);
                    add_edge(b, d, *t);
                }
                // The carrier keeps its state; only the partner moves.
                Some(&carrier) => add_edge(t.pre.other(carrier), t.post.other(carrier), *t),
            }
        }

        let sccs = tarjan_scc(&graph);
        let mut component = vec![0; graph.node_count()];
        for (c, scc) in sccs.iter().enumerate() {
            for node in scc {
                component[node.index()] = c;
            }
        }
        let mut bottom = vec![true; sccs.len()];
        for (p, q) in edges.keys() {
            if component[*p] != component[*q] {
                bottom[component[*p]] = false;
            }
        }
        trace!(edges = edges.len(), components = sccs.len(), "transformation graph");

        Ok(Self {
            graph,
            edges,
            component,
            bottom,
        })
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Witnessing transitions per edge.
    pub fn edges(&self) -> &BTreeMap<(StateId, StateId), BTreeSet<Transition>> {
        &self.edges
    }

    pub fn edge_transitions(&self, p: StateId, q: StateId) -> Option<&BTreeSet<Transition>> {
        self.edges.get(&(p, q))
    }

    /// Component label of state `q`.
    pub fn component(&self, q: StateId) -> usize {
        self.component[q]
    }

    /// `q` lies in a component without edges to other components.
    pub fn is_bottom(&self, q: StateId) -> bool {
        self.bottom[self.component[q]]
    }

    /// Some edge leads from component `i` to component `j`.
    ///
    /// Holds for `i == j` as soon as the component has an internal edge.
    pub fn precedes(&self, i: usize, j: usize) -> bool {
        self.edges
            .keys()
            .any(|(p, q)| self.component[*p] == i && self.component[*q] == j)
    }

    /// Transitions witnessing an edge between two different components.
    pub fn crossing_transitions(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.edges
            .iter()
            .filter(|((p, q), _)| self.component[*p] != self.component[*q])
            .flat_map(|(_, ts)| ts.iter())
    }

    /// States outside bottom components.
    pub fn non_bottom_states(&self) -> BTreeSet<StateId> {
        (0..self.state_count()).filter(|q| !self.is_bottom(*q)).collect()
    }
}
