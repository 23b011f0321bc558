//! Construction of the stage tree and the verdicts derived from it.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::error::EngineResult;
use crate::oracle::Z3Oracle;
use crate::refinement::{new_stages, KCache, KMethod};
use crate::stage::{Stage, StageId};
use crate::witness::{check_termination_witness, is_good};

/// Options for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Children deeper than this are not added to the tree.
    pub max_depth: Option<usize>,
    pub check_termination_witness: bool,
    /// Find `K` from T-invariants instead of the transformation graph.
    pub use_t_invariants: bool,
    /// Per oracle call; 0 disables the limit.
    pub solver_timeout_secs: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            check_termination_witness: true,
            use_t_invariants: true,
            solver_timeout_secs: 0,
        }
    }
}

impl AnalysisOptions {
    pub fn k_method(&self) -> KMethod {
        if self.use_t_invariants {
            KMethod::TInvariants
        } else {
            KMethod::Graph
        }
    }

    pub fn oracle(&self) -> Z3Oracle {
        Z3Oracle::with_timeout_secs(self.solver_timeout_secs)
    }
}

/// Asymptotic expected termination time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Speed {
    Zero,
    Quadratic,
    QuadraticLog,
    Cubic,
    Polynomial,
    Exponential,
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Speed::Zero => "0",
            Speed::Quadratic => "n²",
            Speed::QuadraticLog => "n²·log(n)",
            Speed::Cubic => "n³",
            Speed::Polynomial => "poly(n)",
            Speed::Exponential => "exp(n)",
        };
        f.write_str(text)
    }
}

/// The stage tree of one protocol.
///
/// Stages live in an arena indexed by [`StageId`]; the root has id 0.
#[derive(Debug)]
pub struct StageTree {
    graph: DiGraph<Stage, ()>,
    root: NodeIndex,
    check_witness: bool,
    terminal: BTreeSet<StageId>,
    true_stages: BTreeSet<StageId>,
    false_stages: BTreeSet<StageId>,
    failed: BTreeSet<StageId>,
    failed_witness: BTreeSet<StageId>,
    all_good: bool,
    strong_witness: bool,
}

impl StageTree {
    /// Expand stages breadth-first from the root until no stage is left.
    ///
    /// An inconclusive oracle answer aborts the construction.
    pub fn build(ctx: Context<'_>, options: &AnalysisOptions) -> EngineResult<Self> {
        let protocol = ctx.protocol;
        let method = options.k_method();
        let mut tree = StageTree {
            graph: DiGraph::new(),
            root: NodeIndex::new(0),
            check_witness: options.check_termination_witness,
            terminal: BTreeSet::new(),
            true_stages: BTreeSet::new(),
            false_stages: BTreeSet::new(),
            failed: BTreeSet::new(),
            failed_witness: BTreeSet::new(),
            all_good: options.check_termination_witness,
            strong_witness: options.check_termination_witness,
        };
        tree.root = tree.graph.add_node(Stage::root(protocol));

        let false_states = protocol.false_states();
        let true_states = protocol.true_states();
        let mut cache = KCache::new();
        let mut unprocessed = VecDeque::from([tree.root]);
        info!(states = protocol.states.len(), transitions = protocol.transitions.len(), "building stage tree");

        while let Some(index) = unprocessed.pop_front() {
            let id = index.index();
            let expansion = new_stages(ctx, &mut tree.graph[index], &mut cache, method)?;

            // A collapsed refinement is a dead end, like an empty K.
            if !expansion.refined {
                warn!(stage = id, "stage could not be refined");
                tree.failed.insert(id);
                continue;
            }
            let Some(children) = expansion.children else {
                tree.failed.insert(id);
                continue;
            };

            let stage = &tree.graph[index];
            if tree.check_witness {
                match check_termination_witness(ctx, stage, expansion.refined)? {
                    None => {
                        debug!(stage = id, "no termination witness");
                        tree.failed_witness.insert(id);
                    }
                    Some(false) => {
                        tree.strong_witness = false;
                        tree.all_good = false;
                    }
                    Some(true) => {
                        if tree.all_good {
                            tree.all_good = is_good(ctx, stage, &mut cache, method)?;
                        }
                    }
                }
            }

            if false_states.is_subset(&stage.absent) {
                tree.true_stages.insert(id);
            } else if true_states.is_subset(&stage.absent) {
                tree.false_stages.insert(id);
            }

            if children.is_empty() {
                tree.terminal.insert(id);
            }
            for mut child in children {
                if options.max_depth.is_some_and(|max| child.depth() > max) {
                    continue;
                }
                child.parent = Some(id);
                let child_index = tree.graph.add_node(child);
                tree.graph.add_edge(index, child_index, ());
                unprocessed.push_back(child_index);
            }
        }

        info!(
            stages = tree.len(),
            terminal = tree.terminal.len(),
            failed = tree.failed.len(),
            "stage tree built"
        );
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn root(&self) -> StageId {
        self.root.index()
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.graph.node_weight(NodeIndex::new(id))
    }

    pub fn stages(&self) -> impl Iterator<Item = (StageId, &Stage)> + '_ {
        self.graph
            .node_indices()
            .map(move |index| (index.index(), &self.graph[index]))
    }

    /// Parent-to-child edges.
    pub fn edges(&self) -> impl Iterator<Item = (StageId, StageId)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
    }

    pub fn children(&self, id: StageId) -> Vec<StageId> {
        let mut children: Vec<StageId> = self
            .graph
            .neighbors(NodeIndex::new(id))
            .map(|n| n.index())
            .collect();
        children.sort_unstable();
        children
    }

    pub fn terminal_stages(&self) -> &BTreeSet<StageId> {
        &self.terminal
    }

    pub fn true_stages(&self) -> &BTreeSet<StageId> {
        &self.true_stages
    }

    pub fn false_stages(&self) -> &BTreeSet<StageId> {
        &self.false_stages
    }

    pub fn failed_stages(&self) -> &BTreeSet<StageId> {
        &self.failed
    }

    pub fn failed_witness_stages(&self) -> &BTreeSet<StageId> {
        &self.failed_witness
    }

    /// Greatest distance from the root.
    pub fn max_depth(&self) -> usize {
        dijkstra(&self.graph, self.root, None, |_| 1usize)
            .into_values()
            .max()
            .unwrap_or(0)
    }

    /// `Some(true)` when witness checking ran and no stage failed.
    ///
    /// Stages cut off by `max_depth` are neither failed nor terminal, so a
    /// depth-limited run can report termination for branches it never
    /// finished exploring.
    pub fn terminates(&self) -> Option<bool> {
        (self.check_witness && self.failed.is_empty()).then_some(true)
    }

    /// Whether every stage has a strong witness, once termination is shown
    /// and every stage has some witness.
    pub fn witness(&self) -> Option<bool> {
        (self.terminates() == Some(true) && self.failed_witness.is_empty())
            .then_some(self.strong_witness)
    }

    pub fn speed(&self) -> Option<Speed> {
        match self.witness() {
            Some(true) if self.all_good => Some(Speed::QuadraticLog),
            Some(true) => Some(Speed::Cubic),
            _ => None,
        }
    }
}
