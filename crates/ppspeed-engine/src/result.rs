use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use ppspeed_ir::{HeadPair, Protocol, StateId};

use crate::stage::StageId;
use crate::stage_tree::{Speed, StageTree};

/// One stage of the tree, with state and head names resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StageSummary {
    pub id: StageId,
    pub parent: Option<StageId>,
    pub depth: usize,
    pub present: Vec<String>,
    pub present_unique: Vec<String>,
    pub absent: Vec<String>,
    pub disabled: Vec<[String; 2]>,
    #[serde(rename = "K")]
    pub k: Vec<[String; 2]>,
    #[serde(rename = "T")]
    pub t: Vec<String>,
    #[serde(rename = "true")]
    pub is_true: bool,
    #[serde(rename = "false")]
    pub is_false: bool,
    pub terminal: bool,
    pub failed: bool,
    pub failed_witness: bool,
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisReport {
    pub stages: usize,
    pub terminal: usize,
    pub max_depth: usize,
    pub termination: Option<bool>,
    pub witness: Option<bool>,
    pub speed: Option<Speed>,
    pub tree: Vec<StageSummary>,
}

impl AnalysisReport {
    pub fn from_tree(tree: &StageTree, protocol: &Protocol) -> Self {
        let names = |states: &BTreeSet<StateId>| -> Vec<String> {
            states.iter().map(|q| protocol.state_name(*q).to_string()).collect()
        };
        let pairs = |heads: &BTreeSet<HeadPair>| -> Vec<[String; 2]> {
            heads
                .iter()
                .map(|h| {
                    let (a, b) = h.elements();
                    [protocol.state_name(a).to_string(), protocol.state_name(b).to_string()]
                })
                .collect()
        };

        let summaries = tree
            .stages()
            .map(|(id, stage)| StageSummary {
                id,
                parent: stage.parent(),
                depth: stage.depth(),
                present: names(&stage.present),
                present_unique: names(&stage.present_unique),
                absent: names(&stage.absent),
                disabled: pairs(&stage.disabled),
                k: pairs(stage.k()),
                t: stage.t().iter().map(|t| protocol.transition_label(t)).collect(),
                is_true: tree.true_stages().contains(&id),
                is_false: tree.false_stages().contains(&id),
                terminal: tree.terminal_stages().contains(&id),
                failed: tree.failed_stages().contains(&id),
                failed_witness: tree.failed_witness_stages().contains(&id),
            })
            .collect();

        Self {
            stages: tree.len(),
            terminal: tree.terminal_stages().len(),
            max_depth: tree.max_depth(),
            termination: tree.terminates(),
            witness: tree.witness(),
            speed: tree.speed(),
            tree: summaries,
        }
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stages: {} ({} terminal)", self.stages, self.terminal)?;
        writeln!(f, "Maximal depth: {}", self.max_depth)?;
        let termination = match self.termination {
            Some(true) => "verified",
            _ => "could not be verified",
        };
        writeln!(f, "Protocol termination: {termination}")?;
        let witness = match self.witness {
            Some(true) => "verified (fast)",
            Some(false) => "verified (safe)",
            None => "could not be verified",
        };
        writeln!(f, "Protocol termination witness: {witness}")?;
        match self.speed {
            Some(speed) => write!(f, "Expected termination time: {speed}"),
            None => write!(f, "Expected termination time: unknown"),
        }
    }
}
