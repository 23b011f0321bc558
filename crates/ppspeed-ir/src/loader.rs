//! Protocol sources: the abstract-protocol JSON format and the
//! [`ProtocolSource`] capability shared with the built-in generators.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generators::GeneratorError;
use crate::protocol::{Protocol, ProtocolError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read protocol file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed protocol JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid protocol: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),
}

/// Anything that can produce a finite [`Protocol`].
pub trait ProtocolSource {
    /// Short description for logs.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Protocol, LoadError>;
}

/// On-disk layout of an abstract protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub states: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
    #[serde(default)]
    pub initial_states: Vec<String>,
    #[serde(default)]
    pub true_states: Vec<String>,
    #[serde(default)]
    pub false_states: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problematic_heads: Vec<[String; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pre: [String; 2],
    pub post: [String; 2],
}

impl ProtocolSpec {
    pub fn into_protocol(self) -> Result<Protocol, ProtocolError> {
        let mut protocol = Protocol {
            title: self.title,
            ..Protocol::default()
        };
        for state in self.states {
            protocol.add_state(state)?;
        }
        for t in &self.transitions {
            protocol.add_transition(
                (t.pre[0].as_str(), t.pre[1].as_str()),
                (t.post[0].as_str(), t.post[1].as_str()),
            )?;
        }
        // Abstract protocols use every initial state as its own input symbol.
        for q in &self.initial_states {
            protocol.add_input(q.clone(), q)?;
        }
        for q in &self.true_states {
            protocol.set_output(q, true)?;
        }
        for q in &self.false_states {
            protocol.set_output(q, false)?;
        }
        for [a, b] in &self.problematic_heads {
            protocol.add_problematic_head(a, b)?;
        }
        protocol.validate()?;
        Ok(protocol)
    }

    pub fn from_protocol(protocol: &Protocol) -> Self {
        let name = |q: usize| protocol.state_name(q).to_string();
        let names = |set: BTreeSet<usize>| -> Vec<String> { set.into_iter().map(name).collect() };
        let transitions = protocol
            .transitions
            .iter()
            .map(|t| {
                let (a, b) = t.pre.elements();
                let (c, d) = t.post.elements();
                TransitionSpec {
                    name: Some(format!("{} {} -> {} {}", name(a), name(b), name(c), name(d))),
                    pre: [name(a), name(b)],
                    post: [name(c), name(d)],
                }
            })
            .collect();
        let problematic_heads = protocol
            .problematic_heads
            .iter()
            .map(|h| {
                let (a, b) = h.elements();
                [name(a), name(b)]
            })
            .collect();

        Self {
            title: protocol.title.clone(),
            states: protocol.states.iter().cloned().collect(),
            transitions,
            initial_states: names(protocol.initial_states()),
            true_states: names(protocol.true_states()),
            false_states: names(protocol.false_states()),
            problematic_heads,
        }
    }
}

impl Protocol {
    pub fn from_json(source: &str) -> Result<Protocol, LoadError> {
        let spec: ProtocolSpec = serde_json::from_str(source)?;
        Ok(spec.into_protocol()?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ProtocolSpec::from_protocol(self))
    }
}

/// A protocol stored in the abstract-protocol JSON format.
#[derive(Debug, Clone)]
pub struct JsonProtocolFile {
    pub path: PathBuf,
}

impl JsonProtocolFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ProtocolSource for JsonProtocolFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Protocol, LoadError> {
        let source = std::fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        Protocol::from_json(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::head_pair::HeadPair;

    const MAJORITY: &str = r#"{
  "title": "Majority",
  "states": ["A", "B", "a", "b"],
  "transitions": [
    { "name": "A B -> a b", "pre": ["A", "B"], "post": ["a", "b"] },
    { "pre": ["A", "b"], "post": ["A", "a"] },
    { "pre": ["B", "a"], "post": ["B", "b"] },
    { "pre": ["a", "b"], "post": ["b", "b"] }
  ],
  "initialStates": ["A", "B"],
  "trueStates":    ["A", "a"],
  "falseStates":   ["B", "b"],
  "problematicHeads": [["b", "a"]]
}"#;

    #[test]
    fn parses_abstract_protocol_format() {
        let p = Protocol::from_json(MAJORITY).expect("valid protocol");
        assert_eq!(p.title.as_deref(), Some("Majority"));
        assert_eq!(p.states.len(), 4);
        assert_eq!(p.transitions.len(), 4);
        assert_eq!(p.initial_states(), BTreeSet::from([0, 1]));
        assert_eq!(p.true_states(), BTreeSet::from([0, 2]));
        assert_eq!(p.false_states(), BTreeSet::from([1, 3]));
        assert!(p.problematic_heads.contains(&HeadPair::new(2, 3)));
    }

    #[test]
    fn json_export_reloads_to_same_protocol() {
        let p = Protocol::from_json(MAJORITY).expect("valid protocol");
        let text = p.to_json().expect("serializable");
        assert!(text.contains("\"initialStates\""));
        assert_eq!(Protocol::from_json(&text).expect("reload"), p);
    }

    #[test]
    fn unknown_state_reference_is_an_error() {
        let text = r#"{ "states": ["A"], "transitions": [ { "pre": ["A", "Z"], "post": ["A", "A"] } ] }"#;
        let err = Protocol::from_json(text).expect_err("Z is undeclared");
        assert!(matches!(err, LoadError::Protocol(ProtocolError::UnknownState(ref s)) if s == "Z"));
    }

    #[test]
    fn missing_file_reports_path() {
        let source = JsonProtocolFile::new("/nonexistent/ppspeed/protocol.json");
        let err = source.load().expect_err("file does not exist");
        assert!(err.to_string().contains("/nonexistent/ppspeed/protocol.json"));
    }

    #[test]
    fn protocol_file_source_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("majority.json");
        std::fs::write(&path, MAJORITY).expect("write");
        let source = JsonProtocolFile::new(&path);
        assert!(source.describe().ends_with("majority.json"));
        let p = source.load().expect("loaded");
        assert_eq!(p, Protocol::from_json(MAJORITY).expect("valid protocol"));
    }
}
