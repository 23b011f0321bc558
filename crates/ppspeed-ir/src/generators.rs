//! Built-in parametrized protocol families.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::loader::{LoadError, ProtocolSource};
use crate::protocol::{Protocol, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("Unknown generator '{0}' (expected one of: majority, broadcast, flock)")]
    UnknownGenerator(String),
    #[error("Bad arguments for generator '{generator}': {reason}")]
    BadArguments { generator: String, reason: String },
    #[error("Generated protocol is invalid: {0}")]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// 4-state exact majority; ties output false.
    Majority,
    /// 2-state OR.
    Broadcast,
    /// Flock-of-birds threshold predicate `x >= c`.
    Flock,
}

impl GeneratorKind {
    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::Majority => "majority",
            GeneratorKind::Broadcast => "broadcast",
            GeneratorKind::Flock => "flock",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeneratorKind {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "majority" => Ok(GeneratorKind::Majority),
            "broadcast" => Ok(GeneratorKind::Broadcast),
            "flock" | "flock-of-birds" => Ok(GeneratorKind::Flock),
            other => Err(GeneratorError::UnknownGenerator(other.to_string())),
        }
    }
}

/// A generator invocation with explicit JSON arguments.
#[derive(Debug, Clone)]
pub struct Generator {
    pub kind: GeneratorKind,
    pub args: Vec<Value>,
}

impl Generator {
    pub fn new(kind: GeneratorKind, args: Vec<Value>) -> Self {
        Self { kind, args }
    }

    pub fn generate(&self) -> Result<Protocol, GeneratorError> {
        match self.kind {
            GeneratorKind::Majority => {
                self.expect_arity(0)?;
                majority()
            }
            GeneratorKind::Broadcast => {
                self.expect_arity(0)?;
                broadcast()
            }
            GeneratorKind::Flock => {
                self.expect_arity(1)?;
                let c = self.args[0]
                    .as_u64()
                    .filter(|c| *c >= 1)
                    .ok_or_else(|| self.bad("threshold must be a positive integer"))?;
                let c = usize::try_from(c).map_err(|_| self.bad("threshold is too large"))?;
                flock_of_birds(c)
            }
        }
    }

    fn expect_arity(&self, n: usize) -> Result<(), GeneratorError> {
        if self.args.len() == n {
            Ok(())
        } else {
            Err(self.bad(&format!("expected {n} argument(s), got {}", self.args.len())))
        }
    }

    fn bad(&self, reason: &str) -> GeneratorError {
        GeneratorError::BadArguments {
            generator: self.kind.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ProtocolSource for Generator {
    fn describe(&self) -> String {
        format!("{}{}", self.kind, Value::Array(self.args.clone()))
    }

    fn load(&self) -> Result<Protocol, LoadError> {
        Ok(self.generate()?)
    }
}

fn build(
    f: impl FnOnce(&mut Protocol) -> Result<(), ProtocolError>,
    title: String,
) -> Result<Protocol, GeneratorError> {
    let mut protocol = Protocol::with_title(title);
    f(&mut protocol)?;
    protocol.validate()?;
    Ok(protocol)
}

pub fn majority() -> Result<Protocol, GeneratorError> {
    build(
        |p| {
            for q in ["A", "B", "a", "b"] {
                p.add_state(q)?;
            }
            p.add_transition(("A", "B"), ("a", "b"))?;
            p.add_transition(("A", "b"), ("A", "a"))?;
            p.add_transition(("B", "a"), ("B", "b"))?;
            p.add_transition(("a", "b"), ("b", "b"))?;
            p.add_input("A", "A")?;
            p.add_input("B", "B")?;
            for (q, out) in [("A", true), ("a", true), ("B", false), ("b", false)] {
                p.set_output(q, out)?;
            }
            Ok(())
        },
        "Majority".to_string(),
    )
}

pub fn broadcast() -> Result<Protocol, GeneratorError> {
    build(
        |p| {
            p.add_state("t")?;
            p.add_state("f")?;
            p.add_transition(("t", "f"), ("t", "t"))?;
            p.add_input("1", "t")?;
            p.add_input("0", "f")?;
            p.set_output("t", true)?;
            p.set_output("f", false)?;
            Ok(())
        },
        "Broadcast".to_string(),
    )
}

/// Flock of birds: decides whether at least `c` agents started with input 1.
///
/// State `x<i>` holds `i` collected units; `x<c>` is absorbing and converts
/// every agent it meets.
pub fn flock_of_birds(c: usize) -> Result<Protocol, GeneratorError> {
    let name = |i: usize| format!("x{i}");
    build(
        |p| {
            for i in 0..=c {
                p.add_state(name(i))?;
            }
            for i in 1..c {
                for j in i..c {
                    if i + j < c {
                        p.add_transition((&name(i), &name(j)), (&name(i + j), &name(0)))?;
                    } else {
                        p.add_transition((&name(i), &name(j)), (&name(c), &name(c)))?;
                    }
                }
            }
            for j in 0..c {
                p.add_transition((&name(c), &name(j)), (&name(c), &name(c)))?;
            }
            p.add_input("0", &name(0))?;
            p.add_input("1", &name(1))?;
            for i in 0..=c {
                p.set_output(&name(i), i == c)?;
            }
            Ok(())
        },
        format!("Flock-of-birds (c = {c})"),
    )
}
