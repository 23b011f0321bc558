#![doc = include_str!("../README.md")]

//! Protocol model for ppspeed.
//!
//! This crate defines head pairs, transitions, the finite `Protocol` that the
//! stage-tree analysis consumes, the JSON loader and the built-in generators.

pub mod generators;
pub mod head_pair;
pub mod loader;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod protocol;
pub mod transition;

pub use head_pair::HeadPair;
pub use loader::{JsonProtocolFile, LoadError, ProtocolSource};
pub use protocol::{Protocol, ProtocolError, StateId};
pub use transition::Transition;
