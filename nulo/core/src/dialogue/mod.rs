//! Branching Dialogue
//!
//! - [`graph`]: node/choice types and the validated [`DialogueGraph`]
//! - [`engine`]: the [`DialogueEngine`] walking a graph with reveal and
//!   decoration timing
//! - [`content`]: the built-in dialogue table
//!
//! Node ids mix one string sentinel (`"intro"`, the entry) with small
//! integers; [`NodeId`] models both.

pub mod content;
pub mod engine;
pub mod graph;

use thiserror::Error;

pub use engine::{
    ChoiceOutcome, DialogueEngine, DialogueSession, GLITCH_CHARSET, GLITCH_PLACEHOLDER,
};
pub use graph::{
    ActionTag, Choice, ChoiceTarget, DialogueGraph, DialogueNode, GraphError, NodeId, ENTRY_NAME,
};

/// Errors raised while walking a graph
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    /// Node id not present in the graph
    #[error("dialogue node {0} not found")]
    NotFound(NodeId),
}
