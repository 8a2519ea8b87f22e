//! Error type for decontractible graphs and the contraction engine.
//!
//! The taxonomy distinguishes precondition violations (bad input, surfaced
//! before any state changes), invariant violations (internal inconsistency
//! discovered mid-propagation) and invalid scheme composition. A violation
//! discovered during an incremental update aborts that update and leaves the
//! level marked as needing a rebuild.

use crate::attrs::Key;
use std::fmt;

/// Error raised by graph operations and the contraction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecError {
    /// A node with this key already exists in the graph.
    DuplicateNode(Key),
    /// An edge with this (tail, head) pair already exists in the graph.
    DuplicateEdge(Key, Key),
    /// No node with this key exists in the graph.
    MissingNode(Key),
    /// No edge with this (tail, head) pair exists in the graph.
    MissingEdge(Key, Key),
    /// The node still has incident edges; they must be removed first.
    NodeHasIncidentEdges(Key),
    /// A removed node was expected to sit in exactly one singleton
    /// component set.
    NotSingletonCovered(Key),
    /// The requested level does not exist in the hierarchy.
    LevelOutOfRange(usize),
    /// Internal inconsistency; the enclosing update is aborted.
    Invariant(String),
    /// A contraction scheme cannot be composed onto the hierarchy in its
    /// current state.
    SchemeComposition(String),
    /// The level is out of service after a failed update; call `rebuild`.
    NeedsRebuild(usize),
}

impl fmt::Display for DecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecError::DuplicateNode(k) => {
                write!(f, "precondition violation: duplicate node key {}", k)
            }
            DecError::DuplicateEdge(t, h) => {
                write!(f, "precondition violation: duplicate edge ({}, {})", t, h)
            }
            DecError::MissingNode(k) => {
                write!(f, "precondition violation: no node with key {}", k)
            }
            DecError::MissingEdge(t, h) => {
                write!(f, "precondition violation: no edge ({}, {})", t, h)
            }
            DecError::NodeHasIncidentEdges(k) => write!(
                f,
                "precondition violation: node {} still has incident edges",
                k
            ),
            DecError::NotSingletonCovered(k) => write!(
                f,
                "precondition violation: removed node {} is not in a single singleton component set",
                k
            ),
            DecError::LevelOutOfRange(l) => {
                write!(f, "precondition violation: level {} is out of range", l)
            }
            DecError::Invariant(msg) => write!(f, "invariant violation: {}", msg),
            DecError::SchemeComposition(msg) => {
                write!(f, "invalid scheme composition: {}", msg)
            }
            DecError::NeedsRebuild(l) => write!(
                f,
                "level {} needs a rebuild after a failed update",
                l
            ),
        }
    }
}

impl std::error::Error for DecError {}

/// Shorthand result type used throughout the crate.
pub type DecResult<T> = Result<T, DecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_taxonomy() {
        let e = DecError::DuplicateNode(Key::Int(1));
        assert!(e.to_string().starts_with("precondition violation"));
        let e = DecError::Invariant("covering broken".into());
        assert!(e.to_string().starts_with("invariant violation"));
        let e = DecError::SchemeComposition("stack needs rebuild".into());
        assert!(e.to_string().starts_with("invalid scheme composition"));
    }
}
