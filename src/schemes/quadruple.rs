//! The update quadruple buffered between consecutive levels.
//!
//! Each level journals its structural changes — supernodes and superedges
//! added or removed — into an outgoing quadruple that the next level
//! replays in the canonical order E⁻, V⁻, V⁺, E⁺. The quadruple keeps
//! itself minimal: adding to a plus list cancels a pending matching entry
//! in the minus list and vice versa, so an addition immediately followed by
//! a removal is invisible one level up. That cancellation is what makes
//! add-then-remove round trips structurally idempotent across the whole
//! hierarchy.

use crate::attrs::{EdgeKey, Key};
use crate::dec_graph::{Superedge, Supernode};
use serde::{Deserialize, Serialize};

/// Buffered (V⁺, V⁻, E⁺, E⁻) events flowing between consecutive levels.
///
/// Entries are shallow copies: keys, levels and attributes are meaningful,
/// interiors are not. Within each list, enqueue order is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQuadruple {
    v_plus: Vec<Supernode>,
    v_minus: Vec<Supernode>,
    e_plus: Vec<Superedge>,
    e_minus: Vec<Superedge>,
}

impl UpdateQuadruple {
    /// Creates an empty quadruple.
    pub fn new() -> Self {
        Self::default()
    }

    /// Added supernodes, in enqueue order.
    pub fn v_plus(&self) -> &[Supernode] {
        &self.v_plus
    }

    /// Removed supernodes, in enqueue order.
    pub fn v_minus(&self) -> &[Supernode] {
        &self.v_minus
    }

    /// Added superedges, in enqueue order.
    pub fn e_plus(&self) -> &[Superedge] {
        &self.e_plus
    }

    /// Removed superedges, in enqueue order.
    pub fn e_minus(&self) -> &[Superedge] {
        &self.e_minus
    }

    /// Journals an added supernode, cancelling a pending removal of the
    /// same key instead when one exists.
    pub fn add_v_plus(&mut self, node: Supernode) {
        if let Some(pos) = self.v_minus.iter().position(|n| n.key == node.key) {
            self.v_minus.remove(pos);
            return;
        }
        debug_assert!(
            !self.v_plus.iter().any(|n| n.key == node.key),
            "duplicate v_plus entry"
        );
        self.v_plus.push(node);
    }

    /// Journals a removed supernode, cancelling a pending addition of the
    /// same key instead when one exists.
    pub fn add_v_minus(&mut self, node: Supernode) {
        if let Some(pos) = self.v_plus.iter().position(|n| n.key == node.key) {
            self.v_plus.remove(pos);
            return;
        }
        debug_assert!(
            !self.v_minus.iter().any(|n| n.key == node.key),
            "duplicate v_minus entry"
        );
        self.v_minus.push(node);
    }

    /// Journals an added superedge, cancelling a pending removal of the
    /// same (tail, head) instead when one exists.
    pub fn add_e_plus(&mut self, edge: Superedge) {
        let key = edge.key();
        if let Some(pos) = self.e_minus.iter().position(|e| e.key() == key) {
            self.e_minus.remove(pos);
            return;
        }
        debug_assert!(
            !self.e_plus.iter().any(|e| e.key() == key),
            "duplicate e_plus entry"
        );
        self.e_plus.push(edge);
    }

    /// Journals a removed superedge, cancelling a pending addition of the
    /// same (tail, head) instead when one exists.
    pub fn add_e_minus(&mut self, edge: Superedge) {
        let key = edge.key();
        if let Some(pos) = self.e_plus.iter().position(|e| e.key() == key) {
            self.e_plus.remove(pos);
            return;
        }
        debug_assert!(
            !self.e_minus.iter().any(|e| e.key() == key),
            "duplicate e_minus entry"
        );
        self.e_minus.push(edge);
    }

    /// True when any list is non-empty.
    pub fn has_updates(&self) -> bool {
        !(self.v_plus.is_empty()
            && self.v_minus.is_empty()
            && self.e_plus.is_empty()
            && self.e_minus.is_empty())
    }

    /// Keys currently journalled as removed nodes.
    pub fn v_minus_keys(&self) -> Vec<Key> {
        self.v_minus.iter().map(|n| n.key.clone()).collect()
    }

    /// Keys currently journalled as removed edges.
    pub fn e_minus_keys(&self) -> Vec<EdgeKey> {
        self.e_minus.iter().map(Superedge::key).collect()
    }

    /// Drops all buffered events.
    pub fn clear(&mut self) {
        self.v_plus.clear();
        self.v_minus.clear();
        self.e_plus.clear();
        self.e_minus.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove_cancels() {
        let mut q = UpdateQuadruple::new();
        q.add_v_plus(Supernode::new(1, 0));
        q.add_v_minus(Supernode::new(1, 0));
        assert!(!q.has_updates());

        q.add_e_minus(Superedge::new(1, 2, 0));
        q.add_e_plus(Superedge::new(1, 2, 0));
        assert!(!q.has_updates());
    }

    #[test]
    fn independent_events_accumulate_in_order() {
        let mut q = UpdateQuadruple::new();
        q.add_v_plus(Supernode::new(2, 0));
        q.add_v_plus(Supernode::new(1, 0));
        q.add_e_plus(Superedge::new(1, 2, 0));
        assert_eq!(q.v_plus().len(), 2);
        assert_eq!(q.v_plus()[0].key, Key::Int(2));
        assert_eq!(q.v_plus()[1].key, Key::Int(1));
        assert_eq!(q.e_plus().len(), 1);
        assert!(q.has_updates());
        q.clear();
        assert!(!q.has_updates());
    }
}
