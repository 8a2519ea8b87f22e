//! Default node handlers for edge-based schemes, plus maintenance of the
//! materialised decontraction used by schemes whose algorithms run on the
//! flattened graph.
//!
//! In an edge-based scheme, connectivity through edges is the sole grouping
//! criterion: a node with no incident edges always sits in a singleton
//! component set. That gives the two node reactions for free — a new node
//! becomes a singleton behind a dummy supernode, and a removed node must
//! already have been stripped down to a singleton by the preceding edge
//! removals.

use crate::attrs::Key;
use crate::dec_graph::{DecGraph, Superedge, Supernode};
use crate::error::{DecError, DecResult};
use crate::schemes::{ComponentSet, LevelState};
use std::collections::BTreeSet;

/// Default reaction to a node added one level below: cover it with a fresh
/// singleton component set and park it in a dummy supernode so subsequent
/// events of the same pass can resolve its home. The dummy is journalled V⁺
/// but kept out of the directory; the reconciliation pass replaces it with
/// the set's real supernode and the journal entries cancel out.
pub fn added_node(state: &mut LevelState, lower: &mut DecGraph, node: &Supernode) -> DecResult<()> {
    let id = state.fresh_id();
    let members = BTreeSet::from([node.key.clone()]);
    let attr = state.c_set_attrs(lower, &members);
    state
        .comp_table
        .add_set(ComponentSet::new(id, members, attr), false);
    let ids = state.comp_table.sets_of(&node.key);

    let dummy_key = state.fresh_key();
    let mut dummy = Supernode::new(dummy_key.clone(), state.level);
    dummy.component_sets = ids.clone();
    let mut copy = lower
        .node(&node.key)
        .ok_or_else(|| DecError::Invariant(format!("added node {} not in lower graph", node.key)))?
        .shallow_copy();
    copy.supernode = Some(dummy_key.clone());
    copy.component_sets = ids.clone();
    dummy.dec.add_node(copy)?;

    if let Some(n) = lower.node_mut(&node.key) {
        n.supernode = Some(dummy_key.clone());
        n.component_sets = ids;
    }
    state.set_home(node.key.clone(), dummy_key);
    state.quadruple.add_v_plus(dummy.shallow_copy());
    state.dec_graph.add_node(dummy)?;
    Ok(())
}

/// Default reaction to a node removed one level below. The preceding edge
/// removals must have left it in exactly one singleton component set; the
/// set is dropped without re-marking the node, and the node is recorded for
/// interior cleanup under the supernode that still holds it.
pub fn removed_node(
    state: &mut LevelState,
    _lower: &mut DecGraph,
    node: &Supernode,
) -> DecResult<()> {
    let ids = state.comp_table.sets_of(&node.key);
    let singleton = ids.len() == 1
        && ids
            .first()
            .and_then(|id| state.comp_table.get(*id))
            .is_some_and(|c| c.len() == 1);
    let Some(&id) = ids.first() else {
        return Err(DecError::NotSingletonCovered(node.key.clone()));
    };
    if !singleton {
        return Err(DecError::NotSingletonCovered(node.key.clone()));
    }
    state.comp_table.remove_set(id);
    state.comp_table.modified.remove(&node.key);

    let home = state.home(&node.key)?;
    state
        .deleted_subnodes
        .entry(home)
        .or_default()
        .insert(node.key.clone());
    Ok(())
}

/// Materialises the flat view of the level when it is not cached yet. Call
/// sites run this *after* applying their structural change, so a fresh
/// build already includes it.
pub fn ensure_decontraction(state: &mut LevelState) {
    if state.decontracted.is_none() {
        state.decontracted = Some(state.dec_graph.complete_decontraction());
    }
}

/// Extends the cached decontraction with a freshly added node.
pub fn decontraction_after_added_node(state: &mut LevelState, node: &Supernode) -> DecResult<()> {
    if state.decontracted.is_none() {
        ensure_decontraction(state);
        return Ok(());
    }
    if let Some(g) = state.decontracted.as_mut() {
        if !g.contains_node(&node.key) {
            g.add_node(node.shallow_copy())?;
        }
    }
    Ok(())
}

/// Shrinks the cached decontraction after a node removal. The removed
/// node's interior copy survives until reconciliation, so a fresh build is
/// pruned immediately after materialising.
pub fn decontraction_after_removed_node(state: &mut LevelState, key: &Key) {
    ensure_decontraction(state);
    if let Some(g) = state.decontracted.as_mut() {
        g.take_node(key);
    }
}

/// Extends the cached decontraction with a freshly added edge.
pub fn decontraction_after_added_edge(state: &mut LevelState, edge: &Superedge) -> DecResult<()> {
    if state.decontracted.is_none() {
        ensure_decontraction(state);
        return Ok(());
    }
    if let Some(g) = state.decontracted.as_mut() {
        let key = edge.key();
        if !g.contains_edge(&key) {
            g.add_edge(Superedge::new(key.0, key.1, edge.level))?;
        }
    }
    Ok(())
}

/// Shrinks the cached decontraction after an edge removal.
pub fn decontraction_after_removed_edge(state: &mut LevelState, edge: &Superedge) {
    if state.decontracted.is_none() {
        ensure_decontraction(state);
        return;
    }
    if let Some(g) = state.decontracted.as_mut() {
        g.discard_edge(&edge.key());
    }
}
