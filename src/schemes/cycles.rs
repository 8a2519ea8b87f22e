//! Contraction by elementary circuits.
//!
//! One component set per simple cycle of the lower level, plus singletons
//! for nodes on no cycle; with `maximal` only circuits maximal under member
//! inclusion are kept. The covering overlaps freely — a node lies in every
//! circuit through it.
//!
//! This scheme maintains the materialised decontraction of its level: an
//! added edge is answered by enumerating exactly the new circuits through
//! that edge on the flattened graph, a removed edge by re-examining only
//! the circuits that used it.

use crate::attrs::Key;
use crate::dec_graph::algorithms::{cycles_through_edge, cycles_through_node, simple_cycles};
use crate::dec_graph::{DecGraph, Superedge, Supernode};
use crate::error::{DecError, DecResult};
use crate::schemes::{
    edge_based, CompTable, ComponentSet, ContractionScheme, LevelState, SchemeConfig,
};
use std::collections::BTreeSet;

/// The simple-cycles contraction scheme.
#[derive(Clone)]
pub struct CyclesScheme {
    config: SchemeConfig,
    maximal: bool,
}

impl CyclesScheme {
    /// Creates the scheme. With `maximal`, only circuits maximal under set
    /// inclusion are tracked.
    pub fn new(maximal: bool) -> Self {
        Self {
            config: SchemeConfig::new(),
            maximal,
        }
    }

    /// Creates the scheme with the given attribute functions.
    pub fn with_config(config: SchemeConfig, maximal: bool) -> Self {
        Self { config, maximal }
    }
}

impl ContractionScheme for CyclesScheme {
    fn contraction_name(&self) -> String {
        format!(
            "simple{}_cycles",
            if self.maximal { "_maximal" } else { "" }
        )
    }

    fn clone_scheme(&self) -> Box<dyn ContractionScheme> {
        Box::new(self.clone())
    }

    fn config(&self) -> &SchemeConfig {
        &self.config
    }

    fn contraction_function(
        &mut self,
        state: &mut LevelState,
        lower: &DecGraph,
    ) -> DecResult<CompTable> {
        let snapshot = lower.graph();
        let mut cycle_sets: Vec<BTreeSet<Key>> = simple_cycles(&snapshot)
            .into_iter()
            .map(|cycle| cycle.into_iter().collect())
            .collect();
        let mut table = CompTable::new();
        if self.maximal {
            // size-descending insertion: no tracked subset can exist yet,
            // so the subset walk is skipped
            cycle_sets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            for members in cycle_sets {
                let attr = state.c_set_attrs(lower, &members);
                let id = state.fresh_id();
                table.add_maximal_set(ComponentSet::new(id, members, attr), false);
            }
        } else {
            for members in cycle_sets {
                let attr = state.c_set_attrs(lower, &members);
                let id = state.fresh_id();
                table.add_set(ComponentSet::new(id, members, attr), false);
            }
        }
        for key in lower.node_keys() {
            if !table.contains_node(&key) {
                let members = BTreeSet::from([key]);
                let attr = state.c_set_attrs(lower, &members);
                let id = state.fresh_id();
                table.add_set(ComponentSet::new(id, members, attr), false);
            }
        }
        table.clear_modified();
        Ok(table)
    }

    fn on_added_node(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        node: &Supernode,
    ) -> DecResult<()> {
        edge_based::added_node(state, lower, node)?;
        edge_based::decontraction_after_added_node(state, node)
    }

    fn on_removed_node(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        node: &Supernode,
    ) -> DecResult<()> {
        edge_based::removed_node(state, lower, node)?;
        edge_based::decontraction_after_removed_node(state, &node.key);
        Ok(())
    }

    fn on_added_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        state.place_added_edge(edge)?;
        edge_based::decontraction_after_added_edge(state, edge)?;
        let snapshot = state
            .decontracted
            .as_ref()
            .ok_or_else(|| DecError::Invariant("decontraction cache missing".into()))?
            .graph();
        for cycle in cycles_through_edge(&snapshot, &edge.tail, &edge.head) {
            let members: BTreeSet<Key> = cycle.into_iter().collect();
            let attr = state.c_set_attrs(lower, &members);
            let id = state.fresh_id();
            state
                .comp_table
                .add_set(ComponentSet::new(id, members, attr), self.maximal);
        }
        state.update_graph(lower)
    }

    fn on_removed_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        state.place_removed_edge(edge)?;
        edge_based::decontraction_after_removed_edge(state, edge);
        let snapshot = state
            .decontracted
            .as_ref()
            .ok_or_else(|| DecError::Invariant("decontraction cache missing".into()))?
            .graph();

        for id in state.comp_table.sets_containing_both(&edge.tail, &edge.head) {
            let Some(c_set) = state.comp_table.get(id) else {
                continue;
            };
            let members = c_set.members().clone();
            let sub = snapshot.induced(&members);
            let survivors: BTreeSet<BTreeSet<Key>> = cycles_through_node(&sub, &edge.tail)
                .into_iter()
                .map(|cycle| cycle.into_iter().collect())
                .collect();
            if survivors.contains(&members) {
                // an alternative circuit over the same node set remains
                continue;
            }
            state.comp_table.remove_set(id);
            if self.maximal {
                // sub-circuits of the broken circuit become candidates
                for cycle in &survivors {
                    let attr = state.c_set_attrs(lower, cycle);
                    let cid = state.fresh_id();
                    state
                        .comp_table
                        .add_set(ComponentSet::new(cid, cycle.clone(), attr), true);
                }
                let mut rest = members.clone();
                rest.remove(&edge.tail);
                for cycle in simple_cycles(&sub.induced(&rest)) {
                    let members: BTreeSet<Key> = cycle.into_iter().collect();
                    let attr = state.c_set_attrs(lower, &members);
                    let cid = state.fresh_id();
                    state
                        .comp_table
                        .add_set(ComponentSet::new(cid, members, attr), true);
                }
            }
        }
        // nodes may have fallen off their last circuit
        state.cover_singletons();
        state.update_graph(lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemes::{Level, UpdateQuadruple};

    fn k(v: i64) -> Key {
        Key::Int(v)
    }

    fn figure_eight() -> DecGraph {
        let mut g = DecGraph::new(0);
        for key in 1..=4 {
            g.add_node(Supernode::new(key, 0)).unwrap();
        }
        for (t, h) in [(1, 2), (2, 3), (3, 1), (2, 4), (4, 2)] {
            g.add_edge(Superedge::new(t, h, 0)).unwrap();
        }
        g
    }

    fn contracted(lower: &mut DecGraph, maximal: bool) -> Level {
        let mut level = Level::new(Box::new(CyclesScheme::new(maximal)), 1);
        level.contract(lower).unwrap();
        level
    }

    fn member_sets(level: &Level) -> BTreeSet<BTreeSet<Key>> {
        level
            .state
            .comp_table
            .all_sets()
            .map(|c| c.members().clone())
            .collect()
    }

    #[test]
    fn contract_tracks_both_incomparable_circuits() {
        let mut g = figure_eight();
        let level = contracted(&mut g, true);
        assert_eq!(
            member_sets(&level),
            BTreeSet::from([
                BTreeSet::from([k(1), k(2), k(3)]),
                BTreeSet::from([k(2), k(4)]),
            ])
        );
        // node 2 lies in both circuits; its home is the lower set id
        assert_eq!(g.node(&k(2)).unwrap().component_sets.len(), 2);
        assert_eq!(level.state.dec_graph.order(), 2);
        // the two circuit supernodes are mutually connected through node 2
        assert_eq!(level.state.dec_graph.edge_count(), 2);
    }

    #[test]
    fn contract_covers_acyclic_nodes_with_singletons() {
        let mut g = figure_eight();
        g.add_node(Supernode::new(5, 0)).unwrap();
        g.add_edge(Superedge::new(3, 5, 0)).unwrap();
        let level = contracted(&mut g, true);
        assert!(member_sets(&level).contains(&BTreeSet::from([k(5)])));
        assert_eq!(level.state.dec_graph.order(), 3);
    }

    #[test]
    fn added_edge_creates_circuit_sets() {
        let mut g = DecGraph::new(0);
        for key in 1..=3 {
            g.add_node(Supernode::new(key, 0)).unwrap();
        }
        for (t, h) in [(1, 2), (2, 3)] {
            g.add_edge(Superedge::new(t, h, 0)).unwrap();
        }
        let mut level = contracted(&mut g, true);
        assert_eq!(level.state.dec_graph.order(), 3);

        let closing = Superedge::new(3, 1, 0);
        g.add_edge(closing.clone()).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_plus(closing);
        level.update(&q, &mut g).unwrap();

        assert_eq!(
            member_sets(&level),
            BTreeSet::from([BTreeSet::from([k(1), k(2), k(3)])])
        );
        assert_eq!(level.state.dec_graph.order(), 1);
        assert_eq!(level.state.dec_graph.edge_count(), 0);
        assert_eq!(level.state.dec_graph.complete_decontraction(), g);
    }

    #[test]
    fn removed_edge_breaks_circuit_back_into_singletons() {
        let mut g = DecGraph::new(0);
        for key in 1..=3 {
            g.add_node(Supernode::new(key, 0)).unwrap();
        }
        for (t, h) in [(1, 2), (2, 3), (3, 1)] {
            g.add_edge(Superedge::new(t, h, 0)).unwrap();
        }
        let mut level = contracted(&mut g, true);
        assert_eq!(level.state.dec_graph.order(), 1);

        let removed = g.remove_edge(&(k(2), k(3))).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_minus(removed);
        level.update(&q, &mut g).unwrap();

        assert_eq!(
            member_sets(&level),
            BTreeSet::from([
                BTreeSet::from([k(1)]),
                BTreeSet::from([k(2)]),
                BTreeSet::from([k(3)]),
            ])
        );
        assert_eq!(level.state.dec_graph.order(), 3);
        assert_eq!(level.state.dec_graph.complete_decontraction(), g);
    }

    #[test]
    fn removed_edge_keeps_maximal_subcircuits() {
        // two nested circuits: 1->2->3->1 and the chord 2->1 forming 1->2->1
        let mut g = DecGraph::new(0);
        for key in 1..=3 {
            g.add_node(Supernode::new(key, 0)).unwrap();
        }
        for (t, h) in [(1, 2), (2, 3), (3, 1), (2, 1)] {
            g.add_edge(Superedge::new(t, h, 0)).unwrap();
        }
        let mut level = contracted(&mut g, true);
        // the 2-circuit is a subset of the triangle, so only the triangle
        // is tracked under maximal insertion
        assert_eq!(
            member_sets(&level),
            BTreeSet::from([BTreeSet::from([k(1), k(2), k(3)])])
        );

        // breaking the triangle leaves the 2-circuit and frees node 3
        let removed = g.remove_edge(&(k(2), k(3))).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_minus(removed);
        level.update(&q, &mut g).unwrap();

        assert_eq!(
            member_sets(&level),
            BTreeSet::from([
                BTreeSet::from([k(1), k(2)]),
                BTreeSet::from([k(3)]),
            ])
        );
    }

    #[test]
    fn non_maximal_scheme_keeps_nested_circuits() {
        let mut g = DecGraph::new(0);
        for key in 1..=3 {
            g.add_node(Supernode::new(key, 0)).unwrap();
        }
        for (t, h) in [(1, 2), (2, 3), (3, 1), (2, 1)] {
            g.add_edge(Superedge::new(t, h, 0)).unwrap();
        }
        let level = contracted(&mut g, false);
        assert_eq!(
            member_sets(&level),
            BTreeSet::from([
                BTreeSet::from([k(1), k(2), k(3)]),
                BTreeSet::from([k(1), k(2)]),
            ])
        );
    }
}
