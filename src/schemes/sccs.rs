//! Contraction by strongly connected components.
//!
//! One component set per SCC of the lower level; the covering is a
//! partition. Incrementally, an added edge can only merge components — if
//! the new inter-supernode edge closes a cycle at the upper level, every
//! supernode on a path back collapses into one set — and a removed
//! intra-supernode edge can only split its component, detected by running
//! Tarjan on the supernode's interior.

use crate::attrs::{Key, SetId};
use crate::dec_graph::algorithms::{
    ancestors, descendants, is_reachable, strongly_connected_components,
};
use crate::dec_graph::{DecGraph, Superedge};
use crate::error::{DecError, DecResult};
use crate::schemes::{
    CompTable, ComponentSet, ContractionScheme, LevelState, SchemeConfig,
};
use std::collections::BTreeSet;

/// The strongly-connected-components contraction scheme.
#[derive(Clone, Default)]
pub struct SccsScheme {
    config: SchemeConfig,
}

impl SccsScheme {
    /// Creates the scheme with no attribute functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the scheme with the given attribute functions.
    pub fn with_config(config: SchemeConfig) -> Self {
        Self { config }
    }
}

impl ContractionScheme for SccsScheme {
    fn contraction_name(&self) -> String {
        "scc".to_string()
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
        let mut table = CompTable::new();
        for scc in strongly_connected_components(&snapshot) {
            let attr = state.c_set_attrs(lower, &scc);
            let id = state.fresh_id();
            table.add_set(ComponentSet::new(id, scc, attr), false);
        }
        table.clear_modified();
        Ok(table)
    }

    fn on_added_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        let u = state.home(&edge.tail)?;
        let v = state.home(&edge.head)?;
        if u == v {
            return state.place_added_edge(edge);
        }
        let created = state.add_edge_in_superedge(&u, &v, edge)?;
        if !created {
            return Ok(());
        }
        let snapshot = state.dec_graph.graph();
        if !is_reachable(&snapshot, &v, &u) {
            return Ok(());
        }
        // the new edge closes a cycle: every supernode on a v -> u path
        // collapses into one component
        let on_path: BTreeSet<Key> = descendants(&snapshot, &v)
            .intersection(&ancestors(&snapshot, &u))
            .cloned()
            .collect();
        let mut members: BTreeSet<Key> = BTreeSet::new();
        let mut dead: BTreeSet<SetId> = BTreeSet::new();
        for skey in &on_path {
            if let Some(node) = state.dec_graph.node(skey) {
                for id in &node.component_sets {
                    if let Some(c_set) = state.comp_table.get(*id) {
                        members.extend(c_set.members().iter().cloned());
                        dead.insert(*id);
                    }
                }
            }
        }
        for id in dead {
            state.comp_table.remove_set(id);
        }
        let attr = state.c_set_attrs(lower, &members);
        let id = state.fresh_id();
        state
            .comp_table
            .add_set(ComponentSet::new(id, members, attr), false);
        // subsequent events of this pass must see the merged supernode
        state.update_graph(lower)
    }

    fn on_removed_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        let u = state.home(&edge.tail)?;
        let v = state.home(&edge.head)?;
        if u != v {
            return state.remove_edge_in_superedge(&u, &v, &edge.key());
        }
        let components = {
            let un = state
                .dec_graph
                .node_mut(&u)
                .ok_or_else(|| DecError::Invariant(format!("home supernode {} missing", u)))?;
            un.dec.discard_edge(&edge.key());
            strongly_connected_components(&un.dec.graph())
        };
        if components.len() <= 1 {
            return Ok(());
        }
        // the component broke apart: replace its set with one per part
        let dead: Vec<SetId> = state
            .dec_graph
            .node(&u)
            .map(|n| {
                n.component_sets
                    .iter()
                    .copied()
                    .filter(|id| state.comp_table.contains_set(*id))
                    .collect()
            })
            .unwrap_or_default();
        for id in dead {
            state.comp_table.remove_set(id);
        }
        for component in components {
            let attr = state.c_set_attrs(lower, &component);
            let id = state.fresh_id();
            state
                .comp_table
                .add_set(ComponentSet::new(id, component, attr), false);
        }
        state.update_graph(lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{attr, AttrValue, Attributes};
    use crate::dec_graph::Supernode;
    use crate::schemes::{Level, UpdateQuadruple};

    fn k(v: i64) -> Key {
        Key::Int(v)
    }

    fn weight(bag: &Attributes) -> i64 {
        bag.get("weight").and_then(AttrValue::as_i64).unwrap_or(0)
    }

    fn sample_graph() -> DecGraph {
        let mut g = DecGraph::new(0);
        for (key, w) in [(1, 30), (2, 20), (3, 10), (4, 15), (5, 15)] {
            g.add_node(Supernode::new(key, 0).with_attr(attr("weight", w)))
                .unwrap();
        }
        for (t, h, w) in [
            (1, 2, 5),
            (2, 3, 10),
            (3, 1, 20),
            (1, 4, 10),
            (4, 5, 5),
            (5, 4, 10),
        ] {
            g.add_edge(Superedge::new(t, h, 0).with_attr(attr("weight", w)))
                .unwrap();
        }
        g
    }

    fn contracted(lower: &mut DecGraph, scheme: SccsScheme) -> Level {
        let mut level = Level::new(Box::new(scheme), 1);
        level.contract(lower).unwrap();
        level
    }

    fn home(g: &DecGraph, key: i64) -> Key {
        g.node(&k(key)).unwrap().supernode.clone().unwrap()
    }

    #[test]
    fn contract_partitions_into_sccs() {
        let mut g = sample_graph();
        let level = contracted(&mut g, SccsScheme::new());

        assert_eq!(level.state.dec_graph.order(), 2);
        assert_eq!(level.state.dec_graph.edge_count(), 1);
        assert_eq!(level.state.dec_graph.complete_decontraction(), sample_graph());

        assert_eq!(home(&g, 1), home(&g, 2));
        assert_eq!(home(&g, 1), home(&g, 3));
        assert_eq!(home(&g, 4), home(&g, 5));
        assert_ne!(home(&g, 1), home(&g, 4));

        let triangle = level.state.dec_graph.node(&home(&g, 1)).unwrap();
        assert_eq!(triangle.dec.edge_count(), 3);
        let pair = level.state.dec_graph.node(&home(&g, 4)).unwrap();
        assert_eq!(pair.dec.edge_count(), 2);

        let cross = level
            .state
            .dec_graph
            .edge(&(home(&g, 1), home(&g, 4)))
            .unwrap();
        assert_eq!(cross.dec.len(), 1);
        assert!(cross.dec.contains_key(&(k(1), k(4))));
    }

    #[test]
    fn contract_applies_supernode_attr_function() {
        let config = SchemeConfig::new().with_supernode_attr(|dec| {
            attr("weight", dec.nodes().map(|n| weight(&n.attr)).sum::<i64>() + 1)
        });
        let mut g = sample_graph();
        let level = contracted(&mut g, SccsScheme::with_config(config));

        assert_eq!(level.state.dec_graph.complete_decontraction(), sample_graph());
        let triangle = level.state.dec_graph.node(&home(&g, 1)).unwrap();
        assert_eq!(weight(&triangle.attr), 61);
        let pair = level.state.dec_graph.node(&home(&g, 4)).unwrap();
        assert_eq!(weight(&pair.attr), 31);
    }

    #[test]
    fn contract_applies_superedge_attr_function() {
        let config = SchemeConfig::new().with_superedge_attr(|edges| {
            attr("weight", edges.iter().map(|e| weight(&e.attr)).sum::<i64>())
        });
        let mut g = sample_graph();
        let level = contracted(&mut g, SccsScheme::with_config(config));

        let cross = level
            .state
            .dec_graph
            .edge(&(home(&g, 1), home(&g, 4)))
            .unwrap();
        assert_eq!(weight(&cross.attr), 10);
    }

    #[test]
    fn contract_applies_c_set_attr_function() {
        let config = SchemeConfig::new().with_c_set_attr(|members| {
            attr(
                "weight",
                members.iter().map(|n| weight(&n.attr) + 1).sum::<i64>(),
            )
        });
        let mut g = sample_graph();
        let level = contracted(&mut g, SccsScheme::with_config(config));

        let triangle_sets = &g.node(&k(1)).unwrap().component_sets;
        assert_eq!(triangle_sets.len(), 1);
        let c_set = level
            .state
            .comp_table
            .get(*triangle_sets.first().unwrap())
            .unwrap();
        assert_eq!(weight(&c_set.attr), 63);

        let pair_sets = &g.node(&k(4)).unwrap().component_sets;
        let c_set = level
            .state
            .comp_table
            .get(*pair_sets.first().unwrap())
            .unwrap();
        assert_eq!(weight(&c_set.attr), 32);
    }

    #[test]
    fn update_added_node_becomes_singleton() {
        let mut g = sample_graph();
        let mut level = contracted(&mut g, SccsScheme::new());

        let new_node = Supernode::new(6, 0).with_attr(attr("weight", 10));
        g.add_node(new_node.clone()).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_v_plus(new_node.shallow_copy());
        level.update(&q, &mut g).unwrap();

        assert_eq!(level.state.dec_graph.order(), 3);
        assert_eq!(level.state.dec_graph.edge_count(), 1);
        let six = level.state.dec_graph.node(&home(&g, 6)).unwrap();
        assert_eq!(six.dec.order(), 1);
        assert_eq!(six.dec.edge_count(), 0);
        assert!(level.state.dec_graph.in_edges(&home(&g, 6)).is_empty());
        assert!(level.state.dec_graph.out_edges(&home(&g, 6)).is_empty());
    }

    #[test]
    fn update_added_edge_extends_existing_superedge() {
        let mut g = sample_graph();
        let mut level = contracted(&mut g, SccsScheme::new());

        let new_edge = Superedge::new(1, 5, 0).with_attr(attr("weight", 5));
        g.add_edge(new_edge.clone()).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_plus(new_edge.clone());
        level.update(&q, &mut g).unwrap();

        assert_eq!(level.state.dec_graph.order(), 2);
        assert_eq!(level.state.dec_graph.edge_count(), 1);
        assert_eq!(
            level
                .state
                .dec_graph
                .node(&home(&g, 1))
                .unwrap()
                .dec
                .edge_count(),
            3
        );
        assert_eq!(
            level
                .state
                .dec_graph
                .node(&home(&g, 4))
                .unwrap()
                .dec
                .edge_count(),
            2
        );

        let cross = level
            .state
            .dec_graph
            .edge(&(home(&g, 1), home(&g, 4)))
            .unwrap();
        assert_eq!(cross.dec.len(), 2);
        assert!(cross.dec.contains_key(&(k(1), k(4))));
        assert!(cross.dec.contains_key(&(k(1), k(5))));
    }

    #[test]
    fn update_added_edge_collapses_everything_reachable() {
        let mut g = sample_graph();
        let mut level = contracted(&mut g, SccsScheme::new());

        let new_edge = Superedge::new(5, 2, 0).with_attr(attr("weight", 10));
        g.add_edge(new_edge.clone()).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_plus(new_edge);
        level.update(&q, &mut g).unwrap();

        assert_eq!(level.state.dec_graph.order(), 1);
        assert_eq!(level.state.dec_graph.edge_count(), 0);
        assert_eq!(level.state.dec_graph.complete_decontraction(), g);
        let merged = level.state.dec_graph.node(&home(&g, 5)).unwrap();
        assert_eq!(merged.dec.edge_count(), 7);
        assert_eq!(merged.dec, g);
    }

    #[test]
    fn update_added_nodes_and_edges_together() {
        let mut g = sample_graph();
        let mut level = contracted(&mut g, SccsScheme::new());

        let mut q = UpdateQuadruple::new();
        for key in [6, 7] {
            let node = Supernode::new(key, 0).with_attr(attr("weight", 10));
            g.add_node(node.clone()).unwrap();
            q.add_v_plus(node.shallow_copy());
        }
        for (t, h) in [(1, 5), (3, 6), (6, 7)] {
            let edge = Superedge::new(t, h, 0).with_attr(attr("weight", 5));
            g.add_edge(edge.clone()).unwrap();
            q.add_e_plus(edge);
        }
        level.update(&q, &mut g).unwrap();

        assert_eq!(level.state.dec_graph.order(), 4);
        assert_eq!(level.state.dec_graph.edge_count(), 3);
        assert_eq!(
            level
                .state
                .dec_graph
                .node(&home(&g, 6))
                .unwrap()
                .dec
                .order(),
            1
        );
        assert_eq!(
            level
                .state
                .dec_graph
                .node(&home(&g, 7))
                .unwrap()
                .dec
                .order(),
            1
        );
        assert_eq!(level.state.dec_graph.complete_decontraction(), g);

        let expected: BTreeSet<(Key, Key)> = BTreeSet::from([
            (home(&g, 1), home(&g, 5)),
            (home(&g, 3), home(&g, 6)),
            (home(&g, 6), home(&g, 7)),
        ]);
        let actual: BTreeSet<(Key, Key)> =
            level.state.dec_graph.edge_keys().into_iter().collect();
        assert_eq!(actual, expected);
        assert_eq!(
            level
                .state
                .dec_graph
                .edge(&(home(&g, 3), home(&g, 6)))
                .unwrap()
                .dec
                .len(),
            1
        );
        assert_eq!(
            level
                .state
                .dec_graph
                .edge(&(home(&g, 1), home(&g, 5)))
                .unwrap()
                .dec
                .len(),
            2
        );
        assert_eq!(
            level
                .state
                .dec_graph
                .edge(&(home(&g, 6), home(&g, 7)))
                .unwrap()
                .dec
                .len(),
            1
        );
    }

    #[test]
    fn update_removed_isolated_node() {
        let mut g = sample_graph();
        g.add_node(Supernode::new(6, 0).with_attr(attr("weight", 10)))
            .unwrap();
        let mut level = contracted(&mut g, SccsScheme::new());

        let removed = g.node(&k(6)).unwrap().shallow_copy();
        g.remove_node(&k(6)).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_v_minus(removed);
        level.update(&q, &mut g).unwrap();

        assert_eq!(level.state.dec_graph.order(), 2);
        assert_eq!(level.state.dec_graph.edge_count(), 1);
        assert_eq!(home(&g, 1), home(&g, 2));
        assert_eq!(home(&g, 1), home(&g, 3));
        assert_eq!(home(&g, 4), home(&g, 5));
        assert_eq!(
            level
                .state
                .dec_graph
                .node(&home(&g, 1))
                .unwrap()
                .dec
                .edge_count(),
            3
        );
        assert_eq!(
            level
                .state
                .dec_graph
                .node(&home(&g, 4))
                .unwrap()
                .dec
                .edge_count(),
            2
        );
        assert_eq!(
            level
                .state
                .dec_graph
                .edge(&(home(&g, 1), home(&g, 4)))
                .unwrap()
                .dec
                .len(),
            1
        );
    }

    #[test]
    fn update_removed_edge_splits_the_component() {
        let mut g = sample_graph();
        let mut level = contracted(&mut g, SccsScheme::new());

        let removed = g.remove_edge(&(k(2), k(3))).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_minus(removed);
        level.update(&q, &mut g).unwrap();

        // the triangle breaks into three singletons; {4, 5} survives
        assert_eq!(level.state.dec_graph.order(), 4);
        assert_ne!(home(&g, 1), home(&g, 2));
        assert_ne!(home(&g, 2), home(&g, 3));
        assert_eq!(home(&g, 4), home(&g, 5));
        assert_eq!(level.state.dec_graph.complete_decontraction(), g);
    }

    #[test]
    fn add_then_remove_edge_is_idempotent() {
        let mut g = sample_graph();
        let mut level = contracted(&mut g, SccsScheme::new());
        let before = level.state.dec_graph.clone();

        let edge = Superedge::new(5, 2, 0);
        g.add_edge(edge.clone()).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_plus(edge.clone());
        level.update(&q, &mut g).unwrap();

        g.remove_edge(&(k(5), k(2))).unwrap();
        let mut q = UpdateQuadruple::new();
        q.add_e_minus(edge);
        level.update(&q, &mut g).unwrap();

        assert_eq!(level.state.dec_graph.complete_decontraction(), g);
        assert_eq!(
            level.state.dec_graph.order(),
            before.order()
        );
        assert_eq!(level.state.dec_graph.edge_count(), before.edge_count());
    }
}
