//! Contraction by stars.
//!
//! A star groups a centre with the nodes whose only adjacent node it is;
//! nodes adjacent to more than one neighbour stay out. One component set
//! per star, singletons for everything else — the scheme exists mostly as
//! the simplest exercise of the cover-uncovered-nodes-as-singletons
//! pattern.
//!
//! Edge events recompute star membership locally: the sets touching the
//! endpoints' neighbourhood are dropped, stars are re-derived over that
//! region against full adjacency, and the leftovers are re-covered as
//! singletons.

use crate::attrs::Key;
use crate::dec_graph::{DecGraph, Superedge};
use crate::error::DecResult;
use crate::schemes::{
    CompTable, ComponentSet, ContractionScheme, LevelState, SchemeConfig,
};
use std::collections::{BTreeMap, BTreeSet};

/// The stars contraction scheme.
#[derive(Clone)]
pub struct StarsScheme {
    config: SchemeConfig,
    reciprocal: bool,
}

impl StarsScheme {
    /// Creates the scheme. With `reciprocal`, adjacency requires edges in
    /// both directions.
    pub fn new(reciprocal: bool) -> Self {
        Self {
            config: SchemeConfig::new(),
            reciprocal,
        }
    }

    /// Creates the scheme with the given attribute functions.
    pub fn with_config(config: SchemeConfig, reciprocal: bool) -> Self {
        Self { config, reciprocal }
    }

    /// The node's single adjacent node under the scheme's adjacency rule,
    /// if it has exactly one (ignoring self-loops).
    fn adjacent_node(&self, lower: &DecGraph, key: &Key) -> Option<Key> {
        let outgoing = lower.forward_star(key);
        let incoming = lower.reverse_star(key);
        let mut adjacent: BTreeSet<Key> = if self.reciprocal {
            outgoing.intersection(&incoming).cloned().collect()
        } else {
            outgoing.union(&incoming).cloned().collect()
        };
        adjacent.remove(key);
        if adjacent.len() == 1 {
            adjacent.into_iter().next()
        } else {
            None
        }
    }

    /// Star sets among the given candidate nodes, evaluated against the
    /// full lower graph: centre → centre plus its satellites.
    fn star_sets(&self, lower: &DecGraph, candidates: &BTreeSet<Key>) -> Vec<BTreeSet<Key>> {
        let mut stars: BTreeMap<Key, BTreeSet<Key>> = BTreeMap::new();
        for key in candidates {
            if !lower.contains_node(key) || stars.contains_key(key) {
                continue;
            }
            if let Some(centre) = self.adjacent_node(lower, key) {
                stars
                    .entry(centre.clone())
                    .or_insert_with(|| BTreeSet::from([centre.clone()]))
                    .insert(key.clone());
            }
        }
        stars.into_values().collect()
    }

    /// Drops the sets touching the endpoints' neighbourhood, re-derives
    /// stars there and re-covers leftovers as singletons.
    fn recompute_local(
        &self,
        state: &mut LevelState,
        lower: &DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        let mut region: BTreeSet<Key> = BTreeSet::new();
        for key in [&edge.tail, &edge.head] {
            region.insert(key.clone());
            if lower.contains_node(key) {
                region.extend(lower.forward_star(key));
                region.extend(lower.reverse_star(key));
            }
        }
        let touched: BTreeSet<_> = region
            .iter()
            .flat_map(|k| state.comp_table.sets_of(k))
            .collect();
        for id in touched {
            if let Some(c_set) = state.comp_table.remove_set(id) {
                region.extend(c_set.members().iter().cloned());
            }
        }
        for members in self.star_sets(lower, &region) {
            let attr = state.c_set_attrs(lower, &members);
            let id = state.fresh_id();
            state
                .comp_table
                .add_set(ComponentSet::new(id, members, attr), false);
        }
        state.cover_singletons();
        Ok(())
    }
}

impl ContractionScheme for StarsScheme {
    fn contraction_name(&self) -> String {
        format!("stars_{}rec", if self.reciprocal { "" } else { "not_" })
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
        let candidates: BTreeSet<Key> = lower.node_keys().into_iter().collect();
        let mut table = CompTable::new();
        for members in self.star_sets(lower, &candidates) {
            let attr = state.c_set_attrs(lower, &members);
            let id = state.fresh_id();
            table.add_set(ComponentSet::new(id, members, attr), false);
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

    fn on_added_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        state.place_added_edge(edge)?;
        self.recompute_local(state, lower, edge)?;
        state.update_graph(lower)
    }

    fn on_removed_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        state.place_removed_edge(edge)?;
        self.recompute_local(state, lower, edge)?;
        state.update_graph(lower)
    }
}
