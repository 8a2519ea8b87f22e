//! Contraction by maximal cliques.
//!
//! One component set per maximal clique of the symmetrised lower level,
//! where two nodes are adjacent either when edges exist in both directions
//! (`reciprocal`) or in at least one. Bron–Kerbosch emits singleton cliques
//! for isolated nodes, so the covering needs no extra singleton sweep.
//!
//! Incremental maintenance recomputes locally: a maximal clique containing
//! a node is maximal within that node's closed neighbourhood and vice
//! versa, so after an edge change it suffices to re-derive the maximal
//! cliques through each endpoint over its closed neighbourhood and swap out
//! the endpoint's sets. This keeps the incremental state equal to a full
//! recomputation, at the price of a neighbourhood-sized Bron–Kerbosch per
//! edge event.

use crate::attrs::{Key, SetId};
use crate::dec_graph::algorithms::{maximal_cliques, maximal_cliques_in};
use crate::dec_graph::{DecGraph, Superedge};
use crate::error::DecResult;
use crate::schemes::{
    CompTable, ComponentSet, ContractionScheme, LevelState, SchemeConfig,
};
use std::collections::{BTreeMap, BTreeSet};

/// The maximal-cliques contraction scheme.
#[derive(Clone)]
pub struct CliquesScheme {
    config: SchemeConfig,
    reciprocal: bool,
}

impl CliquesScheme {
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

    /// Maximal cliques through `node`, computed over its closed
    /// neighbourhood in the symmetrised lower graph.
    fn local_cliques(&self, lower: &DecGraph, node: &Key) -> Vec<BTreeSet<Key>> {
        let adj = lower.graph().undirected_adjacency(self.reciprocal);
        let mut region: BTreeSet<Key> = adj.get(node).cloned().unwrap_or_default();
        region.insert(node.clone());
        let sub: BTreeMap<Key, BTreeSet<Key>> = region
            .iter()
            .map(|k| {
                let nb = adj
                    .get(k)
                    .map(|nb| nb.intersection(&region).cloned().collect())
                    .unwrap_or_default();
                (k.clone(), nb)
            })
            .collect();
        maximal_cliques_in(&sub)
            .into_iter()
            .filter(|clique| clique.contains(node))
            .collect()
    }

    /// Replaces the clique sets around the changed edge's endpoints with
    /// the recomputed ones, leaving untouched sets (and their ids) alone.
    fn refresh_around(
        &self,
        state: &mut LevelState,
        lower: &DecGraph,
        endpoints: [&Key; 2],
    ) -> DecResult<()> {
        let mut fresh: BTreeSet<BTreeSet<Key>> = BTreeSet::new();
        for node in endpoints {
            if lower.contains_node(node) {
                fresh.extend(self.local_cliques(lower, node));
            }
        }
        let stale: BTreeSet<SetId> = endpoints
            .iter()
            .flat_map(|n| state.comp_table.sets_of(*n))
            .collect();
        for id in stale {
            let keep = state
                .comp_table
                .get(id)
                .map(|c| fresh.contains(c.members()))
                .unwrap_or(false);
            if !keep {
                state.comp_table.remove_set(id);
            }
        }
        for members in fresh {
            let tracked = state
                .comp_table
                .common_sets(&members)
                .iter()
                .any(|id| {
                    state
                        .comp_table
                        .get(*id)
                        .map(|c| c.len() == members.len())
                        .unwrap_or(false)
                });
            if !tracked {
                let attr = state.c_set_attrs(lower, &members);
                let id = state.fresh_id();
                state
                    .comp_table
                    .add_set(ComponentSet::new(id, members, attr), false);
            }
        }
        // a removed endpoint is not recomputed and may be left uncovered
        state.cover_singletons();
        Ok(())
    }
}

impl ContractionScheme for CliquesScheme {
    fn contraction_name(&self) -> String {
        format!(
            "cliques_{}rec",
            if self.reciprocal { "" } else { "not_" }
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
        let mut table = CompTable::new();
        for clique in maximal_cliques(&snapshot, self.reciprocal) {
            let attr = state.c_set_attrs(lower, &clique);
            let id = state.fresh_id();
            table.add_set(ComponentSet::new(id, clique, attr), false);
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
        self.refresh_around(state, lower, [&edge.tail, &edge.head])?;
        state.update_graph(lower)
    }

    fn on_removed_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()> {
        state.place_removed_edge(edge)?;
        self.refresh_around(state, lower, [&edge.tail, &edge.head])?;
        state.update_graph(lower)
    }
}
