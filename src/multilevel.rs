//! The multilevel graph façade.
//!
//! A [`MultilevelGraph`] owns the base decontractible graph (the natural
//! transformation of the caller's directed graph) and the stack of bound
//! contraction schemes. Base edits validate against the base graph, journal
//! into the level-0 quadruple and invalidate the stack; levels are built
//! and updated lazily when queried, each consuming the quadruple of the
//! level below and emitting its own.
//!
//! Two read paths exist: [`MultilevelGraph::graph_view`] hands out a
//! reference to the working graph of a level (interiors authoritative one
//! level down), while [`MultilevelGraph::get_graph`] returns a deep
//! structural copy with every interior rebuilt recursively from the
//! authoritative levels, suitable for navigation all the way to the base.

use crate::attrs::{Attributes, EdgeKey, Key};
use crate::dec_graph::{DecGraph, Superedge, Supernode};
use crate::error::{DecError, DecResult};
use crate::schemes::{ComponentSet, ContractionScheme, Level};
use crate::schemes::quadruple::UpdateQuadruple;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A hierarchy of graph contractions over a directed base graph.
pub struct MultilevelGraph {
    base: DecGraph,
    base_quadruple: UpdateQuadruple,
    levels: Vec<Level>,
}

impl MultilevelGraph {
    /// Creates a hierarchy over the given plain directed graph, with no
    /// schemes bound yet.
    pub fn new<K: Into<Key>>(
        nodes: impl IntoIterator<Item = (K, Attributes)>,
        edges: impl IntoIterator<Item = (K, K, Attributes)>,
    ) -> DecResult<Self> {
        Ok(Self {
            base: Self::natural_transformation(nodes, edges)?,
            base_quadruple: UpdateQuadruple::new(),
            levels: Vec::new(),
        })
    }

    /// Creates a hierarchy and binds the given schemes bottom-up. Nothing
    /// is built until a level is queried.
    pub fn with_schemes<K: Into<Key>>(
        nodes: impl IntoIterator<Item = (K, Attributes)>,
        edges: impl IntoIterator<Item = (K, K, Attributes)>,
        schemes: Vec<Box<dyn ContractionScheme>>,
    ) -> DecResult<Self> {
        let mut ml = Self::new(nodes, edges)?;
        for scheme in schemes {
            ml.append_contraction_scheme(scheme)?;
        }
        Ok(ml)
    }

    /// Wraps a plain directed graph as a level-0 decontractible graph:
    /// every node becomes a supernode with an empty interior, every edge a
    /// superedge with an empty aggregation set. Duplicate keys and edges
    /// are rejected.
    pub fn natural_transformation<K: Into<Key>>(
        nodes: impl IntoIterator<Item = (K, Attributes)>,
        edges: impl IntoIterator<Item = (K, K, Attributes)>,
    ) -> DecResult<DecGraph> {
        let mut base = DecGraph::new(0);
        for (key, attr) in nodes {
            base.add_node(Supernode::new(key, 0).with_attr(attr))?;
        }
        for (tail, head, attr) in edges {
            base.add_edge(Superedge::new(tail, head, 0).with_attr(attr))?;
        }
        Ok(base)
    }

    /// Number of contraction schemes; level indices run 0..=height.
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Binds a scheme on top of the stack. The scheme is cloned into a
    /// stateless instance; building is lazy.
    pub fn append_contraction_scheme(
        &mut self,
        scheme: Box<dyn ContractionScheme>,
    ) -> DecResult<()> {
        if let Some(broken) = self
            .levels
            .iter()
            .position(|l| l.state.needs_rebuild())
        {
            return Err(DecError::SchemeComposition(format!(
                "cannot append onto a stack whose level {} needs a rebuild",
                broken + 1
            )));
        }
        let level = self.levels.len() + 1;
        self.levels.push(Level::new(scheme.clone_scheme(), level));
        Ok(())
    }

    /// Adds a base node. The key must be fresh.
    pub fn add_node(&mut self, key: impl Into<Key>, attr: Attributes) -> DecResult<()> {
        let key = key.into();
        if self.base.contains_node(&key) {
            return Err(DecError::DuplicateNode(key));
        }
        let node = Supernode::new(key, 0).with_attr(attr);
        self.base_quadruple.add_v_plus(node.shallow_copy());
        self.base.add_node(node)?;
        self.invalidate_all();
        Ok(())
    }

    /// Removes a base node together with its incident edges; the edge
    /// removals are journalled first so every level sees them before the
    /// node removal.
    pub fn remove_node(&mut self, key: impl Into<Key>) -> DecResult<()> {
        let key = key.into();
        if !self.base.contains_node(&key) {
            return Err(DecError::MissingNode(key));
        }
        for ekey in self.base.incident_edge_keys(&key) {
            let removed = self.base.remove_edge(&ekey)?;
            self.base_quadruple.add_e_minus(removed);
        }
        let copy = self
            .base
            .node(&key)
            .ok_or_else(|| DecError::MissingNode(key.clone()))?
            .shallow_copy();
        self.base.remove_node(&key)?;
        self.base_quadruple.add_v_minus(copy);
        self.invalidate_all();
        Ok(())
    }

    /// Adds a base edge; missing endpoints are created as attribute-less
    /// nodes. A duplicate (tail, head) pair is rejected: the base graph
    /// admits at most one edge per ordered pair.
    pub fn add_edge(
        &mut self,
        tail: impl Into<Key>,
        head: impl Into<Key>,
        attr: Attributes,
    ) -> DecResult<()> {
        let tail = tail.into();
        let head = head.into();
        if !self.base.contains_node(&tail) {
            self.add_node(tail.clone(), Attributes::new())?;
        }
        if !self.base.contains_node(&head) {
            self.add_node(head.clone(), Attributes::new())?;
        }
        if self.base.contains_edge(&(tail.clone(), head.clone())) {
            return Err(DecError::DuplicateEdge(tail, head));
        }
        let edge = Superedge::new(tail, head, 0).with_attr(attr);
        self.base_quadruple.add_e_plus(edge.clone());
        self.base.add_edge(edge)?;
        self.invalidate_all();
        Ok(())
    }

    /// Removes a base edge.
    pub fn remove_edge(&mut self, tail: impl Into<Key>, head: impl Into<Key>) -> DecResult<()> {
        let key = (tail.into(), head.into());
        if !self.base.contains_edge(&key) {
            return Err(DecError::MissingEdge(key.0, key.1));
        }
        let removed = self.base.remove_edge(&key)?;
        self.base_quadruple.add_e_minus(removed);
        self.invalidate_all();
        Ok(())
    }

    /// Merges a plain directed graph into the base; nodes and edges
    /// already present are left alone.
    pub fn merge_graph<K: Into<Key>>(
        &mut self,
        nodes: impl IntoIterator<Item = (K, Attributes)>,
        edges: impl IntoIterator<Item = (K, K, Attributes)>,
    ) -> DecResult<()> {
        for (key, attr) in nodes {
            let key = key.into();
            if !self.base.contains_node(&key) {
                self.add_node(key, attr)?;
            }
        }
        for (tail, head, attr) in edges {
            let (tail, head) = (tail.into(), head.into());
            if !self.base.contains_edge(&(tail.clone(), head.clone())) {
                self.add_edge(tail, head, attr)?;
            }
        }
        Ok(())
    }

    fn invalidate_all(&mut self) {
        for level in &mut self.levels {
            level.state.invalidate();
        }
    }

    /// Forces propagation of buffered edits through schemes 1..=`upper`.
    pub fn build_to(&mut self, upper: usize) -> DecResult<()> {
        let upper = upper.min(self.levels.len());
        for i in 0..upper {
            if self.levels[i].state.needs_rebuild() {
                return Err(DecError::NeedsRebuild(i + 1));
            }
            if i == 0 {
                let has_input = self.base_quadruple.has_updates();
                let level = &mut self.levels[0];
                if !level.state.built() {
                    level.contract(&mut self.base)?;
                    self.base_quadruple.clear();
                } else if has_input || !level.state.is_valid() {
                    let quadruple = std::mem::take(&mut self.base_quadruple);
                    level.update(&quadruple, &mut self.base)?;
                }
            } else {
                let (left, right) = self.levels.split_at_mut(i);
                let prev = &mut left[i - 1];
                let cur = &mut right[0];
                if !cur.state.built() {
                    cur.contract(&mut prev.state.dec_graph)?;
                    prev.state.quadruple.clear();
                } else if prev.state.quadruple.has_updates() || !cur.state.is_valid() {
                    let quadruple = std::mem::take(&mut prev.state.quadruple);
                    cur.update(&quadruple, &mut prev.state.dec_graph)?;
                }
            }
        }
        Ok(())
    }

    /// Reference to the working graph of a level, after forcing
    /// propagation up to it. Interiors are authoritative one level down
    /// only; use [`Self::get_graph`] for deep navigation.
    pub fn graph_view(&mut self, level: usize) -> DecResult<&DecGraph> {
        if level > self.height() {
            return Err(DecError::LevelOutOfRange(level));
        }
        self.build_to(level)?;
        Ok(if level == 0 {
            &self.base
        } else {
            &self.levels[level - 1].state.dec_graph
        })
    }

    /// Deep structural copy of a level's graph with every interior rebuilt
    /// recursively from the authoritative levels, navigable down to the
    /// base.
    pub fn get_graph(&mut self, level: usize) -> DecResult<DecGraph> {
        if level > self.height() {
            return Err(DecError::LevelOutOfRange(level));
        }
        self.build_to(level)?;
        Ok(self.materialized(level))
    }

    fn materialized(&self, level: usize) -> DecGraph {
        if level == 0 {
            return self.base.clone();
        }
        let lower = self.materialized(level - 1);
        let mut graph = self.levels[level - 1].state.dec_graph.clone();
        for key in graph.node_keys() {
            let (node_keys, edge_keys) = match graph.node(&key) {
                Some(node) => (
                    node.dec.node_keys().into_iter().collect::<BTreeSet<Key>>(),
                    node.dec
                        .edge_keys()
                        .into_iter()
                        .collect::<BTreeSet<EdgeKey>>(),
                ),
                None => continue,
            };
            let interior = lower.subgraph_from_keys(&node_keys, &edge_keys);
            if let Some(node) = graph.node_mut(&key) {
                node.dec = interior;
            }
        }
        for ekey in graph.edge_keys() {
            let dec_keys: Vec<EdgeKey> = match graph.edge(&ekey) {
                Some(edge) => edge.dec.keys().cloned().collect(),
                None => continue,
            };
            let refreshed: BTreeMap<EdgeKey, Superedge> = dec_keys
                .into_iter()
                .filter_map(|dk| lower.edge(&dk).map(|e| (dk.clone(), e.clone())))
                .collect();
            if let Some(edge) = graph.edge_mut(&ekey) {
                edge.dec = refreshed;
            }
        }
        graph
    }

    /// The component sets recognised by the scheme at the given level
    /// (1-based), covering the nodes of the level below.
    pub fn get_component_sets(&mut self, level: usize) -> DecResult<Vec<ComponentSet>> {
        if level == 0 || level > self.height() {
            return Err(DecError::LevelOutOfRange(level));
        }
        self.build_to(level)?;
        Ok(self.levels[level - 1]
            .state
            .comp_table
            .all_sets()
            .cloned()
            .collect())
    }

    /// Rebuilds a level from scratch out of the level below, recovering
    /// from a failed update. Every level above is invalidated and will be
    /// rebuilt lazily.
    pub fn rebuild(&mut self, level: usize) -> DecResult<()> {
        if level == 0 || level > self.height() {
            return Err(DecError::LevelOutOfRange(level));
        }
        debug!(level, "rebuilding level from scratch");
        for idx in (level - 1)..self.levels.len() {
            self.levels[idx].state.mark_unbuilt();
        }
        self.build_to(level)
    }
}
