//! Decontractible graphs: the recursive data model of the hierarchy.
//!
//! A decontractible graph is a directed graph whose nodes (*supernodes*) and
//! edges (*superedges*) carry an interior one level further down: a
//! supernode's `dec` is the decontractible graph it contracts, a superedge's
//! `dec` is the set of lower-level edges aggregated into it.
//!
//! Cross-level references are keys rather than shared pointers: a supernode
//! records the key of its containing supernode one level up, a superedge
//! records the keys of the edges it aggregates, and the component-set table
//! of the owning contraction scheme is the arena directory resolving
//! set ids to supernode keys. Each `DecGraph` exclusively owns its nodes and
//! edges; interiors hold member copies maintained by the owning scheme, and
//! only the first level below a graph is authoritative in them — the
//! multilevel façade rebuilds deeper structure when it hands out deep
//! copies.
//!
//! # Invariants
//! - Node keys are unique within one `DecGraph` (but not across levels: a
//!   node of key 1 may contain a node of key 1).
//! - Every superedge's endpoints are nodes of the same graph.
//! - Every edge key in a superedge's `dec` joins a member of the tail's
//!   interior to a member of the head's interior.
//! - Structural equality and hashing consider keys and interiors only;
//!   attribute bags are ignored.

pub mod algorithms;

use crate::attrs::{Attributes, EdgeKey, Key, SetId};
use crate::error::{DecError, DecResult};
use algorithms::Digraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// A node of a decontractible graph.
///
/// Fixed structural fields are plain members; user metadata lives in the
/// `attr` bag. `supernode` and `component_sets` describe this node's place
/// in the level above and are written by the scheme owning that level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supernode {
    /// Identity among siblings of the same graph.
    pub key: Key,
    /// Level of the graph this node belongs to (0 = base).
    pub level: usize,
    /// The decontractible graph this node contracts. Empty at the base.
    pub dec: DecGraph,
    /// Ids of the component sets one level up that contain this node.
    pub component_sets: BTreeSet<SetId>,
    /// Key of the home supernode one level up, if contracted.
    pub supernode: Option<Key>,
    /// User attributes.
    pub attr: Attributes,
}

impl Supernode {
    /// Creates a leaf supernode with an empty interior.
    pub fn new(key: impl Into<Key>, level: usize) -> Self {
        Self {
            key: key.into(),
            level,
            dec: DecGraph::new(level.saturating_sub(1)),
            component_sets: BTreeSet::new(),
            supernode: None,
            attr: Attributes::new(),
        }
    }

    /// Attaches an attribute bag.
    pub fn with_attr(mut self, attr: Attributes) -> Self {
        self.attr = attr;
        self
    }

    /// Copy of this node with an emptied interior. Used for journalling and
    /// for member entries whose interior is rebuilt on materialisation.
    pub fn shallow_copy(&self) -> Self {
        Self {
            key: self.key.clone(),
            level: self.level,
            dec: DecGraph::new(self.level.saturating_sub(1)),
            component_sets: self.component_sets.clone(),
            supernode: self.supernode.clone(),
            attr: self.attr.clone(),
        }
    }

    /// Number of nodes in the interior.
    pub fn order(&self) -> usize {
        self.dec.order()
    }

    /// Height of the hierarchy tree contracted into this node. A leaf has
    /// height 0.
    pub fn height(&self) -> usize {
        if self.dec.order() == 0 {
            0
        } else {
            self.dec.height() + 1
        }
    }

    /// Number of leaf supernodes this node represents.
    pub fn size(&self) -> usize {
        if self.dec.order() == 0 {
            1
        } else {
            self.dec.nodes().map(Supernode::size).sum()
        }
    }
}

impl PartialEq for Supernode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.level == other.level
    }
}

impl Eq for Supernode {}

impl Hash for Supernode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.level.hash(state);
    }
}

/// An edge of a decontractible graph.
///
/// `dec` maps the keys of the aggregated lower-level edges to copies of
/// those edges; the key set is authoritative, the copies carry endpoint and
/// attribute data for callers walking downward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Superedge {
    /// Key of the tail supernode.
    pub tail: Key,
    /// Key of the head supernode.
    pub head: Key,
    /// Level of the graph this edge belongs to.
    pub level: usize,
    /// Lower-level edges aggregated into this edge, keyed by their edge key.
    pub dec: BTreeMap<EdgeKey, Superedge>,
    /// User attributes.
    pub attr: Attributes,
}

impl Superedge {
    /// Creates an edge with an empty aggregation set.
    pub fn new(tail: impl Into<Key>, head: impl Into<Key>, level: usize) -> Self {
        Self {
            tail: tail.into(),
            head: head.into(),
            level,
            dec: BTreeMap::new(),
            attr: Attributes::new(),
        }
    }

    /// Attaches an attribute bag.
    pub fn with_attr(mut self, attr: Attributes) -> Self {
        self.attr = attr;
        self
    }

    /// The (tail, head) identity of this edge.
    pub fn key(&self) -> EdgeKey {
        (self.tail.clone(), self.head.clone())
    }

    /// True when this edge is a self-loop.
    pub fn is_loop(&self) -> bool {
        self.tail == self.head
    }

    /// Number of lower-level edges aggregated into this edge.
    pub fn size(&self) -> usize {
        self.dec.len()
    }
}

impl PartialEq for Superedge {
    fn eq(&self, other: &Self) -> bool {
        self.tail == other.tail && self.head == other.head && self.level == other.level
    }
}

impl Eq for Superedge {}

impl Hash for Superedge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tail.hash(state);
        self.head.hash(state);
        self.level.hash(state);
    }
}

/// One level of the hierarchy: a directed graph of supernodes and
/// superedges, keyed for deterministic iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecGraph {
    level: usize,
    nodes: BTreeMap<Key, Supernode>,
    edges: BTreeMap<EdgeKey, Superedge>,
}

impl DecGraph {
    /// Creates an empty graph at the given level.
    pub fn new(level: usize) -> Self {
        Self {
            level,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Level of this graph in its hierarchy (0 = base).
    pub fn level(&self) -> usize {
        self.level
    }

    /// Number of nodes.
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by key.
    pub fn node(&self, key: &Key) -> Option<&Supernode> {
        self.nodes.get(key)
    }

    /// Mutable lookup of a node by key.
    pub fn node_mut(&mut self, key: &Key) -> Option<&mut Supernode> {
        self.nodes.get_mut(key)
    }

    /// Looks up an edge by (tail, head).
    pub fn edge(&self, key: &EdgeKey) -> Option<&Superedge> {
        self.edges.get(key)
    }

    /// Mutable lookup of an edge by (tail, head).
    pub fn edge_mut(&mut self, key: &EdgeKey) -> Option<&mut Superedge> {
        self.edges.get_mut(key)
    }

    /// True when a node with this key exists.
    pub fn contains_node(&self, key: &Key) -> bool {
        self.nodes.contains_key(key)
    }

    /// True when an edge with this (tail, head) exists.
    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    /// Iterates nodes in ascending key order.
    pub fn nodes(&self) -> impl Iterator<Item = &Supernode> {
        self.nodes.values()
    }

    /// Iterates edges in ascending (tail, head) order.
    pub fn edges(&self) -> impl Iterator<Item = &Superedge> {
        self.edges.values()
    }

    /// Keys of all nodes, ascending.
    pub fn node_keys(&self) -> Vec<Key> {
        self.nodes.keys().cloned().collect()
    }

    /// Keys of all edges, ascending.
    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edges.keys().cloned().collect()
    }

    /// Adds a node. The key must not already be present and the node's
    /// level must match the graph's.
    pub fn add_node(&mut self, node: Supernode) -> DecResult<()> {
        if node.level != self.level {
            return Err(DecError::Invariant(format!(
                "node {} has level {}, graph has level {}",
                node.key, node.level, self.level
            )));
        }
        if self.nodes.contains_key(&node.key) {
            return Err(DecError::DuplicateNode(node.key));
        }
        self.nodes.insert(node.key.clone(), node);
        Ok(())
    }

    /// Removes a node. The caller must have removed its incident edges
    /// first.
    pub fn remove_node(&mut self, key: &Key) -> DecResult<Supernode> {
        if !self.nodes.contains_key(key) {
            return Err(DecError::MissingNode(key.clone()));
        }
        if self.edges.keys().any(|(t, h)| t == key || h == key) {
            return Err(DecError::NodeHasIncidentEdges(key.clone()));
        }
        self.nodes
            .remove(key)
            .ok_or_else(|| DecError::MissingNode(key.clone()))
    }

    /// Removes a node together with its incident edges, if present.
    pub fn take_node(&mut self, key: &Key) -> Option<Supernode> {
        let incident: Vec<EdgeKey> = self.incident_edge_keys(key);
        for ekey in incident {
            self.edges.remove(&ekey);
        }
        self.nodes.remove(key)
    }

    /// Adds an edge. Both endpoints must be present and the (tail, head)
    /// pair must not already exist.
    pub fn add_edge(&mut self, edge: Superedge) -> DecResult<()> {
        if !self.nodes.contains_key(&edge.tail) {
            return Err(DecError::MissingNode(edge.tail.clone()));
        }
        if !self.nodes.contains_key(&edge.head) {
            return Err(DecError::MissingNode(edge.head.clone()));
        }
        let key = edge.key();
        if self.edges.contains_key(&key) {
            return Err(DecError::DuplicateEdge(key.0, key.1));
        }
        self.edges.insert(key, edge);
        Ok(())
    }

    /// Removes an edge by (tail, head).
    pub fn remove_edge(&mut self, key: &EdgeKey) -> DecResult<Superedge> {
        self.edges
            .remove(key)
            .ok_or_else(|| DecError::MissingEdge(key.0.clone(), key.1.clone()))
    }

    /// Removes an edge if it exists; no-op otherwise.
    pub fn discard_edge(&mut self, key: &EdgeKey) -> Option<Superedge> {
        self.edges.remove(key)
    }

    /// Keys of all edges incident to the given node.
    pub fn incident_edge_keys(&self, key: &Key) -> Vec<EdgeKey> {
        self.edges
            .keys()
            .filter(|(t, h)| t == key || h == key)
            .cloned()
            .collect()
    }

    /// Successor keys of a node.
    pub fn forward_star(&self, key: &Key) -> BTreeSet<Key> {
        self.edges
            .keys()
            .filter(|(t, _)| t == key)
            .map(|(_, h)| h.clone())
            .collect()
    }

    /// Predecessor keys of a node.
    pub fn reverse_star(&self, key: &Key) -> BTreeSet<Key> {
        self.edges
            .keys()
            .filter(|(_, h)| h == key)
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Edges leaving a node.
    pub fn out_edges(&self, key: &Key) -> Vec<&Superedge> {
        self.edges
            .iter()
            .filter(|((t, _), _)| t == key)
            .map(|(_, e)| e)
            .collect()
    }

    /// Edges entering a node.
    pub fn in_edges(&self, key: &Key) -> Vec<&Superedge> {
        self.edges
            .iter()
            .filter(|((_, h), _)| h == key)
            .map(|(_, e)| e)
            .collect()
    }

    /// Number of incident edges; a self-loop counts twice.
    pub fn degree(&self, key: &Key) -> usize {
        self.edges
            .keys()
            .map(|(t, h)| (t == key) as usize + (h == key) as usize)
            .sum()
    }

    /// Height of the hierarchy recorded in the interiors: 0 for a flat
    /// graph, one more than the deepest interior otherwise.
    pub fn height(&self) -> usize {
        self.nodes.values().map(Supernode::height).max().unwrap_or(0)
    }

    /// Plain directed snapshot of this level: keys, attributes and
    /// adjacency, without interior structure. Algorithms run on this.
    pub fn graph(&self) -> Digraph {
        let mut g = Digraph::new();
        for node in self.nodes.values() {
            g.add_node(node.key.clone(), node.attr.clone());
        }
        for key in self.edges.keys() {
            g.add_edge(key.0.clone(), key.1.clone());
        }
        g
    }

    /// Expands every supernode and superedge into the structure one level
    /// down: the union of the interiors plus the aggregated cross edges.
    /// Repeated application reaches the leaf level. Pure.
    pub fn complete_decontraction(&self) -> DecGraph {
        let mut out = DecGraph::new(self.level.saturating_sub(1));
        for node in self.nodes.values() {
            for (key, member) in &node.dec.nodes {
                out.nodes
                    .entry(key.clone())
                    .or_insert_with(|| member.clone());
            }
        }
        for node in self.nodes.values() {
            for (ekey, edge) in &node.dec.edges {
                out.edges
                    .entry(ekey.clone())
                    .or_insert_with(|| edge.clone());
            }
        }
        for superedge in self.edges.values() {
            for (ekey, edge) in &superedge.dec {
                out.edges
                    .entry(ekey.clone())
                    .or_insert_with(|| edge.clone());
            }
        }
        out
    }

    /// Subgraph induced by the given node keys: those nodes plus every edge
    /// with both endpoints among them. Keys absent from the graph are
    /// ignored.
    pub fn induced_subgraph(&self, keys: &BTreeSet<Key>) -> DecGraph {
        let mut out = DecGraph::new(self.level);
        for (key, node) in &self.nodes {
            if keys.contains(key) {
                out.nodes.insert(key.clone(), node.clone());
            }
        }
        for (ekey, edge) in &self.edges {
            if keys.contains(&ekey.0) && keys.contains(&ekey.1) {
                out.edges.insert(ekey.clone(), edge.clone());
            }
        }
        out
    }

    /// Clones the listed nodes and edges out of this graph. Used when
    /// rebuilding an interior from an authoritative lower level.
    pub fn subgraph_from_keys(
        &self,
        node_keys: &BTreeSet<Key>,
        edge_keys: &BTreeSet<EdgeKey>,
    ) -> DecGraph {
        let mut out = DecGraph::new(self.level);
        for key in node_keys {
            if let Some(node) = self.nodes.get(key) {
                out.nodes.insert(key.clone(), node.clone());
            }
        }
        for ekey in edge_keys {
            if let Some(edge) = self.edges.get(ekey) {
                out.edges.insert(ekey.clone(), edge.clone());
            }
        }
        out
    }
}

/// Structural equality: same node keys with structurally equal interiors,
/// same edge keys with equal aggregation key sets. Attributes and levels of
/// the graphs themselves are ignored.
impl PartialEq for DecGraph {
    fn eq(&self, other: &Self) -> bool {
        if self.nodes.len() != other.nodes.len() || self.edges.len() != other.edges.len() {
            return false;
        }
        for (key, node) in &self.nodes {
            match other.nodes.get(key) {
                Some(theirs) if theirs.dec == node.dec => {}
                _ => return false,
            }
        }
        for (ekey, edge) in &self.edges {
            match other.edges.get(ekey) {
                Some(theirs) if theirs.dec.keys().eq(edge.dec.keys()) => {}
                _ => return false,
            }
        }
        true
    }
}

impl Eq for DecGraph {}

impl Hash for DecGraph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (key, node) in &self.nodes {
            key.hash(state);
            node.dec.hash(state);
        }
        0xEDu8.hash(state);
        for (ekey, edge) in &self.edges {
            ekey.hash(state);
            for dkey in edge.dec.keys() {
                dkey.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::attr;

    fn flat_graph() -> DecGraph {
        let mut g = DecGraph::new(0);
        for k in 1..=3 {
            g.add_node(Supernode::new(k, 0).with_attr(attr("weight", 10 * k))).unwrap();
        }
        g.add_edge(Superedge::new(1, 2, 0)).unwrap();
        g.add_edge(Superedge::new(2, 3, 0)).unwrap();
        g
    }

    #[test]
    fn add_and_remove_respect_preconditions() {
        let mut g = flat_graph();
        assert_eq!(
            g.add_node(Supernode::new(1, 0)),
            Err(DecError::DuplicateNode(Key::Int(1)))
        );
        assert_eq!(
            g.add_edge(Superedge::new(1, 2, 0)),
            Err(DecError::DuplicateEdge(Key::Int(1), Key::Int(2)))
        );
        assert_eq!(
            g.add_edge(Superedge::new(1, 9, 0)),
            Err(DecError::MissingNode(Key::Int(9)))
        );
        assert_eq!(
            g.remove_node(&Key::Int(2)),
            Err(DecError::NodeHasIncidentEdges(Key::Int(2)))
        );
        g.remove_edge(&(Key::Int(1), Key::Int(2))).unwrap();
        g.remove_edge(&(Key::Int(2), Key::Int(3))).unwrap();
        assert!(g.remove_node(&Key::Int(2)).is_ok());
        assert_eq!(
            g.remove_node(&Key::Int(2)),
            Err(DecError::MissingNode(Key::Int(2)))
        );
    }

    #[test]
    fn take_node_drains_incident_edges() {
        let mut g = flat_graph();
        assert!(g.take_node(&Key::Int(2)).is_some());
        assert_eq!(g.order(), 2);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn stars_and_degree() {
        let mut g = flat_graph();
        g.add_edge(Superedge::new(3, 1, 0)).unwrap();
        assert_eq!(g.forward_star(&Key::Int(1)), BTreeSet::from([Key::Int(2)]));
        assert_eq!(g.reverse_star(&Key::Int(1)), BTreeSet::from([Key::Int(3)]));
        assert_eq!(g.degree(&Key::Int(1)), 2);
        assert_eq!(g.out_edges(&Key::Int(2)).len(), 1);
        assert_eq!(g.in_edges(&Key::Int(2)).len(), 1);
    }

    #[test]
    fn structural_equality_ignores_attributes() {
        let a = flat_graph();
        let mut b = flat_graph();
        b.node_mut(&Key::Int(1)).unwrap().attr = attr("weight", 999);
        assert_eq!(a, b);
        b.add_node(Supernode::new(4, 0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn complete_decontraction_of_flat_graph_is_empty() {
        let g = flat_graph();
        let dec = g.complete_decontraction();
        assert_eq!(dec.order(), 0);
        assert_eq!(dec.edge_count(), 0);
    }

    #[test]
    fn complete_decontraction_expands_interiors() {
        // One supernode holding {1, 2} with the edge (1, 2), one holding
        // {3}, and a superedge aggregating (2, 3).
        let lower = flat_graph();
        let mut upper = DecGraph::new(1);
        let mut a = Supernode::new(10, 1);
        a.dec
            .add_node(lower.node(&Key::Int(1)).unwrap().clone())
            .unwrap();
        a.dec
            .add_node(lower.node(&Key::Int(2)).unwrap().clone())
            .unwrap();
        a.dec
            .add_edge(lower.edge(&(Key::Int(1), Key::Int(2))).unwrap().clone())
            .unwrap();
        let mut b = Supernode::new(11, 1);
        b.dec
            .add_node(lower.node(&Key::Int(3)).unwrap().clone())
            .unwrap();
        upper.add_node(a).unwrap();
        upper.add_node(b).unwrap();
        let mut cross = Superedge::new(10, 11, 1);
        let lower_edge = lower.edge(&(Key::Int(2), Key::Int(3))).unwrap().clone();
        cross.dec.insert(lower_edge.key(), lower_edge);
        upper.add_edge(cross).unwrap();

        assert_eq!(upper.complete_decontraction(), lower);
        assert_eq!(upper.height(), 1);
        assert_eq!(upper.node(&Key::Int(10)).unwrap().size(), 2);
    }

    #[test]
    fn induced_subgraph_keeps_internal_edges_only() {
        let g = flat_graph();
        let sub = g.induced_subgraph(&BTreeSet::from([Key::Int(1), Key::Int(2)]));
        assert_eq!(sub.order(), 2);
        assert_eq!(sub.edge_count(), 1);
        assert!(sub.contains_edge(&(Key::Int(1), Key::Int(2))));
    }
}
