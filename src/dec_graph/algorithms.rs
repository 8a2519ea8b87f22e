//! Graph algorithms over plain directed snapshots.
//!
//! Contraction schemes never run algorithms on the decontractible structure
//! itself; they take a [`Digraph`] snapshot via [`DecGraph::graph`] and work
//! on keys. Every function here is deterministic: vertices are processed in
//! ascending key order and outputs are ordered by their smallest member.
//!
//! Algorithm choices follow the standard literature: Tarjan for strongly
//! connected components, Johnson for elementary circuit enumeration, and
//! Bron–Kerbosch with pivoting for maximal cliques on the symmetrised
//! graph.
//!
//! [`DecGraph::graph`]: super::DecGraph::graph

use crate::attrs::{Attributes, Key};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A plain directed graph over keys: attributes plus forward and reverse
/// adjacency. Self-loops are allowed; parallel edges are not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Digraph {
    nodes: BTreeMap<Key, Attributes>,
    succ: BTreeMap<Key, BTreeSet<Key>>,
    pred: BTreeMap<Key, BTreeSet<Key>>,
}

impl Digraph {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with its attributes, replacing any previous entry.
    pub fn add_node(&mut self, key: Key, attr: Attributes) {
        self.succ.entry(key.clone()).or_default();
        self.pred.entry(key.clone()).or_default();
        self.nodes.insert(key, attr);
    }

    /// Adds an edge; endpoints are created as attribute-less nodes when
    /// absent.
    pub fn add_edge(&mut self, tail: Key, head: Key) {
        if !self.nodes.contains_key(&tail) {
            self.add_node(tail.clone(), Attributes::new());
        }
        if !self.nodes.contains_key(&head) {
            self.add_node(head.clone(), Attributes::new());
        }
        self.succ.entry(tail.clone()).or_default().insert(head.clone());
        self.pred.entry(head).or_default().insert(tail);
    }

    /// Removes an edge if present.
    pub fn remove_edge(&mut self, tail: &Key, head: &Key) {
        if let Some(s) = self.succ.get_mut(tail) {
            s.remove(head);
        }
        if let Some(p) = self.pred.get_mut(head) {
            p.remove(tail);
        }
    }

    /// Number of nodes.
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// True when the node exists.
    pub fn contains_node(&self, key: &Key) -> bool {
        self.nodes.contains_key(key)
    }

    /// True when the edge exists.
    pub fn contains_edge(&self, tail: &Key, head: &Key) -> bool {
        self.succ.get(tail).is_some_and(|s| s.contains(head))
    }

    /// Node keys in ascending order.
    pub fn node_keys(&self) -> impl Iterator<Item = &Key> {
        self.nodes.keys()
    }

    /// Attributes of a node.
    pub fn attr(&self, key: &Key) -> Option<&Attributes> {
        self.nodes.get(key)
    }

    /// Successors of a node in ascending order.
    pub fn successors(&self, key: &Key) -> impl Iterator<Item = &Key> {
        self.succ.get(key).into_iter().flatten()
    }

    /// Predecessors of a node in ascending order.
    pub fn predecessors(&self, key: &Key) -> impl Iterator<Item = &Key> {
        self.pred.get(key).into_iter().flatten()
    }

    /// Subgraph induced by the given keys.
    pub fn induced(&self, keys: &BTreeSet<Key>) -> Digraph {
        let mut out = Digraph::new();
        for (key, attr) in &self.nodes {
            if keys.contains(key) {
                out.add_node(key.clone(), attr.clone());
            }
        }
        for (tail, heads) in &self.succ {
            if !keys.contains(tail) {
                continue;
            }
            for head in heads {
                if keys.contains(head) {
                    out.add_edge(tail.clone(), head.clone());
                }
            }
        }
        out
    }

    /// Undirected neighbour map, excluding self-loops. With `reciprocal`,
    /// two nodes are neighbours only when edges exist in both directions;
    /// otherwise one direction suffices.
    pub fn undirected_adjacency(&self, reciprocal: bool) -> BTreeMap<Key, BTreeSet<Key>> {
        let mut adj: BTreeMap<Key, BTreeSet<Key>> = BTreeMap::new();
        for key in self.nodes.keys() {
            adj.entry(key.clone()).or_default();
        }
        for (tail, heads) in &self.succ {
            for head in heads {
                if tail == head {
                    continue;
                }
                if reciprocal && !self.contains_edge(head, tail) {
                    continue;
                }
                adj.entry(tail.clone()).or_default().insert(head.clone());
                adj.entry(head.clone()).or_default().insert(tail.clone());
            }
        }
        adj
    }
}

/// Indexed view used internally: keys mapped to `0..n` with sorted
/// adjacency vectors.
struct Indexed<'a> {
    keys: Vec<&'a Key>,
    adj: Vec<Vec<usize>>,
}

impl<'a> Indexed<'a> {
    fn new(g: &'a Digraph) -> Self {
        let keys: Vec<&Key> = g.node_keys().collect();
        let pos: BTreeMap<&Key, usize> = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        let adj = keys
            .iter()
            .map(|&k| g.successors(k).map(|s| pos[s]).collect())
            .collect();
        Self { keys, adj }
    }
}

/// Strongly connected components (Tarjan, iterative). Components are
/// returned ordered by their smallest member key.
pub fn strongly_connected_components(g: &Digraph) -> Vec<BTreeSet<Key>> {
    let ix = Indexed::new(g);
    let n = ix.keys.len();
    const UNSEEN: usize = usize::MAX;
    let mut index = vec![UNSEEN; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut call: Vec<(usize, usize)> = Vec::new();
    let mut next = 0usize;
    let mut comps: Vec<BTreeSet<Key>> = Vec::new();

    for root in 0..n {
        if index[root] != UNSEEN {
            continue;
        }
        index[root] = next;
        low[root] = next;
        next += 1;
        stack.push(root);
        on_stack[root] = true;
        call.push((root, 0));

        while let Some(frame) = call.last_mut() {
            let v = frame.0;
            if frame.1 < ix.adj[v].len() {
                let w = ix.adj[v][frame.1];
                frame.1 += 1;
                if index[w] == UNSEEN {
                    index[w] = next;
                    low[w] = next;
                    next += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(index[w]);
                }
            } else {
                call.pop();
                if let Some(parent) = call.last() {
                    let p = parent.0;
                    low[p] = low[p].min(low[v]);
                }
                if low[v] == index[v] {
                    let mut comp = BTreeSet::new();
                    loop {
                        let w = stack.pop().expect("tarjan stack underflow");
                        on_stack[w] = false;
                        comp.insert(ix.keys[w].clone());
                        if w == v {
                            break;
                        }
                    }
                    comps.push(comp);
                }
            }
        }
    }

    comps.sort_by(|a, b| a.first().cmp(&b.first()));
    comps
}

/// All elementary circuits (Johnson). Each cycle is returned as the vertex
/// sequence starting at its smallest key; a self-loop yields a one-element
/// cycle.
pub fn simple_cycles(g: &Digraph) -> Vec<Vec<Key>> {
    let ix = Indexed::new(g);
    let n = ix.keys.len();
    let mut out: Vec<Vec<usize>> = Vec::new();

    for s in 0..n {
        if ix.adj[s].contains(&s) {
            out.push(vec![s]);
        }
        // Restrict to vertices >= s within the SCC of s, drop self-loops.
        let region: BTreeSet<usize> = scc_of(&ix.adj, n, s);
        if region.len() < 2 {
            continue;
        }
        let mut blocked: BTreeSet<usize> = BTreeSet::new();
        let mut blists: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        let mut path: Vec<usize> = Vec::new();
        circuit(
            s,
            s,
            &ix.adj,
            &region,
            &mut blocked,
            &mut blists,
            &mut path,
            &mut out,
        );
    }

    out.into_iter()
        .map(|cycle| cycle.into_iter().map(|i| ix.keys[i].clone()).collect())
        .collect()
}

/// SCC containing `s` in the subgraph induced on vertices `>= s`. Forward
/// and backward reachability intersection, which is all Johnson needs.
fn scc_of(adj: &[Vec<usize>], n: usize, s: usize) -> BTreeSet<usize> {
    let allowed = |v: usize| v >= s;
    let mut fwd = BTreeSet::from([s]);
    let mut queue = VecDeque::from([s]);
    while let Some(v) = queue.pop_front() {
        for &w in &adj[v] {
            if allowed(w) && w != v && fwd.insert(w) {
                queue.push_back(w);
            }
        }
    }
    let mut radj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (v, row) in adj.iter().enumerate() {
        for &w in row {
            radj[w].push(v);
        }
    }
    let mut bwd = BTreeSet::from([s]);
    let mut queue = VecDeque::from([s]);
    while let Some(v) = queue.pop_front() {
        for &w in &radj[v] {
            if allowed(w) && w != v && bwd.insert(w) {
                queue.push_back(w);
            }
        }
    }
    fwd.intersection(&bwd).copied().collect()
}

#[allow(clippy::too_many_arguments)]
fn circuit(
    v: usize,
    s: usize,
    adj: &[Vec<usize>],
    region: &BTreeSet<usize>,
    blocked: &mut BTreeSet<usize>,
    blists: &mut BTreeMap<usize, BTreeSet<usize>>,
    path: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) -> bool {
    let mut found = false;
    path.push(v);
    blocked.insert(v);
    for &w in &adj[v] {
        if w == v || !region.contains(&w) {
            continue;
        }
        if w == s {
            out.push(path.clone());
            found = true;
        } else if !blocked.contains(&w)
            && circuit(w, s, adj, region, blocked, blists, path, out)
        {
            found = true;
        }
    }
    if found {
        unblock(v, blocked, blists);
    } else {
        for &w in &adj[v] {
            if w != v && region.contains(&w) {
                blists.entry(w).or_default().insert(v);
            }
        }
    }
    path.pop();
    found
}

fn unblock(v: usize, blocked: &mut BTreeSet<usize>, blists: &mut BTreeMap<usize, BTreeSet<usize>>) {
    blocked.remove(&v);
    let waiting = blists.remove(&v).unwrap_or_default();
    for w in waiting {
        if blocked.contains(&w) {
            unblock(w, blocked, blists);
        }
    }
}

/// All elementary circuits that use the edge `tail -> head`, each returned
/// starting at `tail`. Empty when the edge is absent.
pub fn cycles_through_edge(g: &Digraph, tail: &Key, head: &Key) -> Vec<Vec<Key>> {
    if !g.contains_edge(tail, head) {
        return Vec::new();
    }
    if tail == head {
        return vec![vec![tail.clone()]];
    }
    let mut out = Vec::new();
    let mut visited = BTreeSet::from([head.clone()]);
    let mut path = vec![head.clone()];
    close_paths(g, head, tail, &mut visited, &mut path, &mut out);
    out.into_iter()
        .map(|p| {
            let mut cycle = vec![tail.clone()];
            cycle.extend(p);
            cycle
        })
        .collect()
}

/// All elementary circuits through the node `v`, each returned starting at
/// `v`.
pub fn cycles_through_node(g: &Digraph, v: &Key) -> Vec<Vec<Key>> {
    let mut out = Vec::new();
    if g.contains_edge(v, v) {
        out.push(vec![v.clone()]);
    }
    for w in g.successors(v) {
        if w == v {
            continue;
        }
        let mut paths = Vec::new();
        let mut visited = BTreeSet::from([w.clone()]);
        let mut path = vec![w.clone()];
        close_paths(g, w, v, &mut visited, &mut path, &mut paths);
        for p in paths {
            let mut cycle = vec![v.clone()];
            cycle.extend(p);
            out.push(cycle);
        }
    }
    out
}

/// Collects every simple path from `v` to `target`, excluding `target` as
/// an intermediate vertex. Paths are recorded including `v`, excluding
/// `target`.
fn close_paths(
    g: &Digraph,
    v: &Key,
    target: &Key,
    visited: &mut BTreeSet<Key>,
    path: &mut Vec<Key>,
    out: &mut Vec<Vec<Key>>,
) {
    for w in g.successors(v) {
        if w == target {
            out.push(path.clone());
        } else if !visited.contains(w) {
            visited.insert(w.clone());
            path.push(w.clone());
            close_paths(g, w, target, visited, path, out);
            path.pop();
            visited.remove(w);
        }
    }
}

/// Maximal cliques of the symmetrised graph (Bron–Kerbosch with pivoting).
/// Isolated nodes come out as singleton cliques. Results are ordered by
/// smallest member, then lexicographically.
pub fn maximal_cliques(g: &Digraph, reciprocal: bool) -> Vec<BTreeSet<Key>> {
    maximal_cliques_in(&g.undirected_adjacency(reciprocal))
}

/// Bron–Kerbosch over an explicit undirected neighbour map.
pub fn maximal_cliques_in(adj: &BTreeMap<Key, BTreeSet<Key>>) -> Vec<BTreeSet<Key>> {
    if adj.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<BTreeSet<Key>> = Vec::new();
    let p: BTreeSet<Key> = adj.keys().cloned().collect();
    let mut r = Vec::new();
    bron_kerbosch(adj, &mut r, p, BTreeSet::new(), &mut out);
    out.sort_by(|a, b| {
        a.first()
            .cmp(&b.first())
            .then_with(|| a.iter().cmp(b.iter()))
    });
    out
}

fn bron_kerbosch(
    adj: &BTreeMap<Key, BTreeSet<Key>>,
    r: &mut Vec<Key>,
    mut p: BTreeSet<Key>,
    mut x: BTreeSet<Key>,
    out: &mut Vec<BTreeSet<Key>>,
) {
    if p.is_empty() && x.is_empty() {
        out.push(r.iter().cloned().collect());
        return;
    }
    let pivot = p
        .union(&x)
        .max_by_key(|u| {
            adj.get(*u)
                .map(|nb| nb.intersection(&p).count())
                .unwrap_or(0)
        })
        .cloned()
        .expect("p or x non-empty");
    let pivot_nb = adj.get(&pivot).cloned().unwrap_or_default();
    let candidates: Vec<Key> = p.difference(&pivot_nb).cloned().collect();
    for v in candidates {
        let nb = adj.get(&v).cloned().unwrap_or_default();
        r.push(v.clone());
        bron_kerbosch(
            adj,
            r,
            p.intersection(&nb).cloned().collect(),
            x.intersection(&nb).cloned().collect(),
            out,
        );
        r.pop();
        p.remove(&v);
        x.insert(v);
    }
}

/// True when a directed path from `from` to `to` exists. A node reaches
/// itself trivially.
pub fn is_reachable(g: &Digraph, from: &Key, to: &Key) -> bool {
    descendants(g, from).contains(to)
}

/// All nodes reachable from `from`, including `from` itself.
pub fn descendants(g: &Digraph, from: &Key) -> BTreeSet<Key> {
    let mut seen = BTreeSet::from([from.clone()]);
    let mut queue = VecDeque::from([from.clone()]);
    while let Some(v) = queue.pop_front() {
        for w in g.successors(&v) {
            if seen.insert(w.clone()) {
                queue.push_back(w.clone());
            }
        }
    }
    seen
}

/// All nodes that can reach `to`, including `to` itself.
pub fn ancestors(g: &Digraph, to: &Key) -> BTreeSet<Key> {
    let mut seen = BTreeSet::from([to.clone()]);
    let mut queue = VecDeque::from([to.clone()]);
    while let Some(v) = queue.pop_front() {
        for w in g.predecessors(&v) {
            if seen.insert(w.clone()) {
                queue.push_back(w.clone());
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(v: i64) -> Key {
        Key::Int(v)
    }

    fn graph(edges: &[(i64, i64)]) -> Digraph {
        let mut g = Digraph::new();
        for &(t, h) in edges {
            g.add_edge(k(t), k(h));
        }
        g
    }

    #[test]
    fn tarjan_partitions_the_sample_graph() {
        // 1 -> 2 -> 3 -> 1 is one component; 4 <-> 5 another; 3 -> 4 bridges.
        let g = graph(&[(1, 2), (2, 3), (3, 1), (3, 4), (4, 5), (5, 4)]);
        let comps = strongly_connected_components(&g);
        assert_eq!(
            comps,
            vec![
                BTreeSet::from([k(1), k(2), k(3)]),
                BTreeSet::from([k(4), k(5)]),
            ]
        );
    }

    #[test]
    fn tarjan_on_dag_gives_singletons() {
        let g = graph(&[(1, 2), (2, 3), (1, 3)]);
        let comps = strongly_connected_components(&g);
        assert_eq!(comps.len(), 3);
        assert!(comps.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn johnson_finds_all_elementary_circuits() {
        // Figure-eight through node 2 plus a self-loop on 4.
        let g = graph(&[(1, 2), (2, 3), (3, 1), (2, 4), (4, 2), (4, 4)]);
        let mut cycles: Vec<BTreeSet<Key>> = simple_cycles(&g)
            .into_iter()
            .map(|c| c.into_iter().collect())
            .collect();
        cycles.sort();
        assert_eq!(
            cycles,
            vec![
                BTreeSet::from([k(1), k(2), k(3)]),
                BTreeSet::from([k(2), k(4)]),
                BTreeSet::from([k(4)]),
            ]
        );
    }

    #[test]
    fn cycles_through_edge_only_reports_cycles_using_it() {
        let g = graph(&[(1, 2), (2, 3), (3, 1), (2, 4), (4, 2)]);
        let through = cycles_through_edge(&g, &k(2), &k(4));
        assert_eq!(through, vec![vec![k(2), k(4)]]);
        let through = cycles_through_edge(&g, &k(1), &k(2));
        assert_eq!(through, vec![vec![k(1), k(2), k(3)]]);
        assert!(cycles_through_edge(&g, &k(1), &k(4)).is_empty());
    }

    #[test]
    fn cycles_through_node_covers_every_incident_circuit() {
        let g = graph(&[(1, 2), (2, 3), (3, 1), (2, 4), (4, 2)]);
        let mut through: Vec<BTreeSet<Key>> = cycles_through_node(&g, &k(2))
            .into_iter()
            .map(|c| c.into_iter().collect())
            .collect();
        through.sort();
        assert_eq!(
            through,
            vec![
                BTreeSet::from([k(1), k(2), k(3)]),
                BTreeSet::from([k(2), k(4)]),
            ]
        );
        assert!(cycles_through_node(&g, &k(5)).is_empty());
    }

    #[test]
    fn cliques_respect_the_reciprocal_flag() {
        // Triangle 1-2-3 fully reciprocal; 3-4 in one direction only.
        let g = graph(&[
            (1, 2),
            (2, 1),
            (2, 3),
            (3, 2),
            (1, 3),
            (3, 1),
            (3, 4),
        ]);
        let rec = maximal_cliques(&g, true);
        assert!(rec.contains(&BTreeSet::from([k(1), k(2), k(3)])));
        assert!(rec.contains(&BTreeSet::from([k(4)])));
        let loose = maximal_cliques(&g, false);
        assert!(loose.contains(&BTreeSet::from([k(1), k(2), k(3)])));
        assert!(loose.contains(&BTreeSet::from([k(3), k(4)])));
    }

    #[test]
    fn reachability_walks_both_directions() {
        let g = graph(&[(1, 2), (2, 3), (4, 3)]);
        assert!(is_reachable(&g, &k(1), &k(3)));
        assert!(!is_reachable(&g, &k(3), &k(1)));
        assert_eq!(descendants(&g, &k(1)), BTreeSet::from([k(1), k(2), k(3)]));
        assert_eq!(ancestors(&g, &k(3)), BTreeSet::from([k(1), k(2), k(3), k(4)]));
    }
}
