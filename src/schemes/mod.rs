//! Contraction schemes and the incremental update engine.
//!
//! A contraction scheme owns one level of the hierarchy: the level's
//! decontractible graph, the component-set table covering the level below,
//! the directory mapping set ids to supernode keys, and the outgoing update
//! quadruple. The scheme contributes the *what* — its contraction function
//! and four single-event reactions — while the engine in [`LevelState`]
//! provides the *how*: building the upper graph from a covering,
//! reconciling it against the modified frontier, and journalling every
//! structural change upward.
//!
//! The update protocol replays an incoming quadruple in the canonical order
//! E⁻, V⁻, V⁺, E⁺, dispatching each event to the scheme's handler, and
//! finishes with a reconciliation pass. Handlers whose post-conditions
//! depend on the upper graph being current (reachability checks, clique
//! neighbourhoods) call [`LevelState::update_graph`] themselves mid-loop;
//! the closing pass is then a no-op for the already-reconciled part of the
//! frontier.

pub mod cliques;
pub mod component_set;
pub mod cycles;
pub mod edge_based;
pub mod quadruple;
pub mod sccs;
pub mod stars;

pub use cliques::CliquesScheme;
pub use component_set::{CompTable, ComponentSet};
pub use cycles::CyclesScheme;
pub use quadruple::UpdateQuadruple;
pub use sccs::SccsScheme;
pub use stars::StarsScheme;

use crate::attrs::{Attributes, EdgeKey, Key, SetId};
use crate::dec_graph::{DecGraph, Superedge, Supernode};
use crate::error::{DecError, DecResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Computes the attributes of a supernode from the subgraph induced by the
/// members it represents.
pub type SupernodeAttrFn = Arc<dyn Fn(&DecGraph) -> Attributes + Send + Sync>;

/// Computes the attributes of a superedge from the lower-level edges
/// aggregated into it.
pub type SuperedgeAttrFn = Arc<dyn Fn(&[&Superedge]) -> Attributes + Send + Sync>;

/// Computes the attributes of a component set from its member supernodes.
pub type CSetAttrFn = Arc<dyn Fn(&[&Supernode]) -> Attributes + Send + Sync>;

/// The three optional attribute functions of a scheme. All must be pure:
/// they are called with current members whenever the owning entity is
/// (re)computed and must not touch engine state.
#[derive(Clone, Default)]
pub struct SchemeConfig {
    pub supernode_attr: Option<SupernodeAttrFn>,
    pub superedge_attr: Option<SuperedgeAttrFn>,
    pub c_set_attr: Option<CSetAttrFn>,
}

impl SchemeConfig {
    /// Configuration with no attribute functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the supernode attribute function.
    pub fn with_supernode_attr(
        mut self,
        f: impl Fn(&DecGraph) -> Attributes + Send + Sync + 'static,
    ) -> Self {
        self.supernode_attr = Some(Arc::new(f));
        self
    }

    /// Sets the superedge attribute function.
    pub fn with_superedge_attr(
        mut self,
        f: impl Fn(&[&Superedge]) -> Attributes + Send + Sync + 'static,
    ) -> Self {
        self.superedge_attr = Some(Arc::new(f));
        self
    }

    /// Sets the component-set attribute function.
    pub fn with_c_set_attr(
        mut self,
        f: impl Fn(&[&Supernode]) -> Attributes + Send + Sync + 'static,
    ) -> Self {
        self.c_set_attr = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for SchemeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeConfig")
            .field("supernode_attr", &self.supernode_attr.is_some())
            .field("superedge_attr", &self.superedge_attr.is_some())
            .field("c_set_attr", &self.c_set_attr.is_some())
            .finish()
    }
}

/// A contraction scheme: the rule producing a covering from a lower-level
/// graph plus the four single-event reactions maintaining it.
///
/// The default node handlers implement the edge-based behaviour (new nodes
/// become singletons, removed nodes must have been stripped down to a
/// singleton by the preceding edge removals); schemes grouping by anything
/// other than connectivity override them.
pub trait ContractionScheme {
    /// String identity of the scheme including parameter values.
    fn contraction_name(&self) -> String;

    /// A fresh scheme with identical configuration and no state.
    fn clone_scheme(&self) -> Box<dyn ContractionScheme>;

    /// The scheme's attribute functions.
    fn config(&self) -> &SchemeConfig;

    /// Full computation of the covering for a lower-level graph. The
    /// result must cover every node (inserting singletons where needed)
    /// and have a clear frontier.
    fn contraction_function(
        &mut self,
        state: &mut LevelState,
        lower: &DecGraph,
    ) -> DecResult<CompTable>;

    /// Reaction to a node added one level below.
    fn on_added_node(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        node: &Supernode,
    ) -> DecResult<()> {
        edge_based::added_node(state, lower, node)
    }

    /// Reaction to a node removed one level below. Its incident edges have
    /// already been removed.
    fn on_removed_node(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        node: &Supernode,
    ) -> DecResult<()> {
        edge_based::removed_node(state, lower, node)
    }

    /// Reaction to an edge added one level below.
    fn on_added_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()>;

    /// Reaction to an edge removed one level below.
    fn on_removed_edge(
        &mut self,
        state: &mut LevelState,
        lower: &mut DecGraph,
        edge: &Superedge,
    ) -> DecResult<()>;
}

/// The engine state of one level: graph, covering, directory, journal and
/// the reconciliation machinery.
#[derive(Clone)]
pub struct LevelState {
    /// Level index of this scheme's graph (≥ 1).
    pub level: usize,
    /// The level's decontractible graph.
    pub dec_graph: DecGraph,
    /// Covering of the lower level's nodes.
    pub comp_table: CompTable,
    /// Directory: component-set id → supernode key. Dummy supernodes
    /// allocated for freshly added nodes are intentionally absent.
    pub supernode_table: BTreeMap<SetId, Key>,
    /// Outgoing journal consumed by the level above.
    pub quadruple: UpdateQuadruple,
    /// Lower-level nodes removed since the last reconciliation, keyed by
    /// the supernode whose interior still holds them.
    pub deleted_subnodes: BTreeMap<Key, BTreeSet<Key>>,
    /// Lazily materialised flat view of this level, maintained by
    /// decontraction-based schemes.
    pub decontracted: Option<DecGraph>,
    /// Attribute functions, copied from the scheme at bind time.
    pub config: SchemeConfig,
    homes: BTreeMap<Key, Key>,
    next_id: u64,
    built: bool,
    valid: bool,
    needs_rebuild: bool,
}

impl fmt::Debug for LevelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelState")
            .field("level", &self.level)
            .field("order", &self.dec_graph.order())
            .field("sets", &self.comp_table.set_count())
            .field("built", &self.built)
            .field("valid", &self.valid)
            .field("needs_rebuild", &self.needs_rebuild)
            .finish()
    }
}

impl LevelState {
    /// Creates the state of an unbuilt level.
    pub fn new(level: usize, config: SchemeConfig) -> Self {
        Self {
            level,
            dec_graph: DecGraph::new(level),
            comp_table: CompTable::new(),
            supernode_table: BTreeMap::new(),
            quadruple: UpdateQuadruple::new(),
            deleted_subnodes: BTreeMap::new(),
            decontracted: None,
            config,
            homes: BTreeMap::new(),
            next_id: 0,
            built: false,
            valid: false,
            needs_rebuild: false,
        }
    }

    /// Mints a fresh id, shared between component sets and dummy supernode
    /// keys so the two can never collide.
    pub fn fresh_id(&mut self) -> SetId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Mints a fresh integer supernode key.
    pub fn fresh_key(&mut self) -> Key {
        Key::Int(self.fresh_id() as i64)
    }

    /// True when the level has been contracted at least once.
    pub fn built(&self) -> bool {
        self.built
    }

    /// True when the level reflects all propagated base edits.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True when the last update aborted and the level must be rebuilt.
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Marks the level as stale after a base edit.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
        self.valid = true;
        self.needs_rebuild = false;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.valid = false;
        self.needs_rebuild = true;
    }

    pub(crate) fn mark_unbuilt(&mut self) {
        self.built = false;
        self.valid = false;
        self.needs_rebuild = false;
    }

    pub(crate) fn reset(&mut self) {
        self.dec_graph = DecGraph::new(self.level);
        self.comp_table = CompTable::new();
        self.supernode_table.clear();
        self.quadruple.clear();
        self.deleted_subnodes.clear();
        self.decontracted = None;
        self.homes.clear();
    }

    /// Home supernode key of a lower-level node. Authoritative: survives
    /// removal of the node from the lower graph until reconciliation.
    pub fn home(&self, key: &Key) -> DecResult<Key> {
        self.homes
            .get(key)
            .cloned()
            .ok_or_else(|| DecError::Invariant(format!("node {} has no home supernode", key)))
    }

    pub(crate) fn set_home(&mut self, key: Key, home: Key) {
        self.homes.insert(key, home);
    }

    /// Evaluates the component-set attribute function over member keys.
    pub fn c_set_attrs(&self, lower: &DecGraph, members: &BTreeSet<Key>) -> Attributes {
        match &self.config.c_set_attr {
            Some(f) => {
                let refs: Vec<&Supernode> =
                    members.iter().filter_map(|k| lower.node(k)).collect();
                f(&refs)
            }
            None => Attributes::new(),
        }
    }

    /// Recomputes every supernode's attributes from the subgraph induced
    /// by the members of its live component sets.
    pub fn refresh_supernode_attrs(&mut self, lower: &DecGraph) {
        let Some(f) = self.config.supernode_attr.clone() else {
            return;
        };
        for key in self.dec_graph.node_keys() {
            let members: BTreeSet<Key> = match self.dec_graph.node(&key) {
                Some(node) => node
                    .component_sets
                    .iter()
                    .filter_map(|id| self.comp_table.get(*id))
                    .flat_map(|c| c.members().iter().cloned())
                    .collect(),
                None => continue,
            };
            let attr = f(&lower.induced_subgraph(&members));
            if let Some(node) = self.dec_graph.node_mut(&key) {
                node.attr = attr;
            }
        }
    }

    fn refresh_superedge_attr(&mut self, key: &EdgeKey) {
        let Some(f) = self.config.superedge_attr.clone() else {
            return;
        };
        let attr = match self.dec_graph.edge(key) {
            Some(se) => {
                let refs: Vec<&Superedge> = se.dec.values().collect();
                f(&refs)
            }
            None => return,
        };
        if let Some(se) = self.dec_graph.edge_mut(key) {
            se.attr = attr;
        }
    }

    /// Records a lower-level edge in the superedge between the given
    /// supernodes, creating the superedge (and journalling E⁺) when its
    /// aggregation set transitions from empty to non-empty. Returns whether
    /// the superedge was created.
    pub fn add_edge_in_superedge(
        &mut self,
        u: &Key,
        v: &Key,
        lower_edge: &Superedge,
    ) -> DecResult<bool> {
        let skey = (u.clone(), v.clone());
        let created = !self.dec_graph.contains_edge(&skey);
        if created {
            self.dec_graph
                .add_edge(Superedge::new(u.clone(), v.clone(), self.level))?;
        }
        {
            let se = self
                .dec_graph
                .edge_mut(&skey)
                .ok_or_else(|| DecError::Invariant(format!("superedge ({}, {}) vanished", u, v)))?;
            se.dec.insert(lower_edge.key(), lower_edge.clone());
        }
        self.refresh_superedge_attr(&skey);
        if created {
            let copy = self
                .dec_graph
                .edge(&skey)
                .ok_or_else(|| DecError::Invariant(format!("superedge ({}, {}) vanished", u, v)))?
                .clone();
            self.quadruple.add_e_plus(copy);
        }
        Ok(created)
    }

    /// Removes a lower-level edge from the superedge between the given
    /// supernodes, destroying the superedge (and journalling E⁻) when its
    /// aggregation set empties. Idempotent: an edge already drained by
    /// interior cleanup during an earlier rehoming is a no-op.
    pub fn remove_edge_in_superedge(&mut self, u: &Key, v: &Key, ekey: &EdgeKey) -> DecResult<()> {
        let skey = (u.clone(), v.clone());
        let emptied = {
            let Some(se) = self.dec_graph.edge_mut(&skey) else {
                return Ok(());
            };
            if se.dec.remove(ekey).is_none() {
                return Ok(());
            }
            se.dec.is_empty()
        };
        if emptied {
            let removed = self.dec_graph.remove_edge(&skey)?;
            self.quadruple.add_e_minus(removed);
        } else {
            self.refresh_superedge_attr(&skey);
        }
        Ok(())
    }

    /// Places a freshly added lower-level edge: into its home supernode's
    /// interior when both endpoints share a home, into the inter-supernode
    /// superedge otherwise.
    pub fn place_added_edge(&mut self, edge: &Superedge) -> DecResult<()> {
        let u = self.home(&edge.tail)?;
        let v = self.home(&edge.head)?;
        if u == v {
            let un = self
                .dec_graph
                .node_mut(&u)
                .ok_or_else(|| DecError::Invariant(format!("home supernode {} missing", u)))?;
            if !un.dec.contains_edge(&edge.key()) {
                un.dec.add_edge(edge.clone())?;
            }
        } else {
            self.add_edge_in_superedge(&u, &v, edge)?;
        }
        Ok(())
    }

    /// Removes the record of a lower-level edge that no longer exists.
    pub fn place_removed_edge(&mut self, edge: &Superedge) -> DecResult<()> {
        let u = self.home(&edge.tail)?;
        let v = self.home(&edge.head)?;
        if u == v {
            if let Some(un) = self.dec_graph.node_mut(&u) {
                un.dec.discard_edge(&edge.key());
            }
        } else {
            self.remove_edge_in_superedge(&u, &v, &edge.key())?;
        }
        Ok(())
    }

    /// Covers every uncovered node of the modified frontier with a fresh
    /// singleton component set.
    pub fn cover_singletons(&mut self) {
        let uncovered: Vec<Key> = self
            .comp_table
            .modified
            .iter()
            .filter(|k| !self.comp_table.contains_node(k))
            .cloned()
            .collect();
        for key in uncovered {
            let id = self.fresh_id();
            self.comp_table.add_set(
                ComponentSet::new(id, BTreeSet::from([key]), Attributes::new()),
                false,
            );
        }
    }

    /// Builds the upper graph from scratch out of the current covering:
    /// one supernode per component set (key = set id), member copies in
    /// their home supernode's interior, lower edges placed intra-home or
    /// aggregated into superedges. Used by the initial contraction only;
    /// incremental maintenance goes through [`Self::update_graph`].
    pub(crate) fn make_dec_graph(&mut self, lower: &mut DecGraph) -> DecResult<()> {
        for key in lower.node_keys() {
            let ids = self.comp_table.sets_of(&key);
            let Some(home_id) = ids.first().copied() else {
                return Err(DecError::Invariant(format!(
                    "contraction left node {} uncovered",
                    key
                )));
            };
            let home_key = Key::Int(home_id as i64);
            self.homes.insert(key.clone(), home_key.clone());
            if let Some(node) = lower.node_mut(&key) {
                node.supernode = Some(home_key);
                node.component_sets = ids;
            }
        }
        for id in self.comp_table.set_ids() {
            let skey = Key::Int(id as i64);
            let mut sn = Supernode::new(skey.clone(), self.level);
            sn.component_sets = BTreeSet::from([id]);
            self.dec_graph.add_node(sn)?;
            self.supernode_table.insert(id, skey);
        }
        for key in lower.node_keys() {
            let home = self.home(&key)?;
            let copy = lower
                .node(&key)
                .ok_or_else(|| DecError::Invariant(format!("node {} vanished", key)))?
                .shallow_copy();
            let u = self
                .dec_graph
                .node_mut(&home)
                .ok_or_else(|| DecError::Invariant(format!("home supernode {} missing", home)))?;
            u.dec.add_node(copy)?;
        }
        for ekey in lower.edge_keys() {
            let edge = lower
                .edge(&ekey)
                .ok_or_else(|| DecError::MissingEdge(ekey.0.clone(), ekey.1.clone()))?
                .clone();
            self.place_added_edge(&edge)?;
        }
        self.refresh_supernode_attrs(lower);
        // the initial build is not journalled upward
        self.quadruple.clear();
        Ok(())
    }

    /// Reconciles the upper graph with the modified frontier and the
    /// deleted-subnode records: drops removed members, materialises
    /// supernodes for new sets, rehomes nodes whose home changed together
    /// with their incident edges, destroys empty unreferenced supernodes,
    /// and journals every change upward.
    pub fn update_graph(&mut self, lower: &mut DecGraph) -> DecResult<()> {
        let deleted = std::mem::take(&mut self.deleted_subnodes);
        for (ukey, subs) in deleted {
            for n in &subs {
                if let Some(u) = self.dec_graph.node_mut(&ukey) {
                    u.dec.take_node(n);
                }
                self.homes.remove(n);
            }
            self.maybe_destroy_supernode(&ukey)?;
        }

        let modified = std::mem::take(&mut self.comp_table.modified);
        for n_key in modified {
            if lower.node(&n_key).is_none() {
                // already removed below; cleanup happened via
                // deleted_subnodes
                continue;
            }
            let ids = self.comp_table.sets_of(&n_key);
            if ids.is_empty() {
                if let Some(old) = self.homes.remove(&n_key) {
                    if let Some(u) = self.dec_graph.node_mut(&old) {
                        u.dec.take_node(&n_key);
                    }
                    self.maybe_destroy_supernode(&old)?;
                }
                if let Some(n) = lower.node_mut(&n_key) {
                    n.supernode = None;
                    n.component_sets.clear();
                }
                continue;
            }
            for id in &ids {
                if !self.supernode_table.contains_key(id) {
                    let skey = Key::Int(*id as i64);
                    let mut sn = Supernode::new(skey.clone(), self.level);
                    sn.component_sets = BTreeSet::from([*id]);
                    let copy = sn.shallow_copy();
                    self.dec_graph.add_node(sn)?;
                    self.supernode_table.insert(*id, skey);
                    self.quadruple.add_v_plus(copy);
                }
            }
            let home_id = *ids.first().expect("non-empty id set");
            let new_home = self.supernode_table[&home_id].clone();
            let old_home = self.homes.get(&n_key).cloned();
            if let Some(n) = lower.node_mut(&n_key) {
                n.component_sets = ids.clone();
            }
            if old_home.as_ref() != Some(&new_home) {
                self.move_node(lower, &n_key, old_home, new_home)?;
            } else if let Some(u) = self.dec_graph.node_mut(&new_home) {
                if let Some(copy) = u.dec.node_mut(&n_key) {
                    copy.component_sets = ids;
                }
            }
        }

        // a supernode whose set was removed while every member was already
        // homed elsewhere is emptied by nobody; sweep it out here
        for key in self.dec_graph.node_keys() {
            self.maybe_destroy_supernode(&key)?;
        }

        self.refresh_supernode_attrs(lower);
        Ok(())
    }

    /// Moves a lower-level node from its old home supernode into a new
    /// one, relocating every incident lower edge between interiors and
    /// superedges as the endpoint homes dictate.
    fn move_node(
        &mut self,
        lower: &mut DecGraph,
        n_key: &Key,
        old_home: Option<Key>,
        new_home: Key,
    ) -> DecResult<()> {
        let mut copy = match &old_home {
            Some(old) => self
                .dec_graph
                .node_mut(old)
                .and_then(|u| u.dec.take_node(n_key)),
            None => None,
        };
        let mut copy = match copy.take() {
            Some(c) => c,
            None => lower
                .node(n_key)
                .ok_or_else(|| DecError::Invariant(format!("node {} vanished mid-move", n_key)))?
                .shallow_copy(),
        };
        copy.supernode = Some(new_home.clone());
        copy.component_sets = self.comp_table.sets_of(n_key);
        copy.dec = DecGraph::new(copy.level.saturating_sub(1));

        {
            let u = self
                .dec_graph
                .node_mut(&new_home)
                .ok_or_else(|| DecError::Invariant(format!("home supernode {} missing", new_home)))?;
            if !u.dec.contains_node(n_key) {
                u.dec.add_node(copy)?;
            }
        }
        self.homes.insert(n_key.clone(), new_home.clone());
        if let Some(n) = lower.node_mut(n_key) {
            n.supernode = Some(new_home.clone());
        }

        for ekey in lower.incident_edge_keys(n_key) {
            let (t, h) = (&ekey.0, &ekey.1);
            let old_t = if t == n_key {
                old_home.clone()
            } else {
                self.homes.get(t).cloned()
            };
            let old_h = if h == n_key {
                old_home.clone()
            } else {
                self.homes.get(h).cloned()
            };
            if let (Some(a), Some(b)) = (old_t, old_h) {
                if a == b {
                    if let Some(u) = self.dec_graph.node_mut(&a) {
                        u.dec.discard_edge(&ekey);
                    }
                } else {
                    let recorded = self
                        .dec_graph
                        .edge(&(a.clone(), b.clone()))
                        .is_some_and(|se| se.dec.contains_key(&ekey));
                    if recorded {
                        self.remove_edge_in_superedge(&a, &b, &ekey)?;
                    }
                }
            }

            let new_t = if t == n_key {
                Some(new_home.clone())
            } else {
                self.homes.get(t).cloned()
            };
            let new_h = if h == n_key {
                Some(new_home.clone())
            } else {
                self.homes.get(h).cloned()
            };
            if let (Some(a), Some(b)) = (new_t, new_h) {
                let edge_val = lower
                    .edge(&ekey)
                    .ok_or_else(|| DecError::MissingEdge(ekey.0.clone(), ekey.1.clone()))?
                    .clone();
                if a == b {
                    let u = self.dec_graph.node_mut(&a).ok_or_else(|| {
                        DecError::Invariant(format!("home supernode {} missing", a))
                    })?;
                    if !u.dec.contains_edge(&ekey) {
                        u.dec.add_edge(edge_val)?;
                    }
                } else {
                    let recorded = self
                        .dec_graph
                        .edge(&(a.clone(), b.clone()))
                        .is_some_and(|se| se.dec.contains_key(&ekey));
                    if !recorded {
                        self.add_edge_in_superedge(&a, &b, &edge_val)?;
                    }
                }
            }
        }

        if let Some(old) = old_home {
            self.maybe_destroy_supernode(&old)?;
        }
        Ok(())
    }

    /// Destroys a supernode when its interior is empty and no live
    /// component set references it (dummy supernodes are never referenced
    /// by the directory). Dead directory entries are dropped alongside.
    fn maybe_destroy_supernode(&mut self, ukey: &Key) -> DecResult<()> {
        let empty = match self.dec_graph.node(ukey) {
            Some(u) => u.dec.order() == 0,
            None => return Ok(()),
        };
        if !empty {
            return Ok(());
        }
        let referenced = self
            .supernode_table
            .iter()
            .any(|(id, k)| k == ukey && self.comp_table.contains_set(*id));
        if referenced {
            return Ok(());
        }
        self.supernode_table.retain(|_, k| k != ukey);
        let removed = self.dec_graph.remove_node(ukey)?;
        self.quadruple.add_v_minus(removed.shallow_copy());
        Ok(())
    }
}

/// One bound level: a scheme plus its engine state.
pub struct Level {
    /// The scheme providing the covering rule and event handlers.
    pub scheme: Box<dyn ContractionScheme>,
    /// The engine state it drives.
    pub state: LevelState,
}

impl Level {
    /// Binds a scheme to a fresh level.
    pub fn new(scheme: Box<dyn ContractionScheme>, level: usize) -> Self {
        let config = scheme.config().clone();
        Self {
            scheme,
            state: LevelState::new(level, config),
        }
    }

    /// Full (re)build of this level from the lower graph.
    pub fn contract(&mut self, lower: &mut DecGraph) -> DecResult<()> {
        debug!(
            level = self.state.level,
            scheme = %self.scheme.contraction_name(),
            order = lower.order(),
            "contracting level"
        );
        self.state.reset();
        let table = self.scheme.contraction_function(&mut self.state, lower)?;
        self.state.comp_table = table;
        self.state.make_dec_graph(lower)?;
        self.state.mark_built();
        Ok(())
    }

    /// Incremental entry point: replays the incoming quadruple in the
    /// canonical order E⁻, V⁻, V⁺, E⁺ and reconciles. A failure marks the
    /// level as needing a rebuild; nothing partial is published upward.
    pub fn update(&mut self, incoming: &UpdateQuadruple, lower: &mut DecGraph) -> DecResult<()> {
        debug!(
            level = self.state.level,
            scheme = %self.scheme.contraction_name(),
            e_minus = incoming.e_minus().len(),
            v_minus = incoming.v_minus().len(),
            v_plus = incoming.v_plus().len(),
            e_plus = incoming.e_plus().len(),
            "updating level"
        );
        match self.apply(incoming, lower) {
            Ok(()) => {
                self.state.valid = true;
                Ok(())
            }
            Err(e) => {
                self.state.mark_failed();
                Err(e)
            }
        }
    }

    fn apply(&mut self, incoming: &UpdateQuadruple, lower: &mut DecGraph) -> DecResult<()> {
        for edge in incoming.e_minus() {
            self.scheme.on_removed_edge(&mut self.state, lower, edge)?;
        }
        for node in incoming.v_minus() {
            self.scheme.on_removed_node(&mut self.state, lower, node)?;
        }
        for node in incoming.v_plus() {
            self.scheme.on_added_node(&mut self.state, lower, node)?;
        }
        for edge in incoming.e_plus() {
            self.scheme.on_added_edge(&mut self.state, lower, edge)?;
        }
        self.state.update_graph(lower)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("scheme", &self.scheme.contraction_name())
            .field("state", &self.state)
            .finish()
    }
}
