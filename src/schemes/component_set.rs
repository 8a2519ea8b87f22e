//! Component sets and the per-level component-set table.
//!
//! A component set is a labelled, attributed set of lower-level supernode
//! keys recognised by a contraction scheme (an SCC, a circuit, a clique).
//! The [`CompTable`] of a level records the covering of the lower level's
//! nodes by such sets, keeps the reverse index node → containing sets, and
//! tracks the `modified` frontier: the nodes whose containing-set
//! collection changed since the last reconciliation.

use crate::attrs::{Attributes, Key, SetId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// A set of lower-level supernodes forming one component.
///
/// Two component sets are equal iff they share the same id; equality of the
/// member sets is a separate predicate used only by maximal insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSet {
    id: SetId,
    members: BTreeSet<Key>,
    /// User attributes, typically produced by the scheme's component-set
    /// attribute function.
    pub attr: Attributes,
}

impl ComponentSet {
    /// Creates a component set.
    pub fn new(id: SetId, members: BTreeSet<Key>, attr: Attributes) -> Self {
        Self { id, members, attr }
    }

    /// The id, unique within the owning scheme.
    pub fn id(&self) -> SetId {
        self.id
    }

    /// The member keys.
    pub fn members(&self) -> &BTreeSet<Key> {
        &self.members
    }

    /// True when the key is a member.
    pub fn contains(&self, key: &Key) -> bool {
        self.members.contains(key)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the set has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates members in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.members.iter()
    }
}

impl PartialEq for ComponentSet {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentSet {}

impl Hash for ComponentSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The covering of a level's lower nodes by component sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompTable {
    sets: BTreeMap<SetId, ComponentSet>,
    index: BTreeMap<Key, BTreeSet<SetId>>,
    /// Nodes whose containing-set collection changed since the last
    /// reconciliation pass.
    pub modified: BTreeSet<Key>,
}

impl CompTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a covering. With `maximal`, only sets maximal
    /// under member inclusion survive. The frontier is cleared afterwards.
    pub fn from_sets(sets: impl IntoIterator<Item = ComponentSet>, maximal: bool) -> Self {
        let mut table = Self::new();
        for c_set in sets {
            table.add_set(c_set, maximal);
        }
        table.modified.clear();
        table
    }

    /// Adds a component set, tracking every member in the frontier.
    ///
    /// With `maximal`, the set is inserted only when no tracked set already
    /// contains all of its members, and tracked subsets of it are removed
    /// first.
    pub fn add_set(&mut self, c_set: ComponentSet, maximal: bool) {
        if maximal {
            self.add_maximal_set(c_set, true);
        } else {
            self.add_plain_set(c_set);
        }
    }

    fn add_plain_set(&mut self, c_set: ComponentSet) {
        if self.sets.contains_key(&c_set.id) {
            return;
        }
        for member in &c_set.members {
            self.index
                .entry(member.clone())
                .or_default()
                .insert(c_set.id);
            self.modified.insert(member.clone());
        }
        self.sets.insert(c_set.id, c_set);
    }

    /// Adds a set only when maximal among the tracked sets. With
    /// `check_subsets` off, the subset-removal walk is skipped; callers use
    /// that when insertion order already guarantees no tracked subset
    /// exists.
    pub fn add_maximal_set(&mut self, c_set: ComponentSet, check_subsets: bool) {
        if c_set.is_empty() {
            return;
        }
        let mut members = c_set.members.iter();
        let first = members.next().expect("non-empty set");
        let mut common: BTreeSet<SetId> = self.index.get(first).cloned().unwrap_or_default();
        for member in members {
            if common.is_empty() {
                break;
            }
            match self.index.get(member) {
                Some(row) => common = common.intersection(row).copied().collect(),
                None => common.clear(),
            }
        }
        if !common.is_empty() {
            // some tracked set already contains every member
            return;
        }
        if check_subsets {
            for id in self.find_subsets(&c_set) {
                self.remove_set(id);
            }
        }
        self.add_plain_set(c_set);
    }

    /// Ids of tracked sets whose members are all contained in `c_set`.
    pub fn find_subsets(&self, c_set: &ComponentSet) -> Vec<SetId> {
        let mut counts: BTreeMap<SetId, usize> = BTreeMap::new();
        for member in &c_set.members {
            for id in self.index.get(member).into_iter().flatten() {
                *counts.entry(*id).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(id, count)| {
                self.sets
                    .get(id)
                    .is_some_and(|tracked| tracked.len() == *count)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Removes a tracked set, marking its members modified. A member whose
    /// row becomes empty is dropped from the index entirely: it is now
    /// uncovered and must be re-covered or deleted before the update
    /// completes.
    pub fn remove_set(&mut self, id: SetId) -> Option<ComponentSet> {
        let c_set = self.sets.remove(&id)?;
        for member in &c_set.members {
            if let Some(row) = self.index.get_mut(member) {
                row.remove(&id);
                if row.is_empty() {
                    self.index.remove(member);
                }
            }
            self.modified.insert(member.clone());
        }
        Some(c_set)
    }

    /// True when the node is covered by at least one tracked set.
    pub fn contains_node(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    /// Ids of the sets containing the node, empty when uncovered.
    pub fn sets_of(&self, key: &Key) -> BTreeSet<SetId> {
        self.index.get(key).cloned().unwrap_or_default()
    }

    /// Ids of the tracked sets containing every one of the given nodes.
    pub fn common_sets(&self, members: &BTreeSet<Key>) -> BTreeSet<SetId> {
        let mut iter = members.iter();
        let Some(first) = iter.next() else {
            return BTreeSet::new();
        };
        let mut common = self.sets_of(first);
        for member in iter {
            if common.is_empty() {
                break;
            }
            match self.index.get(member) {
                Some(row) => common = common.intersection(row).copied().collect(),
                None => common.clear(),
            }
        }
        common
    }

    /// Ids of the sets containing both nodes.
    pub fn sets_containing_both(&self, a: &Key, b: &Key) -> Vec<SetId> {
        match (self.index.get(a), self.index.get(b)) {
            (Some(ra), Some(rb)) => ra.intersection(rb).copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Looks up a tracked set by id.
    pub fn get(&self, id: SetId) -> Option<&ComponentSet> {
        self.sets.get(&id)
    }

    /// True when a set with this id is tracked.
    pub fn contains_set(&self, id: SetId) -> bool {
        self.sets.contains_key(&id)
    }

    /// Iterates tracked sets in ascending id order.
    pub fn all_sets(&self) -> impl Iterator<Item = &ComponentSet> {
        self.sets.values()
    }

    /// Ids of all tracked sets, ascending.
    pub fn set_ids(&self) -> Vec<SetId> {
        self.sets.keys().copied().collect()
    }

    /// Number of tracked sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Number of covered nodes.
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Resets the frontier.
    pub fn clear_modified(&mut self) {
        self.modified.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[i64]) -> BTreeSet<Key> {
        raw.iter().map(|&v| Key::Int(v)).collect()
    }

    fn set(id: SetId, raw: &[i64]) -> ComponentSet {
        ComponentSet::new(id, keys(raw), Attributes::new())
    }

    #[test]
    fn equality_is_by_id() {
        assert_eq!(set(1, &[1, 2]), set(1, &[3]));
        assert_ne!(set(1, &[1, 2]), set(2, &[1, 2]));
    }

    #[test]
    fn add_and_remove_maintain_index_and_frontier() {
        let mut table = CompTable::new();
        table.add_set(set(1, &[1, 2]), false);
        table.add_set(set(2, &[2, 3]), false);
        assert_eq!(table.sets_of(&Key::Int(2)), BTreeSet::from([1, 2]));
        assert_eq!(table.modified, keys(&[1, 2, 3]));

        table.clear_modified();
        table.remove_set(1);
        assert_eq!(table.modified, keys(&[1, 2]));
        assert!(!table.contains_node(&Key::Int(1)));
        assert_eq!(table.sets_of(&Key::Int(2)), BTreeSet::from([2]));
    }

    #[test]
    fn maximal_insertion_blocks_subsets_and_prunes_them() {
        let mut table = CompTable::new();
        table.add_set(set(1, &[1, 2, 3]), true);
        // a subset of a tracked set is rejected
        table.add_set(set(2, &[1, 2]), true);
        assert!(!table.contains_set(2));
        assert_eq!(table.set_count(), 1);
        // a superset replaces the tracked subset
        table.add_set(set(3, &[1, 2, 3, 4]), true);
        assert!(!table.contains_set(1));
        assert!(table.contains_set(3));
        assert_eq!(table.sets_of(&Key::Int(1)), BTreeSet::from([3]));
        // overlapping but incomparable sets coexist
        table.add_set(set(4, &[4, 5]), true);
        assert!(table.contains_set(4));
    }

    #[test]
    fn find_subsets_counts_full_containment_only() {
        let mut table = CompTable::new();
        table.add_set(set(1, &[1, 2]), false);
        table.add_set(set(2, &[2, 3]), false);
        let probe = set(9, &[1, 2, 3]);
        let mut subs = table.find_subsets(&probe);
        subs.sort();
        assert_eq!(subs, vec![1, 2]);
        let probe = set(10, &[1, 2]);
        assert_eq!(table.find_subsets(&probe), vec![1]);
    }

    #[test]
    fn from_sets_clears_the_frontier() {
        let table = CompTable::from_sets([set(1, &[1]), set(2, &[2])], false);
        assert!(table.modified.is_empty());
        assert_eq!(table.set_count(), 2);
    }
}
