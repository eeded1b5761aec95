//! The ordered store: a balanced index over a singly linked chain.
//!
//! Values live in an arena of nodes threaded into one chain in ascending key
//! order. A `BTreeMap` maps each distinct key to the slot of the *first*
//! node carrying that key, so equal keys form a run that keeps insertion
//! order and is reached through a single index entry.
//!
//! Cost model: insert and lookup are O(log n) plus the length of the
//! equal-key run being appended to. Remove is O(n), since the chain is
//! singly linked and the predecessor has to be found by scanning from the
//! head.

use std::collections::BTreeMap;
use std::fmt;

use crate::traits::StoreAccessor;

struct Node<K, V> {
    key: K,
    value: V,
    next: Option<usize>,
}

/// Ordered key/value container with duplicate keys.
pub struct OrderedStore<K, V> {
    /// Node arena. `None` marks a slot on the free list.
    nodes: Vec<Option<Node<K, V>>>,

    /// Vacant slots available for reuse.
    free: Vec<usize>,

    /// First node of the chain.
    head: Option<usize>,

    /// Key -> slot of the first node with that key.
    index: BTreeMap<K, usize>,

    len: usize,
}

impl<K: Ord + Clone, V> OrderedStore<K, V> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            index: BTreeMap::new(),
            len: 0,
        }
    }

    /// Insert a value. Equal keys are kept after every existing node with
    /// the same key.
    pub fn insert(&mut self, key: K, value: V) {
        let floor = self.index.range::<K, _>(..=&key).next_back().map(|(_, &slot)| slot);

        let slot = self.alloc(Node {
            key: key.clone(),
            value,
            next: None,
        });

        match floor {
            // Every existing key is greater: the new node becomes the head.
            None => {
                self.node_mut(slot).next = self.head;
                self.head = Some(slot);
                self.index.insert(key, slot);
            }
            Some(floor) => {
                let mut current = floor;
                while let Some(next) = self.node(current).next {
                    if self.node(next).key > key {
                        break;
                    }
                    current = next;
                }

                let after = self.node(current).next;
                self.node_mut(slot).next = after;
                self.node_mut(current).next = Some(slot);

                // The index must keep pointing at the earliest node of a run.
                if self.node(floor).key != key {
                    self.index.insert(key, slot);
                }
            }
        }

        self.len += 1;
    }

    /// Remove the first value stored under `key`.
    ///
    /// If more values share the key, the next one becomes the indexed node.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let target = *self.index.get(key)?;

        let mut prev = None;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            if slot == target {
                break;
            }
            prev = Some(slot);
            cursor = self.node(slot).next;
        }
        debug_assert_eq!(cursor, Some(target), "indexed node missing from chain");

        let next = self.node(target).next;
        match prev {
            None => self.head = next,
            Some(prev) => self.node_mut(prev).next = next,
        }

        match next {
            Some(next) if self.node(next).key == *key => {
                self.index.insert(key.clone(), next);
            }
            _ => {
                self.index.remove(key);
            }
        }

        let node = self.nodes[target].take()?;
        self.free.push(target);
        self.len -= 1;
        Some(node.value)
    }

    /// Mutable access to the first value stored under `key`.
    pub fn first_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = *self.index.get(key)?;
        Some(&mut self.node_mut(slot).value)
    }

    /// Whether any value is stored under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    /// Slot of the first node whose key is `>= key`.
    fn ceiling(&self, key: &K) -> Option<usize> {
        self.index.range::<K, _>(key..).next().map(|(_, &slot)| slot)
    }

    fn node(&self, slot: usize) -> &Node<K, V> {
        self.nodes[slot]
            .as_ref()
            .expect("linked slot is occupied")
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<K, V> {
        self.nodes[slot]
            .as_mut()
            .expect("linked slot is occupied")
    }

    fn values_from(&self, start: Option<usize>, upper: Option<K>) -> Values<'_, K, V> {
        Values {
            store: self,
            cursor: start,
            upper,
        }
    }
}

impl<K: Ord + Clone, V> StoreAccessor<K, V> for OrderedStore<K, V> {
    fn first(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.node(slot).value)
    }

    fn all(&self) -> Values<'_, K, V> {
        self.values_from(self.head, None)
    }

    fn at(&self, key: &K) -> Values<'_, K, V> {
        self.values_from(self.index.get(key).copied(), Some(key.clone()))
    }

    fn after(&self, start: &K) -> Values<'_, K, V> {
        self.values_from(self.ceiling(start), None)
    }

    fn before(&self, end: &K) -> Values<'_, K, V> {
        self.values_from(self.head, Some(end.clone()))
    }

    fn range(&self, start: &K, end: &K) -> Values<'_, K, V> {
        self.values_from(self.ceiling(start), Some(end.clone()))
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<K: Ord + Clone, V> Default for OrderedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for OrderedStore<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for OrderedStore<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

impl<K: Ord + Clone + fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = self.node(slot);
            map.entry(&node.key, &node.value);
            cursor = node.next;
        }
        map.finish()
    }
}

/// Lazy walk along the chain, in key order.
///
/// Stops at the end of the chain or at the first key above the upper bound.
/// A clone continues independently from the same position.
pub struct Values<'a, K, V> {
    store: &'a OrderedStore<K, V>,
    cursor: Option<usize>,
    upper: Option<K>,
}

impl<'a, K: Ord + Clone, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let store = self.store;
        let node = store.node(slot);

        if let Some(upper) = &self.upper {
            if node.key > *upper {
                self.cursor = None;
                return None;
            }
        }

        self.cursor = node.next;
        Some(&node.value)
    }
}

impl<K: Clone, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            cursor: self.cursor,
            upper: self.upper.clone(),
        }
    }
}

impl<K: Ord + Clone, V> std::iter::FusedIterator for Values<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collect<'a>(values: impl Iterator<Item = &'a &'static str>) -> Vec<&'static str> {
        values.copied().collect()
    }

    fn sample() -> OrderedStore<u32, &'static str> {
        [(5, "A"), (3, "B"), (3, "C"), (7, "D")].into_iter().collect()
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let store = sample();
        assert_eq!(collect(store.all()), vec!["B", "C", "A", "D"]);
        assert_eq!(store.first(&3), Some(&"B"));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_remove_promotes_next_node_of_run() {
        let mut store = sample();
        assert_eq!(store.remove(&3), Some("B"));
        assert_eq!(store.first(&3), Some(&"C"));
        assert_eq!(collect(store.all()), vec!["C", "A", "D"]);

        assert_eq!(store.remove(&3), Some("C"));
        assert_eq!(store.first(&3), None);
        assert_eq!(store.remove(&3), None);
        assert_eq!(collect(store.all()), vec!["A", "D"]);
    }

    #[test]
    fn test_remove_head_and_tail() {
        let mut store = sample();
        assert_eq!(store.remove(&7), Some("D"));
        assert_eq!(store.remove(&3), Some("B"));
        assert_eq!(store.remove(&3), Some("C"));
        assert_eq!(collect(store.all()), vec!["A"]);
        assert_eq!(store.remove(&5), Some("A"));
        assert!(store.is_empty());
        assert_eq!(store.all().next(), None);
    }

    #[test]
    fn test_insert_before_head() {
        let mut store = sample();
        store.insert(1, "E");
        assert_eq!(collect(store.all()), vec!["E", "B", "C", "A", "D"]);
        assert_eq!(store.first(&1), Some(&"E"));
    }

    #[test]
    fn test_duplicate_of_last_key_is_visited() {
        let mut store = sample();
        store.insert(7, "F");
        assert_eq!(collect(store.all()), vec!["B", "C", "A", "D", "F"]);
        assert_eq!(collect(store.at(&7)), vec!["D", "F"]);
    }

    #[test]
    fn test_range_operators() {
        let store = sample();
        assert_eq!(collect(store.at(&3)), vec!["B", "C"]);
        assert_eq!(collect(store.at(&4)), Vec::<&str>::new());
        assert_eq!(collect(store.after(&4)), vec!["A", "D"]);
        assert_eq!(collect(store.after(&5)), vec!["A", "D"]);
        assert_eq!(collect(store.before(&5)), vec!["B", "C", "A"]);
        assert_eq!(collect(store.before(&2)), Vec::<&str>::new());
        assert_eq!(collect(store.range(&3, &5)), vec!["B", "C", "A"]);
        assert_eq!(collect(store.range(&4, &6)), vec!["A"]);
        assert_eq!(collect(store.range(&8, &9)), Vec::<&str>::new());
        assert_eq!(collect(store.range(&6, &4)), Vec::<&str>::new());
    }

    #[test]
    fn test_iterators_restart() {
        let store = sample();
        let scan = store.range(&3, &7);
        assert_eq!(scan.clone().count(), 4);
        assert_eq!(store.range(&3, &7).count(), 4);
        assert_eq!(collect(scan), vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_first_mut_updates_in_place() {
        let mut store = sample();
        if let Some(value) = store.first_mut(&5) {
            *value = "Z";
        }
        assert_eq!(collect(store.all()), vec!["B", "C", "Z", "D"]);
        assert!(store.first_mut(&6).is_none());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut store = sample();
        store.remove(&5);
        store.insert(6, "G");
        assert_eq!(store.nodes.len(), 4);
        assert_eq!(collect(store.all()), vec!["B", "C", "G", "D"]);
    }

    #[test]
    fn test_uuid_keys_scan_in_creation_order() {
        use parley_core::Uuid;

        let late = Uuid::new(300, 1, 9);
        let early = Uuid::new(100, 2, 1);
        let middle = Uuid::new(200, 0, 4);
        let store: OrderedStore<Uuid, &str> =
            [(late, "late"), (early, "early"), (middle, "middle")].into_iter().collect();

        assert_eq!(collect(store.all()), vec!["early", "middle", "late"]);
        assert_eq!(collect(store.after(&Uuid::new(150, 0, 0))), vec!["middle", "late"]);
        assert_eq!(store.first(&Uuid::NIL), None);
    }

    #[test]
    fn test_debug_lists_entries_in_order() {
        let store: OrderedStore<u32, u32> = [(2, 20), (1, 10)].into_iter().collect();
        assert_eq!(format!("{:?}", store), "{1: 10, 2: 20}");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => any::<u8>().prop_map(|k| Op::Insert(k % 32)),
            1 => any::<u8>().prop_map(|k| Op::Remove(k % 32)),
        ]
    }

    proptest! {
        #[test]
        fn test_all_is_sorted_and_counts_match(ops in prop::collection::vec(op(), 0..200)) {
            let mut store = OrderedStore::new();
            let mut model: Vec<(u8, usize)> = Vec::new();
            let mut inserted = 0usize;
            let mut removed = 0usize;

            for (seq, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Insert(k) => {
                        store.insert(k, (k, seq));
                        model.push((k, seq));
                        inserted += 1;
                    }
                    Op::Remove(k) => {
                        let expected = model
                            .iter()
                            .position(|(mk, _)| *mk == k)
                            .map(|i| model.remove(i));
                        let got = store.remove(&k);
                        prop_assert_eq!(got, expected);
                        if got.is_some() {
                            removed += 1;
                        }
                    }
                }
            }

            let all: Vec<(u8, usize)> = store.all().copied().collect();
            prop_assert_eq!(all.len(), inserted - removed);
            prop_assert_eq!(store.len(), inserted - removed);
            prop_assert!(all.windows(2).all(|w| w[0].0 <= w[1].0));

            // Stable by key, FIFO within a key.
            let mut expected = model.clone();
            expected.sort_by_key(|(k, _)| *k);
            prop_assert_eq!(all, expected);
        }

        #[test]
        fn test_range_matches_filter(
            keys in prop::collection::vec(0u8..50, 0..100),
            lo in 0u8..50,
            hi in 0u8..50,
        ) {
            let store: OrderedStore<u8, u8> = keys.iter().map(|&k| (k, k)).collect();
            let got: Vec<u8> = store.range(&lo, &hi).copied().collect();
            let mut expected: Vec<u8> = keys.iter().copied().filter(|k| *k >= lo && *k <= hi).collect();
            expected.sort();
            prop_assert_eq!(got, expected);
        }
    }
}
