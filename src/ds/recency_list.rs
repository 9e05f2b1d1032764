//! Bounded key → value list ordered by recency of use.
//!
//! The mechanism underneath every ARC list. A `RecencyList` knows nothing
//! about policy: it moves touched keys to the front and, when a new key would
//! push it past `capacity`, drops the oldest entry and hands it back.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, SlotId>         list: IntrusiveList<(K, V)>
//!   ┌─────────┬─────────┐
//!   │  key a  │  id_7   │──┐            front                         back
//!   │  key b  │  id_2   │──┼──────────►  [c,3] ◄──► [b,2] ◄──► [a,1]
//!   │  key c  │  id_4   │──┘            newest                       oldest
//!   └─────────┴─────────┘
//! ```
//!
//! ## Operations
//!
//! | Operation       | Time | Notes                                      |
//! |-----------------|------|--------------------------------------------|
//! | `push_front`    | O(1) | Upsert; may return the evicted oldest pair |
//! | `get`           | O(1) | Moves the key to the front                 |
//! | `peek`          | O(1) | No reordering                              |
//! | `remove`        | O(1) |                                            |
//! | `remove_oldest` | O(1) |                                            |
//! | `keys`          | O(n) | Oldest → newest                            |
//!
//! A capacity of zero retains nothing. [`RecencyList::unbounded`] never
//! evicts on its own; callers trim it with [`RecencyList::remove_oldest`].
use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;

/// O(1) recency-ordered map with oldest-first eviction.
pub struct RecencyList<K, V> {
    list: IntrusiveList<(K, V)>,
    index: FxHashMap<K, SlotId>,
    capacity: usize,
}

impl<K, V> RecencyList<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a list that holds at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
        }
    }

    /// Creates a list with no size limit of its own.
    pub fn unbounded() -> Self {
        Self {
            list: IntrusiveList::new(),
            index: FxHashMap::default(),
            capacity: usize::MAX,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or refreshes `key` at the front.
    ///
    /// An existing key has its value replaced and nothing is evicted. A new
    /// key that takes the list past capacity evicts the oldest entry, which is
    /// returned to the caller.
    pub fn push_front(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.list.get_mut(id) {
                entry.1 = value;
            }
            self.list.move_to_front(id);
            return None;
        }

        if self.capacity == 0 {
            return Some((key, value));
        }

        let id = self.list.push_front((key.clone(), value));
        self.index.insert(key, id);

        if self.list.len() > self.capacity {
            return self.remove_oldest();
        }
        None
    }

    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.move_to_front(id);
        self.list.get(id).map(|(_, value)| value)
    }

    /// Returns the value for `key` without touching its position.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = self.index.get(key)?;
        self.list.get(*id).map(|(_, value)| value)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.list.remove(id).map(|(_, value)| value)
    }

    /// Removes and returns the least recently used entry.
    pub fn remove_oldest(&mut self) -> Option<(K, V)> {
        let (key, value) = self.list.pop_back()?;
        self.index.remove(&key);
        Some((key, value))
    }

    /// Returns the least recently used entry without removing it.
    pub fn peek_oldest(&self) -> Option<(&K, &V)> {
        self.list.back().map(|(key, value)| (key, value))
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.list.iter_rev().map(|(key, _)| key)
    }

    /// Values from oldest to newest.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.list.iter_rev().map(|(_, value)| value)
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.list.iter_rev().map(|(key, value)| (key, value))
    }

    /// Changes the capacity, evicting oldest entries as needed. Returns the
    /// number of entries evicted.
    pub fn resize(&mut self, capacity: usize) -> usize {
        let excess = self.len().saturating_sub(capacity);
        for _ in 0..excess {
            self.remove_oldest();
        }
        self.capacity = capacity;
        excess
    }

    pub fn clear(&mut self) {
        self.list.clear_shrink();
        self.index.clear();
        self.index.shrink_to_fit();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.list.debug_validate_invariants();
        assert_eq!(self.list.len(), self.index.len());
        assert!(self.len() <= self.capacity);
        for (key, &id) in &self.index {
            let (stored, _) = self.list.get(id).expect("indexed node missing");
            assert!(stored == key, "index points at a node for another key");
        }
    }
}

impl<K, V> fmt::Debug for RecencyList<K, V>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecencyList")
            .field("len", &self.list.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<K: Eq + Hash + Clone + Copy, V>(list: &RecencyList<K, V>) -> Vec<K> {
        list.keys().copied().collect()
    }

    #[test]
    fn push_front_evicts_oldest_past_capacity() {
        let mut list = RecencyList::new(2);
        assert_eq!(list.push_front("a", 1), None);
        assert_eq!(list.push_front("b", 2), None);
        assert_eq!(list.push_front("c", 3), Some(("a", 1)));
        assert_eq!(keys(&list), vec!["b", "c"]);
        list.debug_validate_invariants();
    }

    #[test]
    fn push_front_existing_key_replaces_without_eviction() {
        let mut list = RecencyList::new(2);
        list.push_front("a", 1);
        list.push_front("b", 2);
        assert_eq!(list.push_front("a", 10), None);
        assert_eq!(list.len(), 2);
        assert_eq!(list.peek(&"a"), Some(&10));
        assert_eq!(keys(&list), vec!["b", "a"]);
    }

    #[test]
    fn get_moves_to_front_and_peek_does_not() {
        let mut list = RecencyList::new(3);
        list.push_front(1, "one");
        list.push_front(2, "two");
        list.push_front(3, "three");

        assert_eq!(list.peek(&1), Some(&"one"));
        assert_eq!(keys(&list), vec![1, 2, 3]);

        assert_eq!(list.get(&1), Some(&"one"));
        assert_eq!(keys(&list), vec![2, 3, 1]);
        assert_eq!(list.peek_oldest(), Some((&2, &"two")));
    }

    #[test]
    fn remove_and_remove_oldest() {
        let mut list = RecencyList::new(3);
        list.push_front("a", 1);
        list.push_front("b", 2);
        list.push_front("c", 3);

        assert_eq!(list.remove(&"b"), Some(2));
        assert_eq!(list.remove(&"b"), None);
        assert_eq!(list.remove_oldest(), Some(("a", 1)));
        assert_eq!(list.remove_oldest(), Some(("c", 3)));
        assert_eq!(list.remove_oldest(), None);
        assert!(list.is_empty());
        list.debug_validate_invariants();
    }

    #[test]
    fn absent_keys_report_not_found() {
        let mut list: RecencyList<&str, i32> = RecencyList::new(2);
        assert_eq!(list.get(&"x"), None);
        assert_eq!(list.peek(&"x"), None);
        assert!(!list.contains(&"x"));
        assert_eq!(list.remove(&"x"), None);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut list = RecencyList::new(0);
        assert_eq!(list.push_front("a", 1), Some(("a", 1)));
        assert!(list.is_empty());
        assert!(!list.contains(&"a"));
    }

    #[test]
    fn unbounded_list_only_shrinks_on_request() {
        let mut list = RecencyList::unbounded();
        for i in 0..100 {
            assert_eq!(list.push_front(i, ()), None);
        }
        assert_eq!(list.len(), 100);
        assert_eq!(list.remove_oldest(), Some((0, ())));
        assert_eq!(list.len(), 99);
    }

    #[test]
    fn resize_evicts_oldest() {
        let mut list = RecencyList::new(4);
        for i in 0..4 {
            list.push_front(i, i * 10);
        }
        assert_eq!(list.resize(2), 2);
        assert_eq!(keys(&list), vec![2, 3]);
        assert_eq!(list.capacity(), 2);
        assert_eq!(list.resize(8), 0);
        list.debug_validate_invariants();
    }

    #[test]
    fn values_follow_key_order() {
        let mut list = RecencyList::new(3);
        list.push_front("a", 1);
        list.push_front("b", 2);
        list.get(&"a");
        assert_eq!(list.values().copied().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(
            list.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
            vec![("b", 2), ("a", 1)]
        );
    }

    #[test]
    fn clear_empties_list() {
        let mut list = RecencyList::new(2);
        list.push_front("a", 1);
        list.clear();
        assert!(list.is_empty());
        assert!(!list.contains(&"a"));
        list.push_front("b", 2);
        assert_eq!(list.len(), 1);
    }
}
