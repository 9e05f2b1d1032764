//! Key-only recency list for ARC ghost tracking.
//!
//! Holds the keys recently evicted from a resident list, without their values.
//! The list never evicts on its own; the policy trims it with
//! [`GhostList::trim_to`] once it knows the current split target.
//!
//! ```text
//!   RecencyList<K, ()>
//!   front ─► [k9] ◄──► [k4] ◄──► [k1] ◄── back
//!            newest              oldest  (trimmed first)
//! ```
use std::hash::Hash;

use crate::ds::recency_list::RecencyList;

/// Recently evicted keys, newest at the front.
#[derive(Debug)]
pub struct GhostList<K> {
    keys: RecencyList<K, ()>,
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            keys: RecencyList::unbounded(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    /// Records `key` as the most recently evicted.
    pub fn record(&mut self, key: K) {
        self.keys.push_front(key, ());
    }

    /// Forgets `key`; returns `true` if it was tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        self.keys.remove(key).is_some()
    }

    /// Drops the oldest keys until at most `max_len` remain. Returns how many
    /// were dropped.
    pub fn trim_to(&mut self, max_len: usize) -> usize {
        let mut dropped = 0;
        while self.keys.len() > max_len && self.keys.remove_oldest().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.keys.keys()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.keys.debug_validate_invariants();
    }
}

impl<K> Default for GhostList<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
