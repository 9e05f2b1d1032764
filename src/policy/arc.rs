//! Adaptive Replacement Cache (ARC) replacement policy.
//!
//! Keeps two resident lists and two ghost lists and moves a split target `p`
//! between them based on which ghost list the workload keeps hitting.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ArcCore<K, V> Layout                          │
//! │                                                                         │
//! │   T1 (seen once)                       T2 (seen at least twice)         │
//! │   RecencyList<K, V>                    RecencyList<K, V>                │
//! │   ┌─────────────────────────┐          ┌─────────────────────────┐      │
//! │   │ MRU               LRU   │          │ MRU               LRU   │      │
//! │   │ [k7] ◄──► [k3] ◄──► [k1]│          │ [k2] ◄──► [k9] ◄──► [k4]│      │
//! │   └────────────────────┬────┘          └────────────────────┬────┘      │
//! │                        │ evict                              │ evict     │
//! │                        ▼                                    ▼           │
//! │   B1 (ghosts of T1)                    B2 (ghosts of T2)                │
//! │   GhostList<K>, keys only              GhostList<K>, keys only          │
//! │                                                                         │
//! │   p: target size of T1, 0 ≤ p ≤ capacity                                │
//! │   • hit in B1 → p grows   (recency is paying off)                       │
//! │   • hit in B2 → p shrinks (frequency is paying off)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Operation          | T1 hit        | T2 hit     | B1 hit            | B2 hit            | miss        |
//! |--------------------|---------------|------------|-------------------|-------------------|-------------|
//! | `get`              | move to T2    | refresh    | miss              | miss              | miss        |
//! | `insert`           | move to T2    | overwrite  | p↑, replace, → T2 | p↓, replace, → T2 | replace, → T1 |
//!
//! `replace` evicts the oldest entry of T1 into B1 when T1 is over its target
//! (or exactly on target and the triggering key came from B2), otherwise the
//! oldest entry of T2 into B2.
//!
//! After every insert the ghost lists are trimmed so that `|B1| ≤ c - p` and
//! `|B2| ≤ p`, which keeps `|B1| + |B2| ≤ c` at all times.
//!
//! ## Invariants
//!
//! - `|T1| + |T2| ≤ capacity`
//! - `|B1| + |B2| ≤ capacity`
//! - `0 ≤ p ≤ capacity`
//! - each key lives in at most one of T1, T2, B1, B2
//!
//! ## Thread Safety
//!
//! [`ArcCore`] is single-threaded. [`ConcurrentArcCache`] wraps it in a
//! `parking_lot::RwLock`; lookups that reorder lists take the write lock.
//!
//! ## Example Usage
//!
//! ```
//! use adaptcache::policy::arc::{ArcCore, Residency};
//!
//! let mut cache = ArcCore::new(2);
//! cache.insert("a", 1);
//! cache.insert("b", 2);
//! assert_eq!(cache.get(&"a"), Some(&1)); // a moves to T2
//! cache.insert("c", 3);                  // b is evicted from T1
//!
//! assert_eq!(cache.residency(&"b"), Some(Residency::B1));
//! assert_eq!(cache.residency(&"a"), Some(Residency::T2));
//! assert_eq!(cache.len(), 2);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::ds::{GhostList, RecencyList};
use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ArcMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::ArcMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{ArcMetricsRecorder, CoreMetricsRecorder, MetricsSnapshotProvider};
use crate::traits::{ConcurrentCache, CoreCache, ReadOnlyCache};

/// Which of the four lists currently tracks a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Residency {
    /// Resident, seen once.
    T1,
    /// Resident, seen at least twice.
    T2,
    /// Ghost of a T1 eviction.
    B1,
    /// Ghost of a T2 eviction.
    B2,
}

impl Residency {
    pub fn is_resident(self) -> bool {
        matches!(self, Residency::T1 | Residency::T2)
    }
}

/// Single-threaded ARC engine.
pub struct ArcCore<K, V> {
    t1: RecencyList<K, V>,
    t2: RecencyList<K, V>,
    b1: GhostList<K>,
    b2: GhostList<K>,
    p: usize,
    capacity: usize,
    #[cfg(feature = "metrics")]
    metrics: ArcMetrics,
}

impl<K, V> ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an engine holding at most `capacity` resident entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`ArcCore::try_new`] to get an error
    /// instead.
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Creates an engine, rejecting a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        debug!(capacity, "creating ARC engine");
        Ok(Self {
            t1: RecencyList::unbounded(),
            t2: RecencyList::unbounded(),
            b1: GhostList::new(),
            b2: GhostList::new(),
            p: 0,
            capacity,
            #[cfg(feature = "metrics")]
            metrics: ArcMetrics::default(),
        })
    }

    /// Looks up `key`. A hit in T1 promotes the entry to T2; a hit in T2
    /// refreshes its position. Ghost entries are misses.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(value) = self.t1.remove(key) {
            #[cfg(feature = "metrics")]
            {
                self.metrics.record_get_hit();
                self.metrics.record_t1_to_t2_promotion();
            }
            self.t2.push_front(key.clone(), value);
            return self.t2.peek(key);
        }
        if self.t2.contains(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_hit();
            return self.t2.get(key);
        }
        #[cfg(feature = "metrics")]
        self.metrics.record_get_miss();
        None
    }

    /// Inserts or overwrites `key`.
    pub fn insert(&mut self, key: K, value: V) {
        match self.locate(&key) {
            Some(Residency::T1) => {
                self.t1.remove(&key);
                self.t2.push_front(key, value);
                #[cfg(feature = "metrics")]
                {
                    self.metrics.record_insert_update();
                    self.metrics.record_t1_to_t2_promotion();
                }
            },
            Some(Residency::T2) => {
                self.t2.push_front(key, value);
                #[cfg(feature = "metrics")]
                self.metrics.record_insert_update();
            },
            Some(Residency::B1) => {
                let delta = ghost_delta(self.b2.len(), self.b1.len());
                self.adapt_up(delta);
                if self.resident_len() >= self.capacity {
                    self.replace(false);
                }
                self.b1.remove(&key);
                self.t2.push_front(key, value);
                self.trim_ghosts();
                #[cfg(feature = "metrics")]
                {
                    self.metrics.record_insert_new();
                    self.metrics.record_b1_ghost_hit();
                }
            },
            Some(Residency::B2) => {
                let delta = ghost_delta(self.b1.len(), self.b2.len());
                self.adapt_down(delta);
                if self.resident_len() >= self.capacity {
                    self.replace(true);
                }
                self.b2.remove(&key);
                self.t2.push_front(key, value);
                self.trim_ghosts();
                #[cfg(feature = "metrics")]
                {
                    self.metrics.record_insert_new();
                    self.metrics.record_b2_ghost_hit();
                }
            },
            None => {
                if self.resident_len() >= self.capacity {
                    self.replace(false);
                }
                self.trim_ghosts();
                self.t1.push_front(key, value);
                #[cfg(feature = "metrics")]
                self.metrics.record_insert_new();
            },
        }
    }

    /// Forgets `key` wherever it is tracked, resident or ghost. Returns
    /// `true` if anything was removed.
    pub fn remove(&mut self, key: &K) -> bool {
        let removed = self.t1.remove(key).is_some()
            || self.t2.remove(key).is_some()
            || self.b1.remove(key)
            || self.b2.remove(key);
        #[cfg(feature = "metrics")]
        if removed {
            self.metrics.record_remove();
        }
        removed
    }

    /// Removes a resident entry and returns its value. Ghost entries are left
    /// in place.
    pub fn take(&mut self, key: &K) -> Option<V> {
        let value = self.t1.remove(key).or_else(|| self.t2.remove(key));
        #[cfg(feature = "metrics")]
        if value.is_some() {
            self.metrics.record_remove();
        }
        value
    }

    /// Reads a resident value without touching list order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.t1.peek(key).or_else(|| self.t2.peek(key))
    }

    /// Checks residency without touching list order.
    pub fn contains(&self, key: &K) -> bool {
        self.t1.contains(key) || self.t2.contains(key)
    }

    pub fn len(&self) -> usize {
        self.resident_len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident_len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resident keys: T1 oldest to newest, then T2 oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.t1.keys().chain(self.t2.keys())
    }

    /// Resident values, in the same order as [`ArcCore::keys`].
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.t1.values().chain(self.t2.values())
    }

    /// Drops every entry and ghost and resets `p` to zero.
    pub fn clear(&mut self) {
        self.t1.clear();
        self.t2.clear();
        self.b1.clear();
        self.b2.clear();
        self.p = 0;
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }

    /// Current target size of T1.
    pub fn p_value(&self) -> usize {
        self.p
    }

    pub fn t1_len(&self) -> usize {
        self.t1.len()
    }

    pub fn t2_len(&self) -> usize {
        self.t2.len()
    }

    pub fn b1_len(&self) -> usize {
        self.b1.len()
    }

    pub fn b2_len(&self) -> usize {
        self.b2.len()
    }

    /// Which list tracks `key`, if any.
    pub fn residency(&self, key: &K) -> Option<Residency> {
        if self.t1.contains(key) {
            Some(Residency::T1)
        } else if self.t2.contains(key) {
            Some(Residency::T2)
        } else if self.b1.contains(key) {
            Some(Residency::B1)
        } else if self.b2.contains(key) {
            Some(Residency::B2)
        } else {
            None
        }
    }

    /// Verifies the size bounds and single residency of every key.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.resident_len() > self.capacity {
            return Err(InvariantError::new(format!(
                "resident entries {} exceed capacity {}",
                self.resident_len(),
                self.capacity
            )));
        }
        if self.b1.len() + self.b2.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "ghost entries {} + {} exceed capacity {}",
                self.b1.len(),
                self.b2.len(),
                self.capacity
            )));
        }
        if self.p > self.capacity {
            return Err(InvariantError::new(format!(
                "p {} exceeds capacity {}",
                self.p, self.capacity
            )));
        }
        for key in self.t1.keys() {
            if self.t2.contains(key) || self.b1.contains(key) || self.b2.contains(key) {
                return Err(InvariantError::new("T1 key tracked in another list"));
            }
        }
        for key in self.t2.keys() {
            if self.b1.contains(key) || self.b2.contains(key) {
                return Err(InvariantError::new("T2 key tracked in a ghost list"));
            }
        }
        if self.b1.keys().any(|key| self.b2.contains(key)) {
            return Err(InvariantError::new("key tracked in both ghost lists"));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.t1.debug_validate_invariants();
        self.t2.debug_validate_invariants();
        self.b1.debug_validate_invariants();
        self.b2.debug_validate_invariants();
        if let Err(err) = self.check_invariants() {
            panic!("ARC invariant violated: {err}");
        }
    }

    fn resident_len(&self) -> usize {
        self.t1.len() + self.t2.len()
    }

    /// Like [`ArcCore::residency`], but repairs a key found in more than one
    /// list by keeping only its highest-priority position.
    fn locate(&mut self, key: &K) -> Option<Residency> {
        let found = self.residency(key)?;
        let duplicates = [
            (Residency::T2, self.t2.contains(key)),
            (Residency::B1, self.b1.contains(key)),
            (Residency::B2, self.b2.contains(key)),
        ];
        for (list, present) in duplicates {
            if !present {
                continue;
            }
            debug_assert_eq!(list, found, "key tracked in two ARC lists");
            if list != found {
                warn!(?found, duplicate = ?list, "dropping duplicate ARC entry");
                match list {
                    Residency::T2 => {
                        self.t2.remove(key);
                    },
                    Residency::B1 => {
                        self.b1.remove(key);
                    },
                    Residency::B2 => {
                        self.b2.remove(key);
                    },
                    Residency::T1 => {},
                }
            }
        }
        Some(found)
    }

    fn adapt_up(&mut self, delta: usize) {
        let before = self.p;
        self.p = (self.p + delta).min(self.capacity);
        trace!(before, after = self.p, "B1 ghost hit, favoring recency");
        #[cfg(feature = "metrics")]
        if self.p != before {
            self.metrics.record_p_increase();
        }
    }

    fn adapt_down(&mut self, delta: usize) {
        let before = self.p;
        self.p = self.p.saturating_sub(delta);
        trace!(before, after = self.p, "B2 ghost hit, favoring frequency");
        #[cfg(feature = "metrics")]
        if self.p != before {
            self.metrics.record_p_decrease();
        }
    }

    /// Evicts one resident entry into its ghost list.
    fn replace(&mut self, from_b2: bool) {
        let t1_len = self.t1.len();
        let evict_t1 =
            t1_len > 0 && (t1_len > self.p || (t1_len == self.p && from_b2) || self.t2.is_empty());
        if evict_t1 {
            if let Some((key, _)) = self.t1.remove_oldest() {
                self.b1.record(key);
                #[cfg(feature = "metrics")]
                self.metrics.record_t1_eviction();
            }
        } else if let Some((key, _)) = self.t2.remove_oldest() {
            self.b2.record(key);
            #[cfg(feature = "metrics")]
            self.metrics.record_t2_eviction();
        }
    }

    fn trim_ghosts(&mut self) {
        self.b1.trim_to(self.capacity - self.p);
        self.b2.trim_to(self.p);
    }
}

/// Step applied to `p` on a ghost hit: the size ratio of the other ghost list
/// to the hit one, at least 1.
fn ghost_delta(other: usize, hit: usize) -> usize {
    if hit > 0 && other > hit {
        other / hit
    } else {
        1
    }
}

impl<K, V> fmt::Debug for ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcCore")
            .field("capacity", &self.capacity)
            .field("p", &self.p)
            .field("t1_len", &self.t1.len())
            .field("t2_len", &self.t2.len())
            .field("b1_len", &self.b1.len())
            .field("b2_len", &self.b2.len())
            .finish_non_exhaustive()
    }
}

impl<K, V> ReadOnlyCache<K, V> for ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn contains(&self, key: &K) -> bool {
        ArcCore::contains(self, key)
    }

    fn len(&self) -> usize {
        ArcCore::len(self)
    }

    fn capacity(&self) -> usize {
        ArcCore::capacity(self)
    }
}

impl<K, V> CoreCache<K, V> for ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn insert(&mut self, key: K, value: V) {
        ArcCore::insert(self, key, value)
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        ArcCore::get(self, key)
    }

    fn clear(&mut self) {
        ArcCore::clear(self)
    }
}

#[cfg(feature = "metrics")]
impl<K, V> ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn metrics_snapshot(&self) -> ArcMetricsSnapshot {
        ArcMetricsSnapshot {
            get_calls: self.metrics.get_calls,
            get_hits: self.metrics.get_hits,
            get_misses: self.metrics.get_misses,
            insert_calls: self.metrics.insert_calls,
            insert_updates: self.metrics.insert_updates,
            insert_new: self.metrics.insert_new,
            evicted_entries: self.metrics.evicted_entries,
            removals: self.metrics.removals,
            t1_to_t2_promotions: self.metrics.t1_to_t2_promotions,
            b1_ghost_hits: self.metrics.b1_ghost_hits,
            b2_ghost_hits: self.metrics.b2_ghost_hits,
            p_increases: self.metrics.p_increases,
            p_decreases: self.metrics.p_decreases,
            t1_evictions: self.metrics.t1_evictions,
            t2_evictions: self.metrics.t2_evictions,
            cache_len: self.t1.len() + self.t2.len(),
            capacity: self.capacity,
            p_value: self.p,
            b1_len: self.b1.len(),
            b2_len: self.b2.len(),
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<ArcMetricsSnapshot> for ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> ArcMetricsSnapshot {
        self.metrics_snapshot()
    }
}

/// Thread-safe ARC cache: an [`ArcCore`] behind a `parking_lot::RwLock`.
///
/// Clones share the same engine. `get` reorders lists and therefore takes the
/// write lock; `peek`, `contains` and the size accessors take the read lock.
///
/// ```
/// use adaptcache::policy::arc::ConcurrentArcCache;
///
/// let cache = ConcurrentArcCache::new(100);
/// let handle = cache.clone();
/// std::thread::spawn(move || handle.insert(1u32, "one".to_string()))
///     .join()
///     .unwrap();
/// assert_eq!(cache.get(&1), Some("one".to_string()));
/// ```
pub struct ConcurrentArcCache<K, V> {
    inner: Arc<RwLock<ArcCore<K, V>>>,
}

impl<K, V> Clone for ConcurrentArcCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> ConcurrentArcCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::from_core(ArcCore::new(capacity))
    }

    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        ArcCore::try_new(capacity).map(Self::from_core)
    }

    pub fn from_core(core: ArcCore<K, V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(core)),
        }
    }

    /// Looks up `key` and returns a clone of the value.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.write().get(key).cloned()
    }

    /// Looks up `key` and applies `f` to the value under the lock.
    pub fn get_with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.inner.write().get(key).map(f)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.write().insert(key, value);
    }

    pub fn remove(&self, key: &K) -> bool {
        self.inner.write().remove(key)
    }

    pub fn take(&self, key: &K) -> Option<V> {
        self.inner.write().take(key)
    }

    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().peek(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    /// Resident keys in [`ArcCore::keys`] order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn p_value(&self) -> usize {
        self.inner.read().p_value()
    }

    pub fn residency(&self, key: &K) -> Option<Residency> {
        self.inner.read().residency(key)
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants()
    }
}

impl<K, V> fmt::Debug for ConcurrentArcCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentArcCache").finish_non_exhaustive()
    }
}

impl<K, V> ConcurrentCache for ConcurrentArcCache<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<ArcMetricsSnapshot> for ConcurrentArcCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> ArcMetricsSnapshot {
        self.inner.read().metrics_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_of(cache: &ArcCore<&'static str, i32>) -> Vec<&'static str> {
        cache.keys().copied().collect()
    }

    #[test]
    fn new_key_enters_t1() {
        let mut cache = ArcCore::new(4);
        cache.insert("a", 1);
        assert_eq!(cache.residency(&"a"), Some(Residency::T1));
        assert!(Residency::T1.is_resident());
        assert!(!Residency::B1.is_resident());
        assert_eq!(cache.t1_len(), 1);
        assert_eq!(cache.p_value(), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(ArcCore::<u32, u32>::try_new(0).is_err());
        assert!(ConcurrentArcCache::<u32, u32>::try_new(0).is_err());
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn new_panics_on_zero_capacity() {
        let _ = ArcCore::<u32, u32>::new(0);
    }

    #[test]
    fn overflow_demotes_oldest_t1_entry_to_b1() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.residency(&"a"), Some(Residency::B1));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(keys_of(&cache), vec!["b", "c"]);
        cache.debug_validate_invariants();
    }

    #[test]
    fn accessed_entry_survives_overflow() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(&1));
        cache.insert("c", 3);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
        assert_eq!(cache.residency(&"b"), Some(Residency::B1));
    }

    #[test]
    fn get_promotes_t1_hit_to_t2() {
        let mut cache = ArcCore::new(3);
        cache.insert("a", 1);
        cache.get(&"a");
        assert_eq!(cache.residency(&"a"), Some(Residency::T2));
        assert_eq!(cache.t1_len(), 0);
        assert_eq!(cache.t2_len(), 1);
    }

    #[test]
    fn reinsert_of_t1_key_moves_to_t2_with_new_value() {
        let mut cache = ArcCore::new(3);
        cache.insert("a", 1);
        cache.insert("a", 10);
        assert_eq!(cache.residency(&"a"), Some(Residency::T2));
        assert_eq!(cache.peek(&"a"), Some(&10));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reinsert_of_t2_key_overwrites_and_refreshes() {
        let mut cache = ArcCore::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get(&"a");
        cache.get(&"b");
        cache.insert("a", 100);
        assert_eq!(cache.peek(&"a"), Some(&100));
        // b is now the oldest T2 entry
        assert_eq!(keys_of(&cache), vec!["b", "a"]);
    }

    #[test]
    fn b1_ghost_hit_raises_p_and_lands_in_t2() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3); // a -> B1

        cache.insert("a", 10);
        assert_eq!(cache.p_value(), 1);
        assert_eq!(cache.residency(&"a"), Some(Residency::T2));
        assert_eq!(cache.residency(&"b"), Some(Residency::B1));
        assert_eq!(cache.peek(&"a"), Some(&10));
        assert_eq!(cache.len(), 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn b2_ghost_hit_lowers_p() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3); // a -> B1
        cache.insert("a", 1); // p = 1, b -> B1, a in T2
        cache.insert("c", 3); // c: T1 -> T2; T2 = [a, c]
        cache.insert("d", 4); // T1 empty, evict a from T2 -> B2
        assert_eq!(cache.residency(&"a"), Some(Residency::B2));
        let before = cache.p_value();
        assert!(before > 0);

        cache.insert("a", 1);
        assert_eq!(cache.p_value(), before - 1);
        assert_eq!(cache.residency(&"a"), Some(Residency::T2));
        cache.debug_validate_invariants();
    }

    #[test]
    fn p_never_exceeds_capacity() {
        let mut cache = ArcCore::new(3);
        for round in 0..20 {
            for key in 0..6 {
                cache.insert(key, round);
            }
            assert!(cache.p_value() <= cache.capacity());
            cache.debug_validate_invariants();
        }
    }

    #[test]
    fn ghost_delta_uses_size_ratio() {
        assert_eq!(ghost_delta(0, 1), 1);
        assert_eq!(ghost_delta(1, 1), 1);
        assert_eq!(ghost_delta(6, 2), 3);
        assert_eq!(ghost_delta(7, 2), 3);
        assert_eq!(ghost_delta(5, 0), 1);
    }

    #[test]
    fn remove_covers_resident_and_ghost_entries() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3); // a -> B1

        assert!(cache.remove(&"a"));
        assert_eq!(cache.residency(&"a"), None);
        assert!(cache.remove(&"b"));
        assert!(!cache.contains(&"b"));
        assert!(!cache.remove(&"missing"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn take_returns_value_and_leaves_ghosts() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3); // a -> B1

        assert_eq!(cache.take(&"b"), Some(2));
        assert_eq!(cache.take(&"a"), None);
        assert_eq!(cache.residency(&"a"), Some(Residency::B1));
    }

    #[test]
    fn peek_does_not_promote() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.residency(&"a"), Some(Residency::T1));
    }

    #[test]
    fn keys_list_t1_then_t2_oldest_first() {
        let mut cache = ArcCore::new(4);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        cache.get(&"b");
        assert_eq!(keys_of(&cache), vec!["a", "c", "b"]);
        assert_eq!(cache.values().copied().collect::<Vec<_>>(), vec![1, 3, 2]);
    }

    #[test]
    fn clear_resets_lists_and_p() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        cache.insert("a", 1);
        assert!(cache.p_value() > 0);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.p_value(), 0);
        assert_eq!(cache.b1_len() + cache.b2_len(), 0);
        assert_eq!(cache.residency(&"a"), None);
    }

    #[test]
    fn capacity_one_keeps_latest_key() {
        let mut cache = ArcCore::new(1);
        cache.insert(1, "one");
        cache.insert(2, "two");
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2));
        cache.insert(1, "one"); // B1 hit
        assert!(cache.contains(&1));
        assert_eq!(cache.len(), 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn frequent_set_survives_scan() {
        let mut cache = ArcCore::new(10);
        for key in 0..5 {
            cache.insert(key, key);
            cache.get(&key);
        }
        for key in 100..200 {
            cache.insert(key, key);
        }
        for key in 0..5 {
            assert!(cache.contains(&key), "hot key {key} was evicted by a scan");
        }
    }

    #[test]
    fn check_invariants_reports_ok_after_mixed_workload() {
        let mut cache = ArcCore::new(8);
        for i in 0..200u32 {
            let key = (i * 7) % 23;
            if i % 3 == 0 {
                cache.get(&key);
            } else if i % 11 == 0 {
                cache.remove(&key);
            } else {
                cache.insert(key, i);
            }
            assert!(cache.check_invariants().is_ok());
        }
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn metrics_track_hits_and_ghosts() {
        let mut cache = ArcCore::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get(&"a");
        cache.get(&"zzz");
        cache.insert("c", 3); // b -> B1
        cache.insert("b", 2); // B1 hit

        let snap = cache.snapshot();
        assert_eq!(snap.get_hits, 1);
        assert_eq!(snap.get_misses, 1);
        assert_eq!(snap.t1_to_t2_promotions, 1);
        assert_eq!(snap.b1_ghost_hits, 1);
        assert_eq!(snap.p_increases, 1);
        assert_eq!(snap.cache_len, 2);
        assert_eq!(snap.capacity, 2);
        assert!(snap.t1_evictions >= 1);
    }

    #[test]
    fn concurrent_wrapper_delegates() {
        let cache = ConcurrentArcCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get_with(&"a", |v| v * 10), Some(10));
        cache.insert("c", 3);
        assert_eq!(cache.residency(&"b"), Some(Residency::B1));
        assert_eq!(cache.peek(&"c"), Some(3));
        assert_eq!(cache.keys(), vec!["c", "a"]);
        assert!(cache.remove(&"b"));
        assert_eq!(cache.take(&"c"), Some(3));
        assert_eq!(cache.len(), 1);
        assert!(cache.check_invariants().is_ok());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn concurrent_wrapper_is_shareable() {
        fn assert_concurrent<C: ConcurrentCache>() {}
        assert_concurrent::<ConcurrentArcCache<String, Vec<u8>>>();
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Operation {
            Insert(u32, u32),
            Get(u32),
            Remove(u32),
        }

        fn operation_strategy() -> impl Strategy<Value = Operation> {
            prop_oneof![
                4 => (0u32..40, any::<u32>()).prop_map(|(k, v)| Operation::Insert(k, v)),
                3 => (0u32..40).prop_map(Operation::Get),
                1 => (0u32..40).prop_map(Operation::Remove),
            ]
        }

        proptest! {
            /// Arbitrary operation sequences keep every bound and single residency.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_arbitrary_ops_maintain_invariants(
                capacity in 1usize..20,
                ops in prop::collection::vec(operation_strategy(), 0..300)
            ) {
                let mut cache = ArcCore::new(capacity);
                for op in ops {
                    match op {
                        Operation::Insert(k, v) => cache.insert(k, v),
                        Operation::Get(k) => { cache.get(&k); },
                        Operation::Remove(k) => { cache.remove(&k); },
                    }
                    prop_assert!(cache.check_invariants().is_ok());
                    prop_assert!(cache.len() <= capacity);
                    prop_assert!(cache.b1_len() + cache.b2_len() <= capacity);
                }
            }

            /// The last value written for a resident key is the one read back.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_resident_values_are_latest(
                capacity in 1usize..20,
                ops in prop::collection::vec((0u32..30, any::<u32>()), 0..200)
            ) {
                let mut cache = ArcCore::new(capacity);
                let mut latest = std::collections::HashMap::new();
                for (k, v) in ops {
                    cache.insert(k, v);
                    latest.insert(k, v);
                }
                for (k, v) in &latest {
                    if let Some(found) = cache.peek(k) {
                        prop_assert_eq!(found, v);
                    }
                }
            }
        }
    }
}
