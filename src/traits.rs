//! # Cache Trait Hierarchy
//!
//! Small trait surface shared by the single-threaded cache structures, so
//! benchmarks and tests can drive a plain recency list and the ARC engine
//! through the same code.
//!
//! ```text
//!   ┌──────────────────────────────┐
//!   │     ReadOnlyCache<K, V>      │   contains / len / is_empty / capacity
//!   └──────────────┬───────────────┘
//!                  │
//!                  ▼
//!   ┌──────────────────────────────┐
//!   │       CoreCache<K, V>        │   insert / get / clear
//!   └──────────────────────────────┘
//!
//!   ┌──────────────────────────────┐
//!   │       ConcurrentCache        │   marker: Send + Sync, &self API
//!   └──────────────────────────────┘
//! ```
//!
//! | Implementor               | ReadOnly | Core | Concurrent |
//! |---------------------------|----------|------|------------|
//! | `RecencyList<K, V>`       | ✅       | ✅   |            |
//! | `ArcCore<K, V>`           | ✅       | ✅   |            |
//! | `ConcurrentArcCache<K, V>`|          |      | ✅         |
//! | `TtlCache<K, V, C>`       |          |      | ✅         |
//! | `Loader<K, V, C>`         |          |      | ✅         |
//!
//! ## Example Usage
//!
//! ```
//! use adaptcache::policy::arc::ArcCore;
//! use adaptcache::traits::{CoreCache, ReadOnlyCache};
//!
//! fn warm<C: CoreCache<u64, String>>(cache: &mut C, data: &[(u64, &str)]) {
//!     for (key, value) in data {
//!         cache.insert(*key, value.to_string());
//!     }
//! }
//!
//! let mut cache = ArcCore::new(16);
//! warm(&mut cache, &[(1, "one"), (2, "two")]);
//! assert_eq!(cache.len(), 2);
//! ```

use std::hash::Hash;

use crate::ds::RecencyList;

/// Inspection without side effects on eviction order.
pub trait ReadOnlyCache<K, V> {
    /// Checks residency without touching recency or frequency.
    fn contains(&self, key: &K) -> bool;

    /// Number of resident entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of resident entries.
    fn capacity(&self) -> usize;
}

/// Operations every single-threaded cache supports.
pub trait CoreCache<K, V>: ReadOnlyCache<K, V> {
    /// Inserts or overwrites `key`, evicting according to the policy.
    fn insert(&mut self, key: K, value: V);

    /// Looks up `key`, updating policy state on a hit.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Drops every entry and all policy history.
    fn clear(&mut self);
}

/// Marker for caches that are safe to share across threads and expose a
/// `&self` API guarded by internal locks.
pub trait ConcurrentCache: Send + Sync {}

impl<K, V> ReadOnlyCache<K, V> for RecencyList<K, V>
where
    K: Eq + Hash + Clone,
{
    fn contains(&self, key: &K) -> bool {
        RecencyList::contains(self, key)
    }

    fn len(&self) -> usize {
        RecencyList::len(self)
    }

    fn capacity(&self) -> usize {
        RecencyList::capacity(self)
    }
}

impl<K, V> CoreCache<K, V> for RecencyList<K, V>
where
    K: Eq + Hash + Clone,
{
    fn insert(&mut self, key: K, value: V) {
        self.push_front(key, value);
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        RecencyList::get(self, key)
    }

    fn clear(&mut self) {
        RecencyList::clear(self)
    }
}
