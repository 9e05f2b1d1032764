//! Absolute-expiry layer over the ARC engine.
//!
//! Every `set` records an expiry instant next to the value. Reads check the
//! record and hide expired values, but leave them in place; physical removal
//! happens in a sweep that runs inline on whichever call wins the
//! [`GcCursor`], at most once per cooldown window.
//!
//! ```text
//!   set(k, v, ttl) ──► records.write() ──► arc.insert(k, v) ──► gc_tick()
//!                        k → now + ttl
//!
//!   get(k) ──► arc.get(k) ──► records.read() ──► expire_at > now ? ──► gc_tick()
//!                              (not removed when expired)
//!
//!   gc_tick():  GcCursor  Idle ──try_begin──► Sweeping ──drop guard──► Idle
//!                          │ busy or within cooldown: return at once
//! ```
//!
//! Lock order is always TTL records, then the ARC engine.
//!
//! ## Example Usage
//!
//! ```
//! use std::time::Duration;
//! use adaptcache::clock::ManualClock;
//! use adaptcache::ttl::{TtlCache, DEFAULT_GC_COOLDOWN};
//!
//! let clock = ManualClock::new();
//! let cache = TtlCache::with_clock(100, DEFAULT_GC_COOLDOWN, clock.clone()).unwrap();
//!
//! cache.set("session", 42, Duration::from_millis(100));
//! assert_eq!(cache.get(&"session"), Some(42));
//!
//! clock.advance(Duration::from_millis(150));
//! assert_eq!(cache.get(&"session"), None);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::TtlMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::{ArcMetricsSnapshot, TtlMetricsSnapshot};
#[cfg(feature = "metrics")]
use crate::metrics::traits::{MetricsSnapshotProvider, TtlMetricsRecorder};
use crate::policy::arc::ConcurrentArcCache;
use crate::traits::ConcurrentCache;

/// Minimum time between two opportunistic sweeps.
pub const DEFAULT_GC_COOLDOWN: Duration = Duration::from_secs(10);

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Sweep state of a [`GcCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GcState {
    Idle = 0,
    Sweeping = 1,
}

impl GcState {
    fn from_u8(raw: u8) -> Self {
        if raw == GcState::Sweeping as u8 {
            GcState::Sweeping
        } else {
            GcState::Idle
        }
    }
}

/// Decides whether a sweep may start now.
///
/// Starting is a single non-blocking `Idle → Sweeping` compare-exchange; a
/// caller that loses the race, or arrives within the cooldown, simply skips
/// the sweep.
#[derive(Debug)]
pub struct GcCursor {
    state: AtomicU8,
    last_sweep_at: Mutex<Instant>,
}

impl GcCursor {
    /// Creates an idle cursor that counts the cooldown from `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            state: AtomicU8::new(GcState::Idle as u8),
            last_sweep_at: Mutex::new(now),
        }
    }

    pub fn state(&self) -> GcState {
        GcState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn last_sweep_at(&self) -> Instant {
        *self.last_sweep_at.lock()
    }

    /// Moves to `Sweeping` if no sweep is running and at least `cooldown`
    /// has passed since the last one.
    pub fn try_begin(&self, now: Instant, cooldown: Duration) -> Option<SweepGuard<'_>> {
        self.state
            .compare_exchange(
                GcState::Idle as u8,
                GcState::Sweeping as u8,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .ok()?;
        let guard = SweepGuard { cursor: self };
        if now.saturating_duration_since(self.last_sweep_at()) < cooldown {
            return None;
        }
        Some(guard)
    }
}

/// Proof of a running sweep. Dropping it returns the cursor to `Idle`, also
/// during unwinding.
#[must_use = "the sweep ends as soon as the guard is dropped"]
pub struct SweepGuard<'a> {
    cursor: &'a GcCursor,
}

impl SweepGuard<'_> {
    /// Records `now` as the time of the last completed sweep.
    pub fn finish(self, now: Instant) {
        *self.cursor.last_sweep_at.lock() = now;
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.cursor
            .state
            .store(GcState::Idle as u8, Ordering::Release);
    }
}

/// Thread-safe ARC cache with per-entry absolute expiry.
pub struct TtlCache<K, V, C = SystemClock> {
    arc: ConcurrentArcCache<K, V>,
    records: RwLock<FxHashMap<K, Instant>>,
    gc: GcCursor,
    gc_cooldown: Duration,
    clock: C,
    #[cfg(feature = "metrics")]
    metrics: TtlMetrics,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with the system clock and the default GC cooldown.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, DEFAULT_GC_COOLDOWN, SystemClock)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Creates a cache with an explicit cooldown and time source.
    pub fn with_clock(capacity: usize, gc_cooldown: Duration, clock: C) -> Result<Self, ConfigError> {
        if gc_cooldown.is_zero() {
            return Err(ConfigError::new("gc cooldown must be greater than zero"));
        }
        let arc = ConcurrentArcCache::try_new(capacity)?;
        debug!(capacity, ?gc_cooldown, "creating TTL cache");
        Ok(Self {
            arc,
            records: RwLock::new(FxHashMap::with_capacity_and_hasher(capacity, Default::default())),
            gc: GcCursor::new(clock.now()),
            gc_cooldown,
            clock,
            #[cfg(feature = "metrics")]
            metrics: TtlMetrics::default(),
        })
    }

    /// Stores `value` for `ttl` from now. A zero `ttl` stores an already
    /// expired entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        let expire_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.set_at(key, value, expire_at);
    }

    /// Stores `value` until the absolute instant `expire_at`.
    pub fn set_at(&self, key: K, value: V, expire_at: Instant) {
        {
            let mut records = self.records.write();
            records.insert(key.clone(), expire_at);
            self.arc.insert(key, value);
        }
        self.gc_tick();
    }

    /// Returns the value if it is resident and not expired.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let found = self.lookup(key);
        self.gc_tick();
        found
    }

    /// Deletes `key` and its expiry record. Returns `true` if either existed.
    pub fn remove(&self, key: &K) -> bool {
        let mut records = self.records.write();
        let had_record = records.remove(key).is_some();
        let had_entry = self.arc.remove(key);
        had_record || had_entry
    }

    /// Checks for a resident, unexpired entry without touching list order.
    pub fn contains_live(&self, key: &K) -> bool {
        let now = self.clock.now();
        let records = self.records.read();
        records.get(key).is_some_and(|at| *at > now) && self.arc.contains(key)
    }

    /// Resident entries, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.arc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arc.is_empty()
    }

    /// Number of expiry records currently held.
    pub fn ttl_records(&self) -> usize {
        self.records.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.arc.capacity()
    }

    pub fn gc_cooldown(&self) -> Duration {
        self.gc_cooldown
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The underlying ARC engine.
    pub fn arc(&self) -> &ConcurrentArcCache<K, V> {
        &self.arc
    }

    pub fn last_sweep_at(&self) -> Instant {
        self.gc.last_sweep_at()
    }

    /// Sweeps now regardless of the cooldown. Returns the number of expired
    /// entries removed, or 0 if another sweep is already running.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        match self.gc.try_begin(now, Duration::ZERO) {
            Some(guard) => {
                let swept = self.sweep(now);
                guard.finish(now);
                swept
            },
            None => 0,
        }
    }

    fn lookup(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let value = self.arc.get(key)?;
        let now = self.clock.now();
        let live = self.records.read().get(key).is_some_and(|at| *at > now);
        if live {
            Some(value)
        } else {
            #[cfg(feature = "metrics")]
            self.metrics.record_expired_read();
            None
        }
    }

    fn gc_tick(&self) {
        let now = self.clock.now();
        match self.gc.try_begin(now, self.gc_cooldown) {
            Some(guard) => {
                self.sweep(now);
                guard.finish(now);
            },
            None => {
                #[cfg(feature = "metrics")]
                self.metrics.record_sweep_skipped();
            },
        }
    }

    /// Removes every expired entry and every record whose key the engine
    /// has already evicted. Caller holds the sweep guard.
    fn sweep(&self, now: Instant) -> usize {
        let started = Instant::now();
        let mut records = self.records.write();
        let mut swept = 0;
        let mut orphans = 0;
        records.retain(|key, expire_at| {
            if *expire_at <= now {
                if self.arc.take(key).is_some() {
                    swept += 1;
                } else {
                    orphans += 1;
                }
                false
            } else if !self.arc.contains(key) {
                orphans += 1;
                false
            } else {
                true
            }
        });
        records.shrink_to_fit();
        let remaining = records.len();
        drop(records);

        #[cfg(feature = "metrics")]
        {
            self.metrics.record_sweep_run();
            self.metrics.record_entries_swept(swept);
            self.metrics.record_orphans_dropped(orphans);
        }
        debug!(swept, orphans, remaining, elapsed = ?started.elapsed(), "TTL sweep finished");
        swept
    }
}

impl<K, V, C> fmt::Debug for TtlCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("gc_cooldown", &self.gc_cooldown)
            .field("gc_state", &self.gc.state())
            .finish_non_exhaustive()
    }
}

impl<K, V, C> ConcurrentCache for TtlCache<K, V, C>
where
    K: Send + Sync,
    V: Send + Sync,
    C: Clock,
{
}

#[cfg(feature = "metrics")]
impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Counters of the underlying ARC engine.
    pub fn arc_snapshot(&self) -> ArcMetricsSnapshot {
        self.arc.snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, C> MetricsSnapshotProvider<TtlMetricsSnapshot> for TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    fn snapshot(&self) -> TtlMetricsSnapshot {
        TtlMetricsSnapshot {
            expired_reads: self.metrics.expired_reads.load(Ordering::Relaxed),
            sweeps_run: self.metrics.sweeps_run.load(Ordering::Relaxed),
            sweeps_skipped: self.metrics.sweeps_skipped.load(Ordering::Relaxed),
            entries_swept: self.metrics.entries_swept.load(Ordering::Relaxed),
            orphans_dropped: self.metrics.orphans_dropped.load(Ordering::Relaxed),
            ttl_records: self.ttl_records(),
        }
    }
}
