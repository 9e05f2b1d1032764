//! # Metrics Trait Hierarchy
//!
//! Recording and snapshotting are split into small traits so the cache
//! structures only ever write counters and readers only ever take snapshots.
//!
//! ```text
//!   ┌─────────────────────────────┐
//!   │     CoreMetricsRecorder     │   get hit/miss, insert new/update,
//!   │          (&mut self)        │   eviction, removal, clear
//!   └──────────────┬──────────────┘
//!                  ▼
//!   ┌─────────────────────────────┐
//!   │     ArcMetricsRecorder      │   promotions, ghost hits, p moves,
//!   │          (&mut self)        │   T1/T2 evictions
//!   └─────────────────────────────┘
//!
//!   ┌─────────────────────────────┐   ┌─────────────────────────────┐
//!   │     TtlMetricsRecorder      │   │    LoaderMetricsRecorder    │
//!   │      (&self, atomics)       │   │      (&self, atomics)       │
//!   └─────────────────────────────┘   └─────────────────────────────┘
//!
//!   Consumption:
//!   ┌─────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>  │
//!   └─────────────────────────────┘
//! ```
//!
//! The ARC engine records under its own lock, so its recorder takes
//! `&mut self`. The TTL wrapper and the loader are shared across threads and
//! record through atomics.

/// Common counters for the replacement engine.
pub trait CoreMetricsRecorder {
    fn record_get_hit(&mut self);
    fn record_get_miss(&mut self);
    fn record_insert_new(&mut self);
    fn record_insert_update(&mut self);
    fn record_evicted_entry(&mut self);
    fn record_remove(&mut self);
    fn record_clear(&mut self);
}

/// ARC-specific signals.
pub trait ArcMetricsRecorder: CoreMetricsRecorder {
    fn record_t1_to_t2_promotion(&mut self);
    fn record_b1_ghost_hit(&mut self);
    fn record_b2_ghost_hit(&mut self);
    fn record_p_increase(&mut self);
    fn record_p_decrease(&mut self);
    fn record_t1_eviction(&mut self);
    fn record_t2_eviction(&mut self);
}

/// Expiry and garbage collection signals.
pub trait TtlMetricsRecorder {
    fn record_expired_read(&self);
    fn record_sweep_run(&self);
    fn record_sweep_skipped(&self);
    fn record_entries_swept(&self, n: usize);
    fn record_orphans_dropped(&self, n: usize);
}

/// Coalescing loader signals.
pub trait LoaderMetricsRecorder {
    fn record_cache_hit(&self);
    fn record_producer_run(&self);
    fn record_shared_result(&self);
    fn record_producer_failure(&self);
}

/// Produces a point-in-time copy of a cache's counters.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Publishes snapshots to a monitoring system.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
