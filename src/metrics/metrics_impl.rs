use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::traits::{
    ArcMetricsRecorder, CoreMetricsRecorder, LoaderMetricsRecorder, TtlMetricsRecorder,
};

// ---------------------------------------------------------------------------
// ArcMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ArcMetrics {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,
    pub insert_calls: u64,
    pub insert_updates: u64,
    pub insert_new: u64,
    pub evicted_entries: u64,
    pub removals: u64,
    pub t1_to_t2_promotions: u64,
    pub b1_ghost_hits: u64,
    pub b2_ghost_hits: u64,
    pub p_increases: u64,
    pub p_decreases: u64,
    pub t1_evictions: u64,
    pub t2_evictions: u64,
}

impl CoreMetricsRecorder for ArcMetrics {
    fn record_get_hit(&mut self) {
        self.get_calls += 1;
        self.get_hits += 1;
    }
    fn record_get_miss(&mut self) {
        self.get_calls += 1;
        self.get_misses += 1;
    }
    fn record_insert_new(&mut self) {
        self.insert_calls += 1;
        self.insert_new += 1;
    }
    fn record_insert_update(&mut self) {
        self.insert_calls += 1;
        self.insert_updates += 1;
    }
    fn record_evicted_entry(&mut self) {
        self.evicted_entries += 1;
    }
    fn record_remove(&mut self) {
        self.removals += 1;
    }
    fn record_clear(&mut self) {}
}

impl ArcMetricsRecorder for ArcMetrics {
    fn record_t1_to_t2_promotion(&mut self) {
        self.t1_to_t2_promotions += 1;
    }
    fn record_b1_ghost_hit(&mut self) {
        self.b1_ghost_hits += 1;
    }
    fn record_b2_ghost_hit(&mut self) {
        self.b2_ghost_hits += 1;
    }
    fn record_p_increase(&mut self) {
        self.p_increases += 1;
    }
    fn record_p_decrease(&mut self) {
        self.p_decreases += 1;
    }
    fn record_t1_eviction(&mut self) {
        self.record_evicted_entry();
        self.t1_evictions += 1;
    }
    fn record_t2_eviction(&mut self) {
        self.record_evicted_entry();
        self.t2_evictions += 1;
    }
}

// ---------------------------------------------------------------------------
// TtlMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TtlMetrics {
    pub expired_reads: AtomicU64,
    pub sweeps_run: AtomicU64,
    pub sweeps_skipped: AtomicU64,
    pub entries_swept: AtomicU64,
    pub orphans_dropped: AtomicU64,
}

impl TtlMetricsRecorder for TtlMetrics {
    fn record_expired_read(&self) {
        self.expired_reads.fetch_add(1, Ordering::Relaxed);
    }
    fn record_sweep_run(&self) {
        self.sweeps_run.fetch_add(1, Ordering::Relaxed);
    }
    fn record_sweep_skipped(&self) {
        self.sweeps_skipped.fetch_add(1, Ordering::Relaxed);
    }
    fn record_entries_swept(&self, n: usize) {
        self.entries_swept.fetch_add(n as u64, Ordering::Relaxed);
    }
    fn record_orphans_dropped(&self, n: usize) {
        self.orphans_dropped.fetch_add(n as u64, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// LoaderMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct LoaderMetrics {
    pub cache_hits: AtomicU64,
    pub producer_runs: AtomicU64,
    pub shared_results: AtomicU64,
    pub producer_failures: AtomicU64,
}

impl LoaderMetricsRecorder for LoaderMetrics {
    fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }
    fn record_producer_run(&self) {
        self.producer_runs.fetch_add(1, Ordering::Relaxed);
    }
    fn record_shared_result(&self) {
        self.shared_results.fetch_add(1, Ordering::Relaxed);
    }
    fn record_producer_failure(&self) {
        self.producer_failures.fetch_add(1, Ordering::Relaxed);
    }
}
