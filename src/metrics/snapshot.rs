/// Counters and sizes of an [`ArcCore`](crate::policy::arc::ArcCore).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArcMetricsSnapshot {
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

    pub cache_len: usize,
    pub capacity: usize,
    pub p_value: usize,
    pub b1_len: usize,
    pub b2_len: usize,
}

impl ArcMetricsSnapshot {
    /// Fraction of lookups that hit, or 0.0 before the first lookup.
    pub fn hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.get_calls as f64
        }
    }
}

/// Counters of a [`TtlCache`](crate::ttl::TtlCache).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TtlMetricsSnapshot {
    pub expired_reads: u64,
    pub sweeps_run: u64,
    pub sweeps_skipped: u64,
    pub entries_swept: u64,
    pub orphans_dropped: u64,
    pub ttl_records: usize,
}

/// Counters of a [`Loader`](crate::loader::Loader).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoaderMetricsSnapshot {
    pub cache_hits: u64,
    pub producer_runs: u64,
    pub shared_results: u64,
    pub producer_failures: u64,
}
