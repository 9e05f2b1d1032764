use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::{ArcMetricsSnapshot, LoaderMetricsSnapshot, TtlMetricsSnapshot};
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// Writes the Prometheus text exposition format so the output can be scraped
/// directly or forwarded to a collector. Write failures are ignored; metrics
/// never fail a cache operation.
///
/// ```
/// use adaptcache::metrics::exporter::PrometheusTextExporter;
/// use adaptcache::metrics::snapshot::LoaderMetricsSnapshot;
/// use adaptcache::metrics::traits::MetricsExporter;
///
/// let exporter = PrometheusTextExporter::new("users", Vec::new());
/// exporter.export(&LoaderMetricsSnapshot { producer_runs: 3, ..Default::default() });
/// let text = String::from_utf8(exporter.into_inner()).unwrap();
/// assert!(text.contains("users_loader_producer_runs_total 3"));
/// ```
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {name} {kind}");
        let _ = writeln!(writer, "{name} {value}");
    }

    fn counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", suffix, value);
    }

    fn gauge(&self, suffix: &str, value: usize) {
        self.write_metric("gauge", suffix, value as u64);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<ArcMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, s: &ArcMetricsSnapshot) {
        self.counter("arc_get_calls_total", s.get_calls);
        self.counter("arc_get_hits_total", s.get_hits);
        self.counter("arc_get_misses_total", s.get_misses);
        self.counter("arc_insert_calls_total", s.insert_calls);
        self.counter("arc_insert_updates_total", s.insert_updates);
        self.counter("arc_insert_new_total", s.insert_new);
        self.counter("arc_evicted_entries_total", s.evicted_entries);
        self.counter("arc_removals_total", s.removals);
        self.counter("arc_t1_to_t2_promotions_total", s.t1_to_t2_promotions);
        self.counter("arc_b1_ghost_hits_total", s.b1_ghost_hits);
        self.counter("arc_b2_ghost_hits_total", s.b2_ghost_hits);
        self.counter("arc_p_increases_total", s.p_increases);
        self.counter("arc_p_decreases_total", s.p_decreases);
        self.counter("arc_t1_evictions_total", s.t1_evictions);
        self.counter("arc_t2_evictions_total", s.t2_evictions);
        self.gauge("arc_len", s.cache_len);
        self.gauge("arc_capacity", s.capacity);
        self.gauge("arc_p", s.p_value);
        self.gauge("arc_b1_len", s.b1_len);
        self.gauge("arc_b2_len", s.b2_len);
    }
}

impl<W: Write + Send> MetricsExporter<TtlMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, s: &TtlMetricsSnapshot) {
        self.counter("ttl_expired_reads_total", s.expired_reads);
        self.counter("ttl_sweeps_run_total", s.sweeps_run);
        self.counter("ttl_sweeps_skipped_total", s.sweeps_skipped);
        self.counter("ttl_entries_swept_total", s.entries_swept);
        self.counter("ttl_orphans_dropped_total", s.orphans_dropped);
        self.gauge("ttl_records", s.ttl_records);
    }
}

impl<W: Write + Send> MetricsExporter<LoaderMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, s: &LoaderMetricsSnapshot) {
        self.counter("loader_cache_hits_total", s.cache_hits);
        self.counter("loader_producer_runs_total", s.producer_runs);
        self.counter("loader_shared_results_total", s.shared_results);
        self.counter("loader_producer_failures_total", s.producer_failures);
    }
}
