//! Feature-gated counters for the cache structures.
//!
//! Enabled by the `metrics` feature (on by default). Each structure owns its
//! recorder and exposes a typed snapshot through
//! [`MetricsSnapshotProvider`](traits::MetricsSnapshotProvider).

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use metrics_impl::{ArcMetrics, LoaderMetrics, TtlMetrics};
pub use snapshot::{ArcMetricsSnapshot, LoaderMetricsSnapshot, TtlMetricsSnapshot};
pub use traits::{MetricsExporter, MetricsSnapshotProvider};
