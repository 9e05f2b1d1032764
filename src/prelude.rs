pub use crate::builder::{CacheBuilder, CacheConfig};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::ds::{GhostList, RecencyList};
pub use crate::error::{ConfigError, InvariantError, LoadError};
pub use crate::loader::{DynLoader, Group, Loader};
#[cfg(feature = "metrics")]
pub use crate::metrics::{
    ArcMetricsSnapshot, LoaderMetricsSnapshot, MetricsSnapshotProvider, TtlMetricsSnapshot,
};
pub use crate::policy::arc::{ArcCore, ConcurrentArcCache, Residency};
pub use crate::traits::{ConcurrentCache, CoreCache, ReadOnlyCache};
pub use crate::ttl::{DEFAULT_GC_COOLDOWN, TtlCache};
