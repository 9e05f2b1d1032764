//! Configuration and a single builder for every cache layer.
//!
//! Each `try_build_*` validates the configuration and returns a
//! [`ConfigError`] on bad input; the matching `build_*` panics instead.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use adaptcache::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::new(100)
//!     .gc_cooldown(Duration::from_secs(30))
//!     .build_ttl::<u64, String>();
//! cache.set(1, "hello".to_string(), Duration::from_secs(5));
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//!
//! assert!(CacheBuilder::new(0).try_build_arc::<u64, String>().is_err());
//! ```

use std::hash::Hash;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;
use crate::loader::{DynLoader, Loader};
use crate::policy::arc::{ArcCore, ConcurrentArcCache};
use crate::ttl::{DEFAULT_GC_COOLDOWN, TtlCache};

/// Construction parameters shared by all layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of resident entries.
    pub capacity: usize,
    /// Minimum time between two opportunistic expiry sweeps.
    pub gc_cooldown: Duration,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        if self.gc_cooldown.is_zero() {
            return Err(ConfigError::new("gc cooldown must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            gc_cooldown: DEFAULT_GC_COOLDOWN,
        }
    }
}

/// Builder for creating cache instances.
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Create a new cache builder with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            config: CacheConfig {
                capacity,
                ..CacheConfig::default()
            },
        }
    }

    pub fn from_config(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn gc_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.gc_cooldown = cooldown;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Single-threaded ARC engine.
    pub fn try_build_core<K, V>(&self) -> Result<ArcCore<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.config.validate()?;
        ArcCore::try_new(self.config.capacity)
    }

    /// Thread-safe ARC cache without expiry.
    pub fn try_build_arc<K, V>(&self) -> Result<ConcurrentArcCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_core().map(ConcurrentArcCache::from_core)
    }

    /// TTL cache on the system clock.
    pub fn try_build_ttl<K, V>(&self) -> Result<TtlCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_ttl_with_clock(SystemClock)
    }

    /// TTL cache on a caller-provided clock.
    pub fn try_build_ttl_with_clock<K, V, C>(&self, clock: C) -> Result<TtlCache<K, V, C>, ConfigError>
    where
        K: Eq + Hash + Clone,
        C: Clock,
    {
        self.config.validate()?;
        TtlCache::with_clock(self.config.capacity, self.config.gc_cooldown, clock)
    }

    /// Coalescing loader over a fresh TTL cache.
    pub fn try_build_loader<K, V, E>(&self) -> Result<Loader<K, V, E>, ConfigError>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        self.try_build_ttl().map(Loader::new)
    }

    /// Coalescing loader for values of mixed types.
    pub fn try_build_dyn_loader<K, E>(&self) -> Result<DynLoader<K, E>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_ttl().map(DynLoader::new)
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_core<K, V>(&self) -> ArcCore<K, V>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_core().unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_arc<K, V>(&self) -> ConcurrentArcCache<K, V>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_arc().unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_ttl<K, V>(&self) -> TtlCache<K, V>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_ttl().unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_ttl_with_clock<K, V, C>(&self, clock: C) -> TtlCache<K, V, C>
    where
        K: Eq + Hash + Clone,
        C: Clock,
    {
        self.try_build_ttl_with_clock(clock)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_loader<K, V, E>(&self) -> Loader<K, V, E>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        self.try_build_loader().unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_dyn_loader<K, E>(&self) -> DynLoader<K, E>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_dyn_loader()
            .unwrap_or_else(|err| panic!("{err}"))
    }
}
