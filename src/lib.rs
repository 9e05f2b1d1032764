//! adaptcache: an Adaptive Replacement Cache with lazy TTL expiry and
//! request-coalescing load-through.
//!
//! Layers, each calling only the one below:
//!
//! ```text
//!   loader::Loader ──► ttl::TtlCache ──► policy::arc::ConcurrentArcCache
//!                                              │
//!                                              ▼
//!                                        ArcCore: 4 × ds::RecencyList
//! ```
//!
//! ```
//! use std::time::Duration;
//! use adaptcache::prelude::*;
//!
//! let loader: Loader<u32, String, std::io::Error> = CacheBuilder::new(1024).build_loader();
//! let name = loader.load(1, || Ok("alice".to_string()), Duration::from_secs(30)).unwrap();
//! assert_eq!(name, "alice");
//! ```

pub mod builder;
pub mod clock;
pub mod ds;
pub mod error;
pub mod loader;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod traits;
pub mod ttl;
