//! Load-through with request coalescing.
//!
//! [`Group`] deduplicates concurrent calls for the same key: the first caller
//! (the leader) runs the producer, later callers block on the leader's
//! [`Call`] until it publishes a result, then all of them receive it.
//! [`Loader`] puts a [`TtlCache`] in front of a group so hits never reach the
//! producer and successful results are cached before any waiter wakes up.
//!
//! ```text
//!   load(k) ──► cache.get(k) ── hit ──► value
//!                  │ miss
//!                  ▼
//!            calls.lock() ── in flight? ── yes ──► wait on Call ──► shared result
//!                  │ no
//!                  ▼
//!            insert Call, unlock
//!            producer() ──► cache.set(k, v, expire)
//!            calls.lock().remove(k), publish, notify_all
//! ```
//!
//! The in-flight map lock is never held while a producer runs. Coalescing
//! only covers overlapping calls: once a call is published and removed, the
//! next miss for the same key starts a new one.

use std::any::{Any, type_name};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::LoadError;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::LoaderMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::LoaderMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{LoaderMetricsRecorder, MetricsSnapshotProvider};
use crate::traits::ConcurrentCache;
use crate::ttl::TtlCache;

enum CallState<T, E> {
    Pending,
    Done(Result<T, Arc<E>>),
    Panicked,
}

/// A single in-flight producer run, shared by its leader and waiters.
pub struct Call<T, E> {
    state: Mutex<CallState<T, E>>,
    ready: Condvar,
}

impl<T, E> Call<T, E>
where
    T: Clone,
{
    fn new() -> Self {
        Self {
            state: Mutex::new(CallState::Pending),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, outcome: CallState<T, E>) {
        *self.state.lock() = outcome;
        self.ready.notify_all();
    }

    /// Blocks until the call is published, or until `timeout` has passed.
    fn wait(&self, timeout: Option<Duration>) -> Result<T, LoadError<E>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        loop {
            match &*state {
                CallState::Done(Ok(value)) => return Ok(value.clone()),
                CallState::Done(Err(err)) => return Err(LoadError::Producer(Arc::clone(err))),
                CallState::Panicked => return Err(LoadError::Panicked),
                CallState::Pending => {},
            }
            match deadline {
                Some(deadline) => {
                    let timed_out = self.ready.wait_until(&mut state, deadline).timed_out();
                    if timed_out && matches!(*state, CallState::Pending) {
                        return Err(LoadError::Abandoned);
                    }
                },
                None => self.ready.wait(&mut state),
            }
        }
    }
}

/// Publishes the leader's outcome exactly once. If the producer unwinds
/// before [`Leader::finish`], waiters are released with `Panicked`.
struct Leader<'a, K, T, E>
where
    K: Eq + Hash,
    T: Clone,
{
    calls: &'a Mutex<FxHashMap<K, Arc<Call<T, E>>>>,
    key: K,
    call: Arc<Call<T, E>>,
    published: bool,
}

impl<K, T, E> Leader<'_, K, T, E>
where
    K: Eq + Hash,
    T: Clone,
{
    fn publish(&mut self, outcome: CallState<T, E>) {
        self.calls.lock().remove(&self.key);
        self.call.complete(outcome);
        self.published = true;
    }

    fn finish(mut self, result: Result<T, Arc<E>>) {
        self.publish(CallState::Done(result));
    }
}

impl<K, T, E> Drop for Leader<'_, K, T, E>
where
    K: Eq + Hash,
    T: Clone,
{
    fn drop(&mut self) {
        if !self.published {
            warn!("producer panicked, releasing waiters");
            self.publish(CallState::Panicked);
        }
    }
}

/// Per-key deduplication of concurrent producer calls.
///
/// ```
/// use adaptcache::loader::Group;
///
/// let group: Group<&str, u32, String> = Group::new();
/// let (result, shared) = group.work("answer", || Ok(42));
/// assert_eq!(result.unwrap(), 42);
/// assert!(!shared);
/// ```
pub struct Group<K, T, E> {
    calls: Mutex<FxHashMap<K, Arc<Call<T, E>>>>,
}

impl<K, T, E> Group<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(FxHashMap::default()),
        }
    }

    /// Runs `f` for `key` unless a call for `key` is already in flight, in
    /// which case this blocks and returns that call's result. The flag is
    /// `true` when the result came from another caller's run.
    pub fn work<F>(&self, key: K, f: F) -> (Result<T, LoadError<E>>, bool)
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.run(key, f, None)
    }

    /// Like [`Group::work`], but a caller that joins an in-flight call stops
    /// waiting after `timeout` and gets [`LoadError::Abandoned`]. The call
    /// itself keeps running.
    pub fn work_timeout<F>(&self, key: K, f: F, timeout: Duration) -> (Result<T, LoadError<E>>, bool)
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.run(key, f, Some(timeout))
    }

    /// Number of calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    fn run<F>(&self, key: K, f: F, timeout: Option<Duration>) -> (Result<T, LoadError<E>>, bool)
    where
        F: FnOnce() -> Result<T, E>,
    {
        let call = {
            let mut calls = self.calls.lock();
            if let Some(call) = calls.get(&key).cloned() {
                drop(calls);
                trace!("joining in-flight call");
                return (call.wait(timeout), true);
            }
            let call = Arc::new(Call::new());
            calls.insert(key.clone(), Arc::clone(&call));
            call
        };

        trace!("leading new call");
        let leader = Leader {
            calls: &self.calls,
            key,
            call,
            published: false,
        };
        let result = f().map_err(Arc::new);
        leader.finish(result.clone());
        (result.map_err(LoadError::Producer), false)
    }
}

impl<K, T, E> Default for Group<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, E> fmt::Debug for Group<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

/// A [`TtlCache`] with coalesced load-through.
///
/// ```
/// use std::time::Duration;
/// use adaptcache::loader::Loader;
/// use adaptcache::ttl::TtlCache;
///
/// let loader: Loader<u64, String, std::io::Error> = Loader::new(TtlCache::new(128));
/// let user = loader.load(7, || Ok("alice".to_string()), Duration::from_secs(60));
/// assert_eq!(user.unwrap(), "alice");
///
/// // served from the cache, the producer is not called
/// let again = loader.load(7, || unreachable!(), Duration::from_secs(60));
/// assert_eq!(again.unwrap(), "alice");
/// ```
pub struct Loader<K, V, E, C = SystemClock> {
    cache: TtlCache<K, V, C>,
    group: Group<K, V, E>,
    #[cfg(feature = "metrics")]
    metrics: LoaderMetrics,
}

impl<K, V, E, C> Loader<K, V, E, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    pub fn new(cache: TtlCache<K, V, C>) -> Self {
        Self {
            cache,
            group: Group::new(),
            #[cfg(feature = "metrics")]
            metrics: LoaderMetrics::default(),
        }
    }

    /// Returns the cached value for `key`, or runs `producer` once for all
    /// concurrent callers and caches its result for `expire`.
    ///
    /// Producer errors reach every waiter of the call and are never cached.
    pub fn load<F>(&self, key: K, producer: F, expire: Duration) -> Result<V, LoadError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.load_inner(key, producer, expire, None)
    }

    /// Like [`Loader::load`], but gives up waiting on another caller's
    /// producer after `timeout`.
    pub fn load_timeout<F>(
        &self,
        key: K,
        producer: F,
        expire: Duration,
        timeout: Duration,
    ) -> Result<V, LoadError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.load_inner(key, producer, expire, Some(timeout))
    }

    pub fn cache(&self) -> &TtlCache<K, V, C> {
        &self.cache
    }

    pub fn in_flight(&self) -> usize {
        self.group.in_flight()
    }

    fn load_inner<F>(
        &self,
        key: K,
        producer: F,
        expire: Duration,
        timeout: Option<Duration>,
    ) -> Result<V, LoadError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.cache.get(&key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_cache_hit();
            return Ok(value);
        }

        let (result, shared) = self.group.run(
            key.clone(),
            || {
                #[cfg(feature = "metrics")]
                self.metrics.record_producer_run();
                let value = producer()?;
                self.cache.set(key.clone(), value.clone(), expire);
                Ok(value)
            },
            timeout,
        );

        #[cfg(feature = "metrics")]
        {
            if shared {
                self.metrics.record_shared_result();
            } else if result.is_err() {
                self.metrics.record_producer_failure();
            }
        }
        trace!(shared, ok = result.is_ok(), "load finished");
        result
    }
}

impl<K, V, E, C> fmt::Debug for Loader<K, V, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("cache", &self.cache)
            .field("group", &self.group)
            .finish()
    }
}

impl<K, V, E, C> ConcurrentCache for Loader<K, V, E, C>
where
    K: Send + Sync,
    V: Send + Sync,
    E: Send + Sync,
    C: Clock,
{
}

#[cfg(feature = "metrics")]
impl<K, V, E, C> MetricsSnapshotProvider<LoaderMetricsSnapshot> for Loader<K, V, E, C> {
    fn snapshot(&self) -> LoaderMetricsSnapshot {
        use std::sync::atomic::Ordering;
        LoaderMetricsSnapshot {
            cache_hits: self.metrics.cache_hits.load(Ordering::Relaxed),
            producer_runs: self.metrics.producer_runs.load(Ordering::Relaxed),
            shared_results: self.metrics.shared_results.load(Ordering::Relaxed),
            producer_failures: self.metrics.producer_failures.load(Ordering::Relaxed),
        }
    }
}

/// Type-erased value slot of a [`DynLoader`].
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// A loader whose cache holds values of different types.
///
/// Each `load` names the type it expects; a cached or shared value of any
/// other type is reported as [`LoadError::TypeMismatch`].
///
/// ```
/// use std::time::Duration;
/// use adaptcache::loader::DynLoader;
/// use adaptcache::ttl::TtlCache;
///
/// let loader: DynLoader<&str, String> = DynLoader::new(TtlCache::new(64));
/// let n: u32 = loader.load("count", || Ok(3), Duration::from_secs(5)).unwrap();
/// assert_eq!(n, 3);
/// assert!(loader.load::<String, _>("count", || Ok("x".into()), Duration::from_secs(5)).is_err());
/// ```
pub struct DynLoader<K, E, C = SystemClock> {
    cache: TtlCache<K, AnyValue, C>,
    group: Group<K, AnyValue, E>,
}

impl<K, E, C> DynLoader<K, E, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    pub fn new(cache: TtlCache<K, AnyValue, C>) -> Self {
        Self {
            cache,
            group: Group::new(),
        }
    }

    pub fn load<T, F>(&self, key: K, producer: F, expire: Duration) -> Result<T, LoadError<E>>
    where
        T: Any + Clone + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.cache.get(&key) {
            return downcast(&value);
        }
        let (result, _shared) = self.group.work(key.clone(), || {
            let value: AnyValue = Arc::new(producer()?);
            self.cache.set(key.clone(), Arc::clone(&value), expire);
            Ok(value)
        });
        result.and_then(|value| downcast(&value))
    }

    pub fn cache(&self) -> &TtlCache<K, AnyValue, C> {
        &self.cache
    }
}

impl<K, E, C> fmt::Debug for DynLoader<K, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynLoader")
            .field("cache", &self.cache)
            .field("group", &self.group)
            .finish()
    }
}

fn downcast<T, E>(value: &AnyValue) -> Result<T, LoadError<E>>
where
    T: Any + Clone,
{
    (**value)
        .downcast_ref::<T>()
        .cloned()
        .ok_or(LoadError::TypeMismatch {
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ttl::DEFAULT_GC_COOLDOWN;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, mpsc};
    use std::thread;

    // ==============================================
    // Group
    // ==============================================

    #[test]
    fn concurrent_callers_share_one_run() {
        let group: Arc<Group<&str, u64, String>> = Arc::new(Group::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(50));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let group = Arc::clone(&group);
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    group.work("k", || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(200));
                        Ok(7)
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|(r, _)| matches!(r, Ok(7))));
        assert_eq!(results.iter().filter(|(_, shared)| !shared).count(), 1);
        assert_eq!(group.in_flight(), 0);
    }

    #[test]
    fn error_is_shared_with_every_waiter() {
        let group: Arc<Group<u32, u32, String>> = Arc::new(Group::new());
        let (started_tx, started_rx) = mpsc::channel();

        let leader = {
            let group = Arc::clone(&group);
            thread::spawn(move || {
                group.work(1, || {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    Err("backend down".to_string())
                })
            })
        };
        started_rx.recv().unwrap();
        let (waiter_result, shared) = group.work(1, || Ok(0));
        let (leader_result, _) = leader.join().unwrap();

        assert!(shared);
        match (leader_result, waiter_result) {
            (Err(LoadError::Producer(a)), Err(LoadError::Producer(b))) => {
                assert!(Arc::ptr_eq(&a, &b));
                assert_eq!(*a, "backend down");
            },
            other => panic!("unexpected results: {other:?}"),
        }
    }

    #[test]
    fn panicking_producer_releases_waiters() {
        let group: Arc<Group<u32, u32, String>> = Arc::new(Group::new());
        let (started_tx, started_rx) = mpsc::channel();

        let leader = {
            let group = Arc::clone(&group);
            thread::spawn(move || {
                group.work(1, || -> Result<u32, String> {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    panic!("producer exploded");
                })
            })
        };
        started_rx.recv().unwrap();
        let (result, shared) = group.work(1, || Ok(0));

        assert!(shared);
        assert!(matches!(result, Err(LoadError::Panicked)));
        assert!(leader.join().is_err());
        assert_eq!(group.in_flight(), 0);

        let (retry, _) = group.work(1, || Ok(5));
        assert_eq!(retry.unwrap(), 5);
    }

    #[test]
    fn waiter_can_abandon_a_slow_call() {
        let group: Arc<Group<u32, u32, String>> = Arc::new(Group::new());
        let (started_tx, started_rx) = mpsc::channel();

        let leader = {
            let group = Arc::clone(&group);
            thread::spawn(move || {
                group.work(1, || {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(300));
                    Ok(9)
                })
            })
        };
        started_rx.recv().unwrap();
        let (result, shared) = group.work_timeout(1, || Ok(0), Duration::from_millis(20));

        assert!(shared);
        assert!(matches!(result, Err(LoadError::Abandoned)));
        let (leader_result, _) = leader.join().unwrap();
        assert_eq!(leader_result.unwrap(), 9);
    }

    #[test]
    fn sequential_calls_run_twice() {
        let group: Group<&str, u32, String> = Group::new();
        let runs = AtomicUsize::new(0);
        for _ in 0..2 {
            let (result, shared) = group.work("k", || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            });
            assert_eq!(result.unwrap(), 1);
            assert!(!shared);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    // ==============================================
    // Loader
    // ==============================================

    fn manual_loader() -> (Loader<&'static str, u32, String, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(16, DEFAULT_GC_COOLDOWN, clock.clone()).unwrap();
        (Loader::new(cache), clock)
    }

    #[test]
    fn hit_skips_producer() {
        let (loader, _clock) = manual_loader();
        loader.cache().set("k", 1, Duration::from_secs(60));
        let result = loader.load("k", || panic!("producer must not run"), Duration::from_secs(60));
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn success_is_cached_for_expire_duration() {
        let (loader, clock) = manual_loader();
        let runs = AtomicUsize::new(0);
        let produce = || {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(10)
        };

        assert_eq!(loader.load("k", produce, Duration::from_secs(1)).unwrap(), 10);
        assert_eq!(loader.load("k", produce, Duration::from_secs(1)).unwrap(), 10);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(2));
        assert_eq!(loader.load("k", produce, Duration::from_secs(1)).unwrap(), 10);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_is_not_cached() {
        let (loader, _clock) = manual_loader();
        let err = loader
            .load("k", || Err("nope".to_string()), Duration::from_secs(60))
            .unwrap_err();
        assert_eq!(err.producer().map(String::as_str), Some("nope"));
        assert_eq!(loader.cache().get(&"k"), None);

        assert_eq!(loader.load("k", || Ok(3), Duration::from_secs(60)).unwrap(), 3);
    }

    #[test]
    fn concurrent_loads_run_producer_once_and_populate_cache() {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(16, DEFAULT_GC_COOLDOWN, clock).unwrap();
        let loader: Arc<Loader<&str, String, String, ManualClock>> = Arc::new(Loader::new(cache));
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(50));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let loader = Arc::clone(&loader);
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    loader.load(
                        "user:1",
                        || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(200));
                            Ok("alice".to_string())
                        },
                        Duration::from_secs(60),
                    )
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "alice");
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(loader.cache().get(&"user:1"), Some("alice".to_string()));
        assert_eq!(loader.in_flight(), 0);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn loader_metrics_track_hits_runs_and_failures() {
        let (loader, _clock) = manual_loader();
        loader.load("a", || Ok(1), Duration::from_secs(60)).unwrap();
        loader.load("a", || Ok(2), Duration::from_secs(60)).unwrap();
        let _ = loader.load("b", || Err("x".to_string()), Duration::from_secs(60));

        let snap = loader.snapshot();
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.producer_runs, 2);
        assert_eq!(snap.producer_failures, 1);
        assert_eq!(snap.shared_results, 0);
    }

    // ==============================================
    // DynLoader
    // ==============================================

    #[test]
    fn dyn_loader_holds_mixed_types() {
        let loader: DynLoader<&str, String> = DynLoader::new(TtlCache::new(16));
        let n: u64 = loader.load("n", || Ok(5), Duration::from_secs(60)).unwrap();
        let s: String = loader
            .load("s", || Ok("five".to_string()), Duration::from_secs(60))
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(s, "five");
        assert_eq!(loader.cache().len(), 2);
    }

    #[test]
    fn dyn_loader_rejects_wrong_type() {
        let loader: DynLoader<&str, String> = DynLoader::new(TtlCache::new(16));
        loader.load::<u64, _>("n", || Ok(5), Duration::from_secs(60)).unwrap();

        let err = loader
            .load::<String, _>("n", || Ok("x".to_string()), Duration::from_secs(60))
            .unwrap_err();
        match err {
            LoadError::TypeMismatch { expected } => assert!(expected.contains("String")),
            other => panic!("expected a type mismatch, got {other:?}"),
        }
    }
}
