//! Eight threads ask for the same slow report at once; the report is built
//! once and every thread gets the same copy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use adaptcache::builder::CacheBuilder;
use adaptcache::loader::Loader;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let loader: Arc<Loader<String, Arc<String>, std::io::Error>> =
        Arc::new(CacheBuilder::new(64).build_loader());
    let builds = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|id| {
            let loader = Arc::clone(&loader);
            let builds = Arc::clone(&builds);
            thread::spawn(move || {
                let report = loader.load(
                    "daily-report".to_string(),
                    || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(300));
                        Ok(Arc::new("42 orders, 3 refunds".to_string()))
                    },
                    Duration::from_secs(60),
                );
                println!("thread {id}: {report:?}");
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }
    println!("report built {} time(s)", builds.load(Ordering::SeqCst));
}
