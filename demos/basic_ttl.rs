//! Stores a few session tokens with different lifetimes and watches them
//! expire.
//!
//! Run with `RUST_LOG=debug cargo run --example basic_ttl` to see sweeps.

use std::thread;
use std::time::Duration;

use adaptcache::builder::CacheBuilder;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let sessions = CacheBuilder::new(128)
        .gc_cooldown(Duration::from_millis(200))
        .build_ttl::<&str, String>();

    sessions.set("alice", "token-a".to_string(), Duration::from_millis(100));
    sessions.set("bob", "token-b".to_string(), Duration::from_secs(5));

    println!("alice: {:?}", sessions.get(&"alice"));
    println!("bob:   {:?}", sessions.get(&"bob"));

    thread::sleep(Duration::from_millis(250));

    println!("after 250ms");
    println!("alice: {:?}", sessions.get(&"alice"));
    println!("bob:   {:?}", sessions.get(&"bob"));
    println!("resident entries: {}", sessions.len());
}
