//! Cache Single-Flight Tests
//!
//! Concurrent get_or_create calls for one key run the builder once and all
//! observe the same outcome.

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const CALLERS: usize = 16;

fn race<F>(cache: &Arc<ModelCache>, key: &TypeHandle, make_build: F) -> Vec<Result<Arc<TypeEntry>>>
where
    F: Fn() -> Box<dyn FnOnce() -> Result<TypeEntry> + Send> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(CALLERS));
    let make_build = Arc::new(make_build);
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let cache = Arc::clone(cache);
            let key = key.clone();
            let barrier = Arc::clone(&barrier);
            let make_build = Arc::clone(&make_build);
            thread::spawn(move || {
                barrier.wait();
                let build = make_build();
                cache.get_or_create(&key, move || build())
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn concurrent_callers_share_one_build() {
    let cache = Arc::new(cache_with(CacheConfig::default(), 4));
    let key = TypeHandle::new("shop.Order");
    let calls = Arc::new(AtomicUsize::new(0));

    let (c, k) = (Arc::clone(&calls), key.clone());
    let results = race(&cache, &key, move || {
        let (c, k) = (Arc::clone(&c), k.clone());
        Box::new(move || -> Result<TypeEntry> {
            c.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(TypeEntry::builder(domain_id("shop"), "Order", k).build())
        })
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let first = results[0].as_ref().unwrap();
    for r in &results {
        assert!(Arc::ptr_eq(first, r.as_ref().unwrap()));
    }

    let stats = cache.stats();
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.pending, 0);
}

#[test]
fn concurrent_callers_share_one_failure() {
    let cache = Arc::new(cache_with(CacheConfig::default(), 4));
    let key = TypeHandle::new("shop.Broken");
    let calls = Arc::new(AtomicUsize::new(0));

    let c = Arc::clone(&calls);
    let results = race(&cache, &key, move || {
        let c = Arc::clone(&c);
        Box::new(move || -> Result<TypeEntry> {
            c.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Err(BuildError::new("shop.Broken", "missing metadata").into())
        })
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let expected = ModelError::Build(BuildError::new("shop.Broken", "missing metadata"));
    for r in &results {
        assert_eq!(r.as_ref().unwrap_err(), &expected);
    }
    assert!(!cache.is_pending(&key));
    assert!(cache.get(&key).is_none());
    assert_eq!(cache.stats().failures, 1);
}

#[test]
fn failed_key_can_be_rebuilt() {
    let cache = cache_with(CacheConfig::default(), 2);
    let key = TypeHandle::new("shop.Flaky");

    let err = cache
        .get_or_create(&key, || -> Result<TypeEntry> {
            Err(BuildError::new("shop.Flaky", "first attempt").into())
        })
        .unwrap_err();
    assert!(matches!(err, ModelError::Build(_)));

    let k = key.clone();
    let entry = cache
        .get_or_create(&key, move || Ok(TypeEntry::builder(domain_id("shop"), "Flaky", k).build()))
        .unwrap();
    assert_eq!(entry.name(), "Flaky");
    assert!(Arc::ptr_eq(&entry, &cache.get(&key).unwrap()));
}

#[test]
fn panicking_builder_fails_all_waiters() {
    let cache = Arc::new(cache_with(CacheConfig::default(), 2));
    let key = TypeHandle::new("shop.Panics");

    let results = race(&cache, &key, || {
        Box::new(|| -> Result<TypeEntry> {
            thread::sleep(Duration::from_millis(30));
            panic!("builder exploded")
        })
    });

    for r in &results {
        match r {
            Err(ModelError::Build(e)) => assert!(e.message.contains("builder exploded")),
            other => panic!("expected build error, got {other:?}"),
        }
    }
    assert!(!cache.is_pending(&key));
}

#[test]
fn distinct_keys_build_independently() {
    let cache = Arc::new(cache_with(CacheConfig::default(), 4));
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                let key = TypeHandle::new(format!("shop.T{}", i));
                let k = key.clone();
                cache
                    .get_or_create(&key, move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(TypeEntry::builder(domain_id("shop"), format!("T{}", i), k).build())
                    })
                    .unwrap()
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 8);
    assert_eq!(cache.len(), 8);
}
