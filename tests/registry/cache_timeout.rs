//! Cache Timeout Tests
//!
//! Waiters give up after the configured deadline; the build itself keeps
//! running and its result is cached.

use crate::common::*;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn stuck_build_times_out_waiters() {
    let cache = Arc::new(cache_with(fast_cache_config(150), 1));
    let key = TypeHandle::new("shop.Stuck");
    let (release, gate) = mpsc::channel::<()>();

    let k = key.clone();
    let start = Instant::now();
    let err = cache
        .get_or_create(&key, move || {
            let _ = gate.recv();
            Ok(TypeEntry::builder(domain_id("shop"), "Stuck", k).build())
        })
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_millis(150));
    match err {
        ModelError::ResolutionTimeout {
            type_path,
            waited_ms,
        } => {
            assert_eq!(type_path, "shop.Stuck");
            assert!(waited_ms >= 150);
        }
        other => panic!("expected ResolutionTimeout, got {other:?}"),
    }
    assert!(cache.is_pending(&key));

    // A second caller joins the same pending build and times out too
    let joined = cache.get_or_create(&key, || -> Result<TypeEntry> {
        unreachable!("pending key rebuilt")
    });
    assert!(matches!(joined, Err(ModelError::ResolutionTimeout { .. })));
    assert_eq!(cache.stats().timeouts, 2);

    // Let the stuck build finish so its worker thread exits
    release.send(()).unwrap();
    cache.pool().drain();
}

#[test]
fn build_finishing_after_timeout_is_cached() {
    let cache = Arc::new(cache_with(fast_cache_config(50), 1));
    let key = TypeHandle::new("shop.Late");
    let (release, gate) = mpsc::channel::<()>();

    let k = key.clone();
    let result = cache.get_or_create(&key, move || {
        let _ = gate.recv();
        Ok(TypeEntry::builder(domain_id("shop"), "Late", k).build())
    });
    assert!(matches!(result, Err(ModelError::ResolutionTimeout { .. })));

    release.send(()).unwrap();
    cache.pool().drain();

    let cached = cache.get(&key).unwrap();
    assert_eq!(cached.name(), "Late");
    let again = cache
        .get_or_create(&key, || -> Result<TypeEntry> {
            unreachable!("resolved key rebuilt")
        })
        .unwrap();
    assert!(Arc::ptr_eq(&cached, &again));
}

#[test]
fn timeout_does_not_affect_other_keys() {
    let cache = Arc::new(cache_with(fast_cache_config(100), 2));
    let stuck = TypeHandle::new("shop.Stuck");
    let (release, gate) = mpsc::channel::<()>();

    let waiter = {
        let cache = Arc::clone(&cache);
        let stuck = stuck.clone();
        thread::spawn(move || {
            let k = stuck.clone();
            cache.get_or_create(&stuck, move || {
                let _ = gate.recv();
                Ok(TypeEntry::builder(domain_id("shop"), "Stuck", k).build())
            })
        })
    };

    let quick = TypeHandle::new("shop.Quick");
    let k = quick.clone();
    let entry = cache
        .get_or_create(&quick, move || {
            Ok(TypeEntry::builder(domain_id("shop"), "Quick", k).build())
        })
        .unwrap();
    assert_eq!(entry.name(), "Quick");

    assert!(matches!(
        waiter.join().unwrap(),
        Err(ModelError::ResolutionTimeout { .. })
    ));
    release.send(()).unwrap();
    cache.pool().drain();
}

#[test]
fn put_releases_waiters_of_pending_build() {
    let cache = Arc::new(cache_with(fast_cache_config(5_000), 1));
    let key = TypeHandle::new("shop.Overridden");
    let (release, gate) = mpsc::channel::<()>();

    let waiter = {
        let cache = Arc::clone(&cache);
        let key = key.clone();
        thread::spawn(move || {
            let k = key.clone();
            cache.get_or_create(&key, move || {
                let _ = gate.recv();
                Ok(TypeEntry::builder(domain_id("shop"), "Overridden", k).build())
            })
        })
    };

    while !cache.is_pending(&key) {
        thread::sleep(Duration::from_millis(5));
    }
    let manual = Arc::new(TypeEntry::builder(domain_id("shop"), "Manual", key.clone()).build());
    assert!(cache.put(&key, Arc::clone(&manual)).is_none());

    assert!(matches!(
        waiter.join().unwrap(),
        Err(ModelError::Superseded { .. })
    ));

    // The superseded build's late result does not replace the put value
    release.send(()).unwrap();
    cache.pool().drain();
    assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &manual));
}
