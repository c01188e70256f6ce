//! Concurrent lazy model cache
//!
//! Maps a runtime type descriptor to its resolved [`TypeEntry`], building each
//! model at most once even when many threads ask for it at the same time.
//!
//! ## Slot lifecycle
//!
//! ```text
//! ABSENT --get_or_create--> PENDING --build ok--> RESOLVED
//!                              |
//!                              +----build failed--> ABSENT (slot removed)
//! ```
//!
//! - The cache-wide lock is held only to read or swap a slot. Builds run on
//!   the [`WorkerPool`], never under that lock.
//! - Every caller that finds a slot PENDING waits on that build's own
//!   condition, in slices of `wait_interval`, up to `max_wait` in total.
//! - A build's outcome (value or error) is delivered to every waiter.
//! - A waiter that times out gives up waiting; the build still finishes and
//!   its value is cached for later callers.
//!
//! ## Eviction
//!
//! A `TypeEntry` holds a strong handle to its own descriptor, so a weakly-keyed
//! map would never release it. Resolved slots are instead bounded by an LRU of
//! `capacity` entries. Pending slots are never evicted.

use crate::config::{CacheConfig, WorkerConfig};
use crate::worker::WorkerPool;
use lru::LruCache;
use modelreg_core::{BuildError, ModelError, Result, TypeEntry, TypeHandle};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

type BuildOutcome = Result<Arc<TypeEntry>>;

/// An in-flight build and the callers waiting on it
struct PendingBuild {
    outcome: Mutex<Option<BuildOutcome>>,
    done: Condvar,
}

impl PendingBuild {
    fn new() -> Self {
        PendingBuild {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    /// Publish the outcome and wake every waiter. First outcome wins.
    fn complete(&self, outcome: BuildOutcome) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.done.notify_all();
    }
}

#[derive(Clone)]
enum Slot {
    Pending(Arc<PendingBuild>),
    Resolved(Arc<TypeEntry>),
}

struct CacheState {
    slots: HashMap<TypeHandle, Slot>,
    /// Recency order of RESOLVED keys only
    recency: LruCache<TypeHandle, ()>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    builds: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
    timeouts: AtomicU64,
}

/// State shared with build jobs. Holds no reference to the pool, so a job
/// can never keep the pool alive from inside one of its own workers.
struct Shared {
    state: Mutex<CacheState>,
    counters: Counters,
}

impl Shared {
    /// Install a resolved value, evicting the least recently used entry if
    /// the capacity is exceeded. Caller holds the state lock.
    fn install_resolved(&self, state: &mut CacheState, key: &TypeHandle, entry: Arc<TypeEntry>) {
        state.slots.insert(key.clone(), Slot::Resolved(entry));
        if let Some((evicted, ())) = state.recency.push(key.clone(), ()) {
            if &evicted != key {
                if let Some(Slot::Resolved(_)) = state.slots.get(&evicted) {
                    state.slots.remove(&evicted);
                    self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(type_path = %evicted, "evicted least recently used model");
                }
            }
        }
    }

    /// Settle a build: update the slot if it still belongs to this build, then
    /// wake the waiters.
    fn finish(&self, key: &TypeHandle, pending: &Arc<PendingBuild>, outcome: BuildOutcome) {
        {
            let mut state = self.state.lock();
            let owned = matches!(
                state.slots.get(key),
                Some(Slot::Pending(current)) if Arc::ptr_eq(current, pending)
            );
            match (&outcome, owned) {
                (Ok(entry), true) => {
                    self.install_resolved(&mut state, key, Arc::clone(entry));
                    self.counters.builds.fetch_add(1, Ordering::Relaxed);
                    debug!(type_path = %key, "model build resolved");
                }
                (Err(e), true) => {
                    state.slots.remove(key);
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(type_path = %key, error = %e, "model build failed, slot cleared");
                }
                (_, false) => {
                    warn!(type_path = %key, "discarding result of superseded model build");
                }
            }
        }
        pending.complete(outcome);
    }
}

/// Settles a scheduled build exactly once.
///
/// Created before the job is handed to the pool. If the job is dropped without
/// running (pool rejected it), the guard fails the slot so it never stays
/// PENDING.
struct BuildGuard {
    shared: Arc<Shared>,
    key: TypeHandle,
    pending: Arc<PendingBuild>,
    settled: bool,
}

impl BuildGuard {
    fn settle(mut self, outcome: BuildOutcome) {
        self.settled = true;
        self.shared.finish(&self.key, &self.pending, outcome);
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        if !self.settled {
            let err = ModelError::WorkerUnavailable {
                type_path: self.key.path().to_string(),
            };
            self.shared.finish(&self.key, &self.pending, Err(err));
        }
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Calls answered from a resolved slot
    pub hits: u64,
    /// Calls that found the slot absent and scheduled a build
    pub misses: u64,
    /// Calls that found a build in flight and waited on it
    pub joins: u64,
    /// Builds that resolved successfully
    pub builds: u64,
    /// Builds that failed (slot cleared)
    pub failures: u64,
    /// Resolved entries dropped by the LRU bound
    pub evictions: u64,
    /// Waiters that hit the overall deadline
    pub timeouts: u64,
    /// Resolved entries currently cached
    pub resolved: usize,
    /// Builds currently in flight
    pub pending: usize,
}

/// Concurrent lazy model cache
///
/// See the module documentation for the slot lifecycle and wait semantics.
pub struct ModelCache {
    shared: Arc<Shared>,
    pool: Arc<WorkerPool>,
    config: CacheConfig,
}

impl ModelCache {
    /// Create a cache with its own worker pool
    pub fn new(config: CacheConfig, workers: &WorkerConfig) -> Self {
        let pool = Arc::new(WorkerPool::new(workers.threads, workers.queue_depth));
        Self::with_pool(config, pool)
    }

    /// Create a cache that schedules builds on a shared pool
    pub fn with_pool(config: CacheConfig, pool: Arc<WorkerPool>) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        ModelCache {
            shared: Arc::new(Shared {
                state: Mutex::new(CacheState {
                    slots: HashMap::new(),
                    recency: LruCache::new(capacity),
                }),
                counters: Counters::default(),
            }),
            pool,
            config,
        }
    }

    /// Settings this cache was created with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Worker pool used for builds
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Return the model for `key`, building it with `build` if absent
    ///
    /// - RESOLVED: returns immediately.
    /// - ABSENT: installs a PENDING marker, schedules `build` on the worker
    ///   pool, then waits like any other caller.
    /// - PENDING: waits for the in-flight build; `build` is dropped unused.
    ///
    /// May block the calling thread for up to `max_wait`.
    ///
    /// # Errors
    ///
    /// - The build's own error (shared by every waiter), including a
    ///   [`BuildError`] for a panicking builder
    /// - [`ModelError::ResolutionTimeout`] if the deadline passes first
    /// - [`ModelError::WorkerUnavailable`] if the pool rejected the build
    /// - [`ModelError::Superseded`] if a `put` replaced the pending build
    pub fn get_or_create<F, T>(&self, key: &TypeHandle, build: F) -> Result<Arc<TypeEntry>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Into<Arc<TypeEntry>> + 'static,
    {
        let (pending, scheduled) = {
            let mut state = self.shared.state.lock();
            let existing = state.slots.get(key).cloned();
            match existing {
                Some(Slot::Resolved(entry)) => {
                    state.recency.get(key);
                    self.shared.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(entry);
                }
                Some(Slot::Pending(pending)) => {
                    self.shared.counters.joins.fetch_add(1, Ordering::Relaxed);
                    (pending, false)
                }
                None => {
                    let pending = Arc::new(PendingBuild::new());
                    state
                        .slots
                        .insert(key.clone(), Slot::Pending(Arc::clone(&pending)));
                    self.shared.counters.misses.fetch_add(1, Ordering::Relaxed);
                    (pending, true)
                }
            }
        };

        if scheduled {
            self.schedule(key, &pending, build);
        } else {
            debug!(type_path = %key, "joining in-flight model build");
        }

        self.wait_for(key, &pending)
    }

    fn schedule<F, T>(&self, key: &TypeHandle, pending: &Arc<PendingBuild>, build: F)
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Into<Arc<TypeEntry>> + 'static,
    {
        debug!(type_path = %key, "scheduling model build");
        let guard = BuildGuard {
            shared: Arc::clone(&self.shared),
            key: key.clone(),
            pending: Arc::clone(pending),
            settled: false,
        };
        let job = move || {
            let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(build)) {
                Ok(Ok(entry)) => Ok(entry.into()),
                Ok(Err(e)) => Err(e),
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "(non-string panic)".to_string());
                    error!(type_path = %guard.key, panic = %message, "model builder panicked");
                    Err(BuildError::new(
                        guard.key.path(),
                        format!("builder panicked: {}", message),
                    )
                    .into())
                }
            };
            guard.settle(outcome);
        };
        // A rejected job is dropped here, and its guard fails the slot.
        if self.pool.submit(job).is_err() {
            warn!(type_path = %key, "worker pool rejected model build");
        }
    }

    fn wait_for(&self, key: &TypeHandle, pending: &Arc<PendingBuild>) -> Result<Arc<TypeEntry>> {
        let started = Instant::now();
        let deadline = started + self.config.max_wait();
        let mut outcome = pending.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            let now = Instant::now();
            if now >= deadline {
                self.shared.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                let waited_ms = started.elapsed().as_millis() as u64;
                warn!(type_path = %key, waited_ms, "gave up waiting for model build");
                return Err(ModelError::ResolutionTimeout {
                    type_path: key.path().to_string(),
                    waited_ms,
                });
            }
            let slice = self.config.wait_interval().min(deadline - now);
            if pending.done.wait_for(&mut outcome, slice).timed_out() && outcome.is_none() {
                debug!(
                    type_path = %key,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "model build still pending"
                );
            }
        }
    }

    /// Resolved model for `key`, without waiting or building
    pub fn get(&self, key: &TypeHandle) -> Option<Arc<TypeEntry>> {
        let mut state = self.shared.state.lock();
        let entry = match state.slots.get(key) {
            Some(Slot::Resolved(entry)) => Arc::clone(entry),
            _ => return None,
        };
        state.recency.get(key);
        Some(entry)
    }

    /// True if a build for `key` is in flight
    pub fn is_pending(&self, key: &TypeHandle) -> bool {
        matches!(
            self.shared.state.lock().slots.get(key),
            Some(Slot::Pending(_))
        )
    }

    /// Overwrite the slot for `key` with a resolved value
    ///
    /// Returns the previously resolved value, if any. If a build was in
    /// flight, its waiters are released with [`ModelError::Superseded`] and
    /// its eventual result is discarded.
    pub fn put(&self, key: &TypeHandle, value: Arc<TypeEntry>) -> Option<Arc<TypeEntry>> {
        let previous = {
            let mut state = self.shared.state.lock();
            let previous = state.slots.get(key).cloned();
            self.shared.install_resolved(&mut state, key, value);
            previous
        };
        match previous {
            Some(Slot::Resolved(old)) => Some(old),
            Some(Slot::Pending(pending)) => {
                warn!(type_path = %key, "put superseded an in-flight model build");
                pending.complete(Err(ModelError::Superseded {
                    type_path: key.path().to_string(),
                }));
                None
            }
            None => None,
        }
    }

    /// Drop the resolved value for `key`
    ///
    /// In-flight builds are left alone; returns `None` for them.
    pub fn remove(&self, key: &TypeHandle) -> Option<Arc<TypeEntry>> {
        let mut state = self.shared.state.lock();
        match state.slots.get(key) {
            Some(Slot::Resolved(_)) => {}
            _ => return None,
        }
        state.recency.pop(key);
        match state.slots.remove(key) {
            Some(Slot::Resolved(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Number of resolved entries
    pub fn len(&self) -> usize {
        self.shared.state.lock().recency.len()
    }

    /// True if nothing is resolved
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CacheStats {
        let (resolved, pending) = {
            let state = self.shared.state.lock();
            let resolved = state.recency.len();
            (resolved, state.slots.len() - resolved)
        };
        let c = &self.shared.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            joins: c.joins.load(Ordering::Relaxed),
            builds: c.builds.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
            resolved,
            pending,
        }
    }
}
