//! Tuning knobs for the model cache and its worker pool.
//!
//! Both structs deserialize with per-field defaults, so a config file only
//! needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_capacity() -> usize {
    4096
}

fn default_wait_interval_ms() -> u64 {
    1_000
}

fn default_max_wait_ms() -> u64 {
    60_000
}

fn default_threads() -> usize {
    4
}

fn default_queue_depth() -> usize {
    4096
}

/// Model cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of resolved entries kept before the least recently
    /// used one is evicted. Pending builds do not count.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Length of one wait on a pending build before the waiter re-checks
    /// its overall deadline.
    #[serde(default = "default_wait_interval_ms")]
    pub wait_interval_ms: u64,
    /// Overall deadline for a waiter. Exceeding it fails that caller with
    /// `ResolutionTimeout`; the build itself keeps running.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            wait_interval_ms: default_wait_interval_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

impl CacheConfig {
    /// Wait slice as a `Duration`, never shorter than one millisecond
    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms.max(1))
    }

    /// Overall deadline as a `Duration`
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Check the settings are usable.
    ///
    /// Returns a description of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("cache.capacity must be greater than 0".to_string());
        }
        if self.wait_interval_ms == 0 {
            return Err("cache.wait_interval_ms must be greater than 0".to_string());
        }
        if self.max_wait_ms < self.wait_interval_ms {
            return Err(format!(
                "cache.max_wait_ms ({}) must be at least cache.wait_interval_ms ({})",
                self.max_wait_ms, self.wait_interval_ms
            ));
        }
        Ok(())
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of build threads.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Maximum number of queued builds before submissions are rejected.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl WorkerConfig {
    /// Check the settings are usable.
    pub fn check(&self) -> Result<(), String> {
        if self.threads == 0 {
            return Err("workers.threads must be greater than 0".to_string());
        }
        if self.queue_depth == 0 {
            return Err("workers.queue_depth must be greater than 0".to_string());
        }
        Ok(())
    }
}
