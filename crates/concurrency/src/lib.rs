//! Concurrency layer for modelreg
//!
//! This crate implements lazy, single-flight model resolution:
//! - ModelCache: descriptor -> model cache with PENDING/RESOLVED slots
//! - WorkerPool: bounded pool of build threads
//! - CacheConfig / WorkerConfig: tuning knobs for both

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod worker;

pub use cache::{CacheStats, ModelCache};
pub use config::{CacheConfig, WorkerConfig};
pub use worker::{PoolRejected, PoolStats, WorkerPool};
