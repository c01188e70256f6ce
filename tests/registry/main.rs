//! Registry Integration Tests
//!
//! Domain merge policy, cross-domain ambiguity, the single-flight model cache
//! and end-to-end resolution.

#[path = "../common/mod.rs"]
mod common;

mod cache_single_flight;
mod cache_timeout;
mod merge_properties;
mod version_ordering;
