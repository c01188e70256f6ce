//! Core traits for model construction
//!
//! The registry never inspects application types itself. An introspection
//! layer implements [`ModelBuilder`] and the registry calls it on a cache miss.

use crate::entry::TypeEntry;
use crate::error::BuildError;
use crate::types::TypeHandle;
use std::sync::Arc;

/// Builds the model of one type descriptor
///
/// Called at most once per descriptor at a time, on a background worker.
/// `parents` holds the already-resolved models of `descriptor.parents()`, in
/// the same order, so the builder can link specialization without recursing
/// into the registry.
///
/// Thread safety: implementations are shared across workers (requires
/// Send + Sync).
pub trait ModelBuilder: Send + Sync {
    /// Build the model for `descriptor`
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the descriptor cannot be modeled.
    fn build(
        &self,
        descriptor: &TypeHandle,
        parents: &[Arc<TypeEntry>],
    ) -> Result<TypeEntry, BuildError>;
}

impl<F> ModelBuilder for F
where
    F: Fn(&TypeHandle, &[Arc<TypeEntry>]) -> Result<TypeEntry, BuildError> + Send + Sync,
{
    fn build(
        &self,
        descriptor: &TypeHandle,
        parents: &[Arc<TypeEntry>],
    ) -> Result<TypeEntry, BuildError> {
        self(descriptor, parents)
    }
}
