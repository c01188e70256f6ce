//! Shared pool of domain models
//!
//! Ontologies that share a [`DomainRegistry`] see the same [`DomainModel`]
//! instance for a given [`DomainId`]. The registry is an explicit value that
//! callers construct and clone; clones share the pool.

use crate::domain::DomainModel;
use dashmap::DashMap;
use modelreg_core::DomainId;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe pool of domain models keyed by domain identity
#[derive(Clone, Default)]
pub struct DomainRegistry {
    domains: Arc<DashMap<DomainId, Arc<DomainModel>>>,
}

impl DomainRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Domain model registered for `id`, if any
    pub fn get(&self, id: &DomainId) -> Option<Arc<DomainModel>> {
        self.domains.get(id).map(|d| Arc::clone(d.value()))
    }

    /// Domain model for `id`, creating an empty placeholder if absent
    ///
    /// Concurrent callers for the same id receive the same instance.
    pub fn get_or_create(&self, id: &DomainId) -> Arc<DomainModel> {
        let entry = self.domains.entry(id.clone()).or_insert_with(|| {
            debug!(domain = %id, "created placeholder domain");
            Arc::new(DomainModel::new(id.clone()))
        });
        Arc::clone(entry.value())
    }

    /// Insert `model` unless a model for its id already exists
    ///
    /// Returns the instance the registry holds afterwards.
    pub fn adopt(&self, model: Arc<DomainModel>) -> Arc<DomainModel> {
        let entry = self
            .domains
            .entry(model.id().clone())
            .or_insert(model);
        Arc::clone(entry.value())
    }

    /// True if a model is registered for `id`
    pub fn contains(&self, id: &DomainId) -> bool {
        self.domains.contains_key(id)
    }

    /// Registered domain ids, sorted
    pub fn ids(&self) -> Vec<DomainId> {
        let mut ids: Vec<DomainId> = self.domains.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered domains
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// True if no domains are registered
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl std::fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRegistry")
            .field("domains", &self.ids())
            .finish()
    }
}
