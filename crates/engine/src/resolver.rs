//! Type resolution through the model cache
//!
//! [`TypeResolver`] ties the pieces together: a cache miss for a descriptor
//! runs the injected [`ModelBuilder`] once on the worker pool and registers
//! the built entry in the ontology. Parent descriptors are resolved first on
//! the calling thread, so a build never waits on another build.

use crate::config::RegistryConfig;
use crate::ontology::Ontology;
use modelreg_concurrency::ModelCache;
use modelreg_core::{ModelBuilder, Result, TypeEntry, TypeHandle};
use std::sync::Arc;
use tracing::debug;

/// Resolves type descriptors to registered models
pub struct TypeResolver {
    cache: ModelCache,
    builder: Arc<dyn ModelBuilder>,
    ontology: Arc<Ontology>,
}

impl TypeResolver {
    /// Create a resolver with a cache and worker pool built from `config`
    pub fn new(
        config: &RegistryConfig,
        builder: Arc<dyn ModelBuilder>,
        ontology: Arc<Ontology>,
    ) -> Self {
        let cache = ModelCache::new(config.cache.clone(), &config.workers);
        Self::with_cache(cache, builder, ontology)
    }

    /// Create a resolver over an existing cache
    pub fn with_cache(
        cache: ModelCache,
        builder: Arc<dyn ModelBuilder>,
        ontology: Arc<Ontology>,
    ) -> Self {
        TypeResolver {
            cache,
            builder,
            ontology,
        }
    }

    /// Resolve `descriptor` to its model
    ///
    /// Parents are resolved recursively before the descriptor itself. Every
    /// descriptor is built at most once across concurrent callers; the built
    /// entry is registered in the ontology as part of that build.
    ///
    /// # Errors
    ///
    /// The first failing parent's error, the builder's error, a merge
    /// conflict from registration, or any cache error
    /// ([`ModelError::ResolutionTimeout`](modelreg_core::ModelError::ResolutionTimeout) etc.).
    pub fn resolve(&self, descriptor: &TypeHandle) -> Result<Arc<TypeEntry>> {
        if let Some(entry) = self.cache.get(descriptor) {
            return Ok(entry);
        }

        let parents = descriptor
            .parents()
            .iter()
            .map(|p| self.resolve(p))
            .collect::<Result<Vec<_>>>()?;

        let builder = Arc::clone(&self.builder);
        let ontology = Arc::clone(&self.ontology);
        let key = descriptor.clone();
        self.cache.get_or_create(descriptor, move || {
            let entry = Arc::new(builder.build(&key, &parents)?);
            let bound = ontology.register(Arc::clone(&entry))?;
            if !Arc::ptr_eq(&bound, &entry) {
                debug!(
                    type_path = %key,
                    bound = %bound.descriptor(),
                    "name already bound to a more specific type"
                );
            }
            Ok(entry)
        })
    }

    /// Ontology that resolved models are registered in
    pub fn ontology(&self) -> &Arc<Ontology> {
        &self.ontology
    }

    /// Underlying model cache
    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }
}
