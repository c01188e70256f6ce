//! modelreg - domain type-model registry
//!
//! Keeps the resolved models of application types, grouped into versioned
//! domains, and composes domains into ontologies that track cross-domain
//! name ambiguity. Models are built lazily through a concurrent cache that
//! runs each build at most once.
//!
//! # Quick Start
//!
//! ```
//! use modelreg::{
//!     BuildError, DomainId, DomainRegistry, ModelBuilder, Ontology, RegistryConfig,
//!     TypeEntry, TypeHandle, TypeResolver,
//! };
//! use std::sync::Arc;
//!
//! let shop: DomainId = "shop@1.0-GA".parse()?;
//! let ontology = Arc::new(Ontology::new(shop.clone(), DomainRegistry::new()));
//!
//! let builder: Arc<dyn ModelBuilder> = Arc::new(
//!     move |d: &TypeHandle, _: &[Arc<TypeEntry>]| -> Result<TypeEntry, BuildError> {
//!         Ok(TypeEntry::builder(shop.clone(), d.simple_name(), d.clone()).build())
//!     },
//! );
//! let resolver = TypeResolver::new(&RegistryConfig::default(), builder, Arc::clone(&ontology));
//!
//! let order = resolver.resolve(&TypeHandle::new("shop.Order"))?;
//! assert_eq!(order.name(), "Order");
//! assert!(ontology.find("Order").is_some());
//! # Ok::<(), modelreg::ModelError>(())
//! ```
//!
//! # Architecture
//!
//! - `modelreg-core`: identities, type handles, entries, errors, builder trait
//! - `modelreg-concurrency`: worker pool and single-flight model cache
//! - `modelreg-engine`: domain models, shared registry, ontology, resolver, config

pub use modelreg_core::{
    AttributeTag, BuildError, Classification, DomainId, ModelBuilder, ModelError, Qualifier,
    Result, TypeDescriptor, TypeEntry, TypeEntryBuilder, TypeHandle, VersionId,
    VersionParseError,
};

pub use modelreg_concurrency::{
    CacheConfig, CacheStats, ModelCache, PoolRejected, PoolStats, WorkerConfig, WorkerPool,
};

pub use modelreg_engine::{
    DomainModel, DomainRegistry, Ontology, RegistryConfig, TypeResolver, CONFIG_FILE_NAME,
};
