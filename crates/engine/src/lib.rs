//! Domain model registry engine
//!
//! This crate builds the registry on top of the lower layers:
//! - DomainModel: types of one domain with merge and collision policy
//! - DomainRegistry: shared pool of domain models keyed by DomainId
//! - Ontology: a domain plus imported foreign domains, with ambiguity tracking
//! - TypeResolver: descriptor -> model resolution through the model cache
//! - RegistryConfig: `modelreg.toml` settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ontology;
pub mod registry;
pub mod resolver;

pub use config::{RegistryConfig, CONFIG_FILE_NAME};
pub use domain::DomainModel;
pub use ontology::Ontology;
pub use registry::DomainRegistry;
pub use resolver::TypeResolver;
