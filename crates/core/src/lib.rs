//! Core types and traits for modelreg
//!
//! This crate defines the foundational types used throughout the system:
//! - VersionId / Qualifier: Comparable domain versions
//! - DomainId: Domain identity (name + version)
//! - TypeHandle: Runtime type descriptor and its specialization chain
//! - TypeEntry: Resolved model of one type
//! - Classification / AttributeTag: Declarative metadata carried by a model
//! - ModelBuilder: Seam to the external introspection layer
//! - ModelError: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod entry;
pub mod error;
pub mod traits;
pub mod types;

pub use contract::{DomainId, Qualifier, VersionId, VersionParseError};
pub use entry::{TypeEntry, TypeEntryBuilder};
pub use error::{BuildError, ModelError, Result};
pub use traits::ModelBuilder;
pub use types::{AttributeTag, Classification, TypeDescriptor, TypeHandle};
