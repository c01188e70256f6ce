//! Contract types for registry identity
//!
//! These types name the things a registry stores and are shared by every
//! layer above:
//!
//! - `version`: Comparable domain version (`major.minor[.increment]-QUALIFIER[-build]`)
//! - `domain_id`: Domain identity (name + version)
//!
//! ## Usage
//!
//! ```
//! use modelreg_core::contract::{DomainId, Qualifier, VersionId};
//!
//! let id = DomainId::new("billing", VersionId::new(1, 0, Qualifier::Ga)).unwrap();
//! assert_eq!(id.to_string(), "billing@1.0-GA");
//! ```

pub mod domain_id;
pub mod version;

// Re-exports
pub use domain_id::DomainId;
pub use version::{Qualifier, VersionId, VersionParseError};
