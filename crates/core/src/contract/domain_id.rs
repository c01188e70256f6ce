//! Domain identity
//!
//! A domain is a versioned namespace of type models, identified by its name
//! and [`VersionId`]. Two domain models with equal `DomainId` are the same
//! domain for merge purposes.
//!
//! The string form is `name@version`, e.g. `billing@1.2.1-GA`.

use super::version::VersionId;
use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a domain: name plus version
///
/// Equality is case-sensitive on the name and structural on the version.
/// Ordering is by name, then version, which keeps domain maps deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainId {
    name: String,
    version: VersionId,
}

impl DomainId {
    /// Create a domain identity
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidDomain`] if `name` is empty or contains `@`.
    pub fn new(name: impl Into<String>, version: VersionId) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::InvalidDomain(
                "domain name must not be empty".to_string(),
            ));
        }
        if name.contains('@') {
            return Err(ModelError::InvalidDomain(format!(
                "domain name '{}' must not contain '@'",
                name
            )));
        }
        Ok(DomainId { name, version })
    }

    /// Domain name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Domain version
    pub fn version(&self) -> VersionId {
        self.version
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl FromStr for DomainId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, version) = s.split_once('@').ok_or_else(|| {
            ModelError::InvalidDomain(format!("expected name@version, got '{}'", s))
        })?;
        DomainId::new(name, version.parse()?)
    }
}
