//! Core types for the model registry
//!
//! This module defines the foundational types:
//! - TypeHandle: Runtime type descriptor with its specialization chain
//! - AttributeTag: Declarative metadata marker attached to a type
//! - Classification: Plain / entity / event role of a type

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime type descriptor
///
/// Describes one application type by its qualified path (e.g. `shop.orders.Order`)
/// and the descriptors it directly specializes. The introspection layer that
/// produces descriptors is external; the registry only needs identity and the
/// specialization graph.
#[derive(Debug)]
pub struct TypeDescriptor {
    path: String,
    parents: Vec<TypeHandle>,
}

/// Shared handle to a [`TypeDescriptor`]
///
/// Cheap to clone. Equality and hashing use the qualified path, so two handles
/// describing the same path are the same type.
///
/// Parents must exist before a child is created, so the specialization graph
/// is acyclic by construction.
#[derive(Clone)]
pub struct TypeHandle(Arc<TypeDescriptor>);

impl TypeHandle {
    /// Create a descriptor with no parents
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_parents(path, Vec::new())
    }

    /// Create a descriptor that directly specializes `parents`
    pub fn with_parents(path: impl Into<String>, parents: Vec<TypeHandle>) -> Self {
        TypeHandle(Arc::new(TypeDescriptor {
            path: path.into(),
            parents,
        }))
    }

    /// Qualified path
    pub fn path(&self) -> &str {
        &self.0.path
    }

    /// Last path segment (`shop.orders.Order` -> `Order`)
    pub fn simple_name(&self) -> &str {
        self.0
            .path
            .rsplit(['.', ':'])
            .next()
            .unwrap_or(&self.0.path)
    }

    /// Direct parents
    pub fn parents(&self) -> &[TypeHandle] {
        &self.0.parents
    }

    /// True if `ancestor` is reachable through this descriptor's parents
    ///
    /// Strict: a descriptor does not specialize itself.
    pub fn is_specialization_of(&self, ancestor: &TypeHandle) -> bool {
        let mut seen = HashSet::new();
        let mut stack: Vec<&TypeHandle> = self.parents().iter().collect();
        while let Some(next) = stack.pop() {
            if next == ancestor {
                return true;
            }
            if seen.insert(next.path()) {
                stack.extend(next.parents().iter());
            }
        }
        false
    }

    /// True if `other` is this descriptor or one of its specializations
    pub fn is_assignable_from(&self, other: &TypeHandle) -> bool {
        self == other || other.is_specialization_of(self)
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.path == other.0.path
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.path.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.0.path)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.path)
    }
}

/// Declarative metadata marker attached to a type (e.g. `Aggregate`, `Auditable`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeTag(String);

impl AttributeTag {
    /// Create a tag
    pub fn new(tag: impl Into<String>) -> Self {
        AttributeTag(tag.into())
    }

    /// Tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributeTag {
    fn from(tag: &str) -> Self {
        AttributeTag::new(tag)
    }
}

/// Role of a type in its domain
///
/// Entity and event are mutually exclusive. A plain type can be refined to
/// either without conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Ordinary composed type
    #[default]
    Plain,
    /// Identity-bearing entity
    Entity,
    /// Immutable domain event
    Event,
}

impl Classification {
    /// Derive a classification from the entity/event markers found on a type
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IllegalModel`] if both markers are present.
    pub fn from_markers(type_name: &str, entity: bool, event: bool) -> Result<Self> {
        match (entity, event) {
            (true, true) => Err(ModelError::IllegalModel {
                type_name: type_name.to_string(),
                existing: Classification::Entity,
                incoming: Classification::Event,
            }),
            (true, false) => Ok(Classification::Entity),
            (false, true) => Ok(Classification::Event),
            (false, false) => Ok(Classification::Plain),
        }
    }

    /// True if one is an entity and the other an event
    pub fn conflicts_with(&self, other: Classification) -> bool {
        matches!(
            (self, other),
            (Classification::Entity, Classification::Event)
                | (Classification::Event, Classification::Entity)
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Plain => write!(f, "PLAIN"),
            Classification::Entity => write!(f, "ENTITY"),
            Classification::Event => write!(f, "EVENT"),
        }
    }
}
