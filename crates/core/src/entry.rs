//! Resolved model of one application type
//!
//! A [`TypeEntry`] is what the registry stores and hands out: the type's name
//! within its domain, aliases, attributes, classification, direct parents and
//! the descriptor it was built from. Entries are immutable and shared as
//! `Arc<TypeEntry>`.

use crate::contract::DomainId;
use crate::types::{AttributeTag, Classification, TypeHandle};
use std::collections::{BTreeSet, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Resolved model of one application type
#[derive(Debug, Clone)]
pub struct TypeEntry {
    name: String,
    domain: DomainId,
    aliases: BTreeSet<String>,
    attributes: BTreeSet<AttributeTag>,
    classification: Classification,
    specializes: Vec<Arc<TypeEntry>>,
    descriptor: TypeHandle,
}

impl TypeEntry {
    /// Start building an entry owned by `domain`
    pub fn builder(
        domain: DomainId,
        name: impl Into<String>,
        descriptor: TypeHandle,
    ) -> TypeEntryBuilder {
        TypeEntryBuilder {
            entry: TypeEntry {
                name: name.into(),
                domain,
                aliases: BTreeSet::new(),
                attributes: BTreeSet::new(),
                classification: Classification::Plain,
                specializes: Vec::new(),
                descriptor,
            },
        }
    }

    /// Name, unique within the owning domain
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning domain
    pub fn domain(&self) -> &DomainId {
        &self.domain
    }

    /// Alternative names
    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    /// Declared attributes
    pub fn attributes(&self) -> &BTreeSet<AttributeTag> {
        &self.attributes
    }

    /// Role of the type
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Direct parents, possibly from other domains
    pub fn specializes(&self) -> &[Arc<TypeEntry>] {
        &self.specializes
    }

    /// Underlying runtime descriptor
    pub fn descriptor(&self) -> &TypeHandle {
        &self.descriptor
    }

    /// True for entities
    pub fn is_entity(&self) -> bool {
        self.classification == Classification::Entity
    }

    /// True for events
    pub fn is_event(&self) -> bool {
        self.classification == Classification::Event
    }

    /// True if the entry carries `tag`
    pub fn has_attribute(&self, tag: &AttributeTag) -> bool {
        self.attributes.contains(tag)
    }

    /// All transitive parents, nearest first, each reported once
    pub fn ancestors(&self) -> Vec<Arc<TypeEntry>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut frontier: Vec<Arc<TypeEntry>> = self.specializes.clone();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for parent in frontier {
                if seen.insert(parent.descriptor.clone()) {
                    next.extend(parent.specializes.iter().cloned());
                    out.push(parent);
                }
            }
            frontier = next;
        }
        out
    }
}

impl PartialEq for TypeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.descriptor == other.descriptor
    }
}

impl Eq for TypeEntry {}

impl Hash for TypeEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.descriptor.hash(state);
    }
}

/// Builder for [`TypeEntry`]
///
/// The attribute source (declarative metadata) fills aliases, attributes and
/// classification; the introspection layer supplies the descriptor and parents.
#[derive(Debug)]
pub struct TypeEntryBuilder {
    entry: TypeEntry,
}

impl TypeEntryBuilder {
    /// Add an alias
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.entry.aliases.insert(alias.into());
        self
    }

    /// Add an attribute tag
    pub fn attribute(mut self, tag: impl Into<AttributeTag>) -> Self {
        self.entry.attributes.insert(tag.into());
        self
    }

    /// Set the classification
    pub fn classification(mut self, classification: Classification) -> Self {
        self.entry.classification = classification;
        self
    }

    /// Add a direct parent
    pub fn specializes(mut self, parent: Arc<TypeEntry>) -> Self {
        if !self.entry.specializes.contains(&parent) {
            self.entry.specializes.push(parent);
        }
        self
    }

    /// Finish the entry
    pub fn build(self) -> TypeEntry {
        self.entry
    }
}
