//! Domain model: the registry of types for one domain
//!
//! A [`DomainModel`] maps type names to [`TypeEntry`] values for a single
//! [`DomainId`] and maintains two derived indexes (attribute -> type names,
//! alias -> type name).
//!
//! When several types declare the same alias, the most recently indexed one
//! owns it. If that type is replaced by one that drops the alias, ownership
//! falls back to another type still declaring it.
//!
//! ## Merge policy
//!
//! When an incoming type collides by name with a registered one:
//!
//! | Registered vs incoming                       | Result                 |
//! |----------------------------------------------|------------------------|
//! | ENTITY vs EVENT (either way)                 | `IllegalModel`         |
//! | same descriptor                              | keep (no-op)           |
//! | registered specializes incoming              | keep registered        |
//! | incoming specializes registered              | replace with incoming  |
//! | unrelated descriptors                        | `AmbiguousType`        |
//!
//! The more specific type always wins, so merging a specialization pair
//! gives the same result in either order.
//!
//! A merge is all-or-nothing: every incoming type is checked against the
//! current state before anything is applied, and one conflict aborts the
//! whole call with the domain unchanged.
//!
//! ## Concurrency
//!
//! State sits behind one `RwLock`. Merges take the write lock once; queries
//! take the read lock and return point-in-time copies. A merge reads the
//! other model's snapshot before locking this one, so two models merging
//! into each other cannot deadlock.

use modelreg_core::{AttributeTag, DomainId, ModelError, Result, TypeEntry, VersionId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Outcome of checking one incoming type against the registered one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    /// Registered type stays
    Keep,
    /// Incoming type takes the name
    Replace,
}

/// Apply the collision policy to a registered/incoming pair with equal names
fn resolve_collision(existing: &TypeEntry, incoming: &TypeEntry) -> Result<Resolution> {
    if existing
        .classification()
        .conflicts_with(incoming.classification())
    {
        return Err(ModelError::IllegalModel {
            type_name: incoming.name().to_string(),
            existing: existing.classification(),
            incoming: incoming.classification(),
        });
    }
    let (dt, mt) = (existing.descriptor(), incoming.descriptor());
    if dt == mt || dt.is_specialization_of(mt) {
        Ok(Resolution::Keep)
    } else if mt.is_specialization_of(dt) {
        Ok(Resolution::Replace)
    } else {
        Err(ModelError::AmbiguousType {
            type_name: incoming.name().to_string(),
            existing: dt.path().to_string(),
            incoming: mt.path().to_string(),
        })
    }
}

#[derive(Default)]
struct DomainState {
    types: BTreeMap<String, Arc<TypeEntry>>,
    /// alias -> type name
    aliases: FxHashMap<String, String>,
    /// attribute -> type names carrying it
    by_attribute: FxHashMap<AttributeTag, BTreeSet<String>>,
}

impl DomainState {
    fn set_type(&mut self, entry: Arc<TypeEntry>) -> Option<Arc<TypeEntry>> {
        let previous = self
            .types
            .insert(entry.name().to_string(), Arc::clone(&entry));
        if let Some(old) = &previous {
            self.unindex(old);
        }
        self.index(&entry);
        previous
    }

    fn index(&mut self, entry: &TypeEntry) {
        for tag in entry.attributes() {
            self.by_attribute
                .entry(tag.clone())
                .or_default()
                .insert(entry.name().to_string());
        }
        for alias in entry.aliases() {
            self.aliases
                .insert(alias.clone(), entry.name().to_string());
        }
    }

    fn unindex(&mut self, entry: &TypeEntry) {
        for tag in entry.attributes() {
            if let Some(names) = self.by_attribute.get_mut(tag) {
                names.remove(entry.name());
                if names.is_empty() {
                    self.by_attribute.remove(tag);
                }
            }
        }
        for alias in entry.aliases() {
            if self.aliases.get(alias).map(String::as_str) != Some(entry.name()) {
                continue;
            }
            // Fall back to another type that still declares the alias
            let successor = self
                .types
                .values()
                .find(|t| t.name() != entry.name() && t.aliases().contains(alias))
                .map(|t| t.name().to_string());
            match successor {
                Some(name) => {
                    self.aliases.insert(alias.clone(), name);
                }
                None => {
                    self.aliases.remove(alias);
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<&Arc<TypeEntry>> {
        self.types
            .get(name)
            .or_else(|| self.aliases.get(name).and_then(|n| self.types.get(n)))
    }
}

/// Registry of type models scoped to one domain
pub struct DomainModel {
    id: DomainId,
    state: RwLock<DomainState>,
}

impl DomainModel {
    /// Create an empty domain model
    pub fn new(id: DomainId) -> Self {
        DomainModel {
            id,
            state: RwLock::new(DomainState::default()),
        }
    }

    /// Create a domain model from an initial collection of types
    ///
    /// Types are registered in order with the usual collision policy.
    ///
    /// # Errors
    ///
    /// Returns the first merge conflict among the initial types.
    pub fn with_types(id: DomainId, types: impl IntoIterator<Item = TypeEntry>) -> Result<Self> {
        let model = DomainModel::new(id);
        model.merge_entries(types.into_iter().map(Arc::new).collect())?;
        Ok(model)
    }

    /// Domain identity
    pub fn id(&self) -> &DomainId {
        &self.id
    }

    /// Domain name
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Domain version
    pub fn version(&self) -> VersionId {
        self.id.version()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Merge every type of `other` into this domain
    ///
    /// Merging a model with itself is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ModelError::IllegalModel`] if a name switches between ENTITY and EVENT
    /// - [`ModelError::AmbiguousType`] if unrelated descriptors share a name
    ///
    /// On error nothing is applied.
    pub fn merge(&self, other: &DomainModel) -> Result<()> {
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        self.merge_entries(other.find_all())
    }

    /// Register one type with the collision policy
    ///
    /// Returns the entry bound to the name afterwards: `entry` itself, or the
    /// registered type if that one is at least as specific.
    pub fn register(&self, entry: impl Into<Arc<TypeEntry>>) -> Result<Arc<TypeEntry>> {
        let entry = entry.into();
        let mut state = self.state.write();
        self.merge_locked(&mut state, vec![Arc::clone(&entry)])?;
        Ok(state.types.get(entry.name()).cloned().unwrap_or(entry))
    }

    /// Insert or replace a type without the collision policy
    ///
    /// Returns the entry it replaced.
    pub fn set_type(&self, entry: impl Into<Arc<TypeEntry>>) -> Option<Arc<TypeEntry>> {
        self.state.write().set_type(entry.into())
    }

    /// Validate all incoming entries, then apply them in one step.
    ///
    /// Incoming names may repeat; later ones are checked against earlier ones.
    fn merge_entries(&self, incoming: Vec<Arc<TypeEntry>>) -> Result<()> {
        let mut state = self.state.write();
        self.merge_locked(&mut state, incoming)
    }

    fn merge_locked(&self, state: &mut DomainState, incoming: Vec<Arc<TypeEntry>>) -> Result<()> {
        let mut staged: BTreeMap<String, Arc<TypeEntry>> = BTreeMap::new();

        for mt in incoming {
            let current = staged
                .get(mt.name())
                .or_else(|| state.types.get(mt.name()))
                .cloned();
            match current {
                None => {
                    staged.insert(mt.name().to_string(), mt);
                }
                Some(dt) => match resolve_collision(&dt, &mt)? {
                    Resolution::Keep => {}
                    Resolution::Replace => {
                        debug!(
                            domain = %self.id,
                            type_name = mt.name(),
                            replaced = %dt.descriptor(),
                            by = %mt.descriptor(),
                            "more specific type replaces registered type"
                        );
                        staged.insert(mt.name().to_string(), mt);
                    }
                },
            }
        }

        let applied = staged.len();
        for (_, entry) in staged {
            state.set_type(entry);
        }
        if applied > 0 {
            debug!(domain = %self.id, applied, total = state.types.len(), "merged types");
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Type registered under `name` or aliased as `name`
    pub fn find(&self, name: &str) -> Option<Arc<TypeEntry>> {
        self.state.read().lookup(name).cloned()
    }

    /// All types, ordered by name
    pub fn find_all(&self) -> Vec<Arc<TypeEntry>> {
        self.state.read().types.values().cloned().collect()
    }

    /// Types carrying `tag`, ordered by name
    pub fn find_by_attribute(&self, tag: &AttributeTag) -> Vec<Arc<TypeEntry>> {
        let state = self.state.read();
        state
            .by_attribute
            .get(tag)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| state.types.get(n).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entity types, ordered by name
    pub fn entities(&self) -> Vec<Arc<TypeEntry>> {
        self.filter(TypeEntry::is_entity)
    }

    /// Event types, ordered by name
    pub fn events(&self) -> Vec<Arc<TypeEntry>> {
        self.filter(TypeEntry::is_event)
    }

    fn filter(&self, pred: impl Fn(&TypeEntry) -> bool) -> Vec<Arc<TypeEntry>> {
        self.state
            .read()
            .types
            .values()
            .filter(|e| pred(e))
            .cloned()
            .collect()
    }

    /// Point-in-time copy of the name -> type map
    pub fn snapshot(&self) -> BTreeMap<String, Arc<TypeEntry>> {
        self.state.read().types.clone()
    }

    /// Registered type names, ordered
    pub fn names(&self) -> Vec<String> {
        self.state.read().types.keys().cloned().collect()
    }

    /// Attribute tags currently indexed
    pub fn attributes(&self) -> BTreeSet<AttributeTag> {
        self.state.read().by_attribute.keys().cloned().collect()
    }

    /// True if `name` is registered (aliases excluded)
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().types.contains_key(name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.state.read().types.len()
    }

    /// True if no types are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DomainModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainModel")
            .field("id", &self.id)
            .field("types", &self.names())
            .finish()
    }
}
