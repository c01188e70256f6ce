//! Ontology: one domain plus the foreign domains it references
//!
//! An [`Ontology`] owns a self domain and pulls foreign domains into scope
//! whenever a registered type (or one of its parents) belongs to another
//! domain. Foreign domains come from the shared [`DomainRegistry`], so two
//! ontologies importing the same domain see the same [`DomainModel`].
//!
//! Unqualified lookup goes through an index of names that occur in exactly
//! one domain. A name defined in two or more domains is left out of that
//! index and must be looked up with [`Ontology::find_in`].
//!
//! Lock order is ontology state first, then domain state. Domain models never
//! call back into an ontology.

use crate::domain::DomainModel;
use crate::registry::DomainRegistry;
use modelreg_core::{AttributeTag, DomainId, Result, TypeEntry};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct OntologyState {
    imported: BTreeMap<DomainId, Arc<DomainModel>>,
    /// name -> entry, for names found in exactly one domain
    unambiguous: FxHashMap<String, Arc<TypeEntry>>,
}

/// A domain composed with its imported foreign domains
pub struct Ontology {
    domain: Arc<DomainModel>,
    registry: DomainRegistry,
    state: RwLock<OntologyState>,
}

impl Ontology {
    /// Create an ontology for `id`
    ///
    /// The self domain is taken from `registry` (created if absent), so an
    /// ontology over an already populated domain sees its types immediately.
    pub fn new(id: DomainId, registry: DomainRegistry) -> Self {
        let domain = registry.get_or_create(&id);
        let ontology = Ontology {
            domain,
            registry,
            state: RwLock::new(OntologyState::default()),
        };
        ontology.refresh_index();
        ontology
    }

    /// Identity of the self domain
    pub fn id(&self) -> &DomainId {
        self.domain.id()
    }

    /// The self domain
    pub fn domain(&self) -> &Arc<DomainModel> {
        &self.domain
    }

    /// The shared domain pool
    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Import the domain owning `entry`
    ///
    /// Returns true if a domain was newly imported. The self domain and
    /// already imported domains are left alone.
    pub fn import_domain(&self, entry: &TypeEntry) -> bool {
        let mut state = self.state.write();
        let imported = self.import_locked(&mut state, entry.domain());
        if imported {
            Self::rebuild_index(&self.domain, &mut state);
        }
        imported
    }

    /// Register `entry` in its owning domain
    ///
    /// Entries of the self domain go to the self domain; foreign entries go
    /// to the registry's model for their domain. After a successful
    /// registration the domains of the entry and of all its ancestors are
    /// imported. Returns the entry bound to the name afterwards.
    ///
    /// # Errors
    ///
    /// Merge conflicts from the owning domain. Nothing is imported on error.
    pub fn register(&self, entry: impl Into<Arc<TypeEntry>>) -> Result<Arc<TypeEntry>> {
        let entry = entry.into();
        let owner = if entry.domain() == self.id() {
            Arc::clone(&self.domain)
        } else {
            self.registry.get_or_create(entry.domain())
        };
        let bound = owner.register(Arc::clone(&entry))?;

        let mut state = self.state.write();
        self.import_locked(&mut state, entry.domain());
        for parent in entry.ancestors() {
            self.import_locked(&mut state, parent.domain());
        }
        // The index is rebuilt even without new imports: the name itself is new
        Self::rebuild_index(&self.domain, &mut state);
        Ok(bound)
    }

    /// Merge another ontology into this one
    ///
    /// Types of `other`'s self domain are merged into this self domain, then
    /// `other`'s imported domains are imported here. Imports are applied only
    /// after the type merge succeeds, so a conflicting merge leaves this
    /// ontology untouched. Merging an ontology with itself is a no-op.
    ///
    /// # Errors
    ///
    /// Merge conflicts from the type merge. Nothing is imported on error.
    pub fn merge(&self, other: &Ontology) -> Result<()> {
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        self.domain.merge(&other.domain)?;

        let foreign: Vec<DomainId> = other.state.read().imported.keys().cloned().collect();
        let mut state = self.state.write();
        for id in &foreign {
            self.import_locked(&mut state, id);
        }
        Self::rebuild_index(&self.domain, &mut state);
        debug!(
            domain = %self.id(),
            from = %other.id(),
            imported = state.imported.len(),
            "merged ontology"
        );
        Ok(())
    }

    /// Recompute the unambiguous index
    ///
    /// Needed after types were added to a shared domain through another
    /// ontology or directly on the [`DomainModel`].
    pub fn refresh_index(&self) {
        let mut state = self.state.write();
        Self::rebuild_index(&self.domain, &mut state);
    }

    fn import_locked(&self, state: &mut OntologyState, id: &DomainId) -> bool {
        if id == self.id() || state.imported.contains_key(id) {
            return false;
        }
        let model = self.registry.get_or_create(id);
        info!(domain = %self.id(), imported = %id, "imported domain");
        state.imported.insert(id.clone(), model);
        true
    }

    fn rebuild_index(own: &DomainModel, state: &mut OntologyState) {
        // None marks a name seen in more than one domain
        let mut seen: FxHashMap<String, Option<Arc<TypeEntry>>> = FxHashMap::default();
        let domains = std::iter::once(own).chain(state.imported.values().map(Arc::as_ref));
        for domain in domains {
            for (name, entry) in domain.snapshot() {
                seen.entry(name)
                    .and_modify(|slot| *slot = None)
                    .or_insert(Some(entry));
            }
        }
        let names = seen.len();
        state.unambiguous = seen
            .into_iter()
            .filter_map(|(name, entry)| entry.map(|e| (name, e)))
            .collect();
        debug!(
            domain = %own.id(),
            names,
            unambiguous = state.unambiguous.len(),
            "rebuilt unambiguous index"
        );
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Type named `name` if exactly one domain in scope defines it
    ///
    /// Reflects the index as of the last import, merge, registration or
    /// [`Ontology::refresh_index`].
    pub fn find(&self, name: &str) -> Option<Arc<TypeEntry>> {
        self.state.read().unambiguous.get(name).cloned()
    }

    /// Type named `name` (or aliased) within one domain in scope
    pub fn find_in(&self, domain: &DomainId, name: &str) -> Option<Arc<TypeEntry>> {
        if domain == self.id() {
            return self.domain.find(name);
        }
        let model = self.state.read().imported.get(domain).cloned()?;
        model.find(name)
    }

    /// All types in scope: self domain first, then imported domains by id
    pub fn find_all(&self) -> Vec<Arc<TypeEntry>> {
        self.domains_in_scope()
            .iter()
            .flat_map(|d| d.find_all())
            .collect()
    }

    /// Types in scope carrying `tag`, in the same order as [`Ontology::find_all`]
    pub fn find_by_attribute(&self, tag: &AttributeTag) -> Vec<Arc<TypeEntry>> {
        self.domains_in_scope()
            .iter()
            .flat_map(|d| d.find_by_attribute(tag))
            .collect()
    }

    /// Imported foreign domains, ordered by id
    pub fn imported_domains(&self) -> Vec<Arc<DomainModel>> {
        self.state.read().imported.values().cloned().collect()
    }

    /// True if `id` has been imported
    pub fn is_imported(&self, id: &DomainId) -> bool {
        self.state.read().imported.contains_key(id)
    }

    fn domains_in_scope(&self) -> Vec<Arc<DomainModel>> {
        let state = self.state.read();
        std::iter::once(Arc::clone(&self.domain))
            .chain(state.imported.values().cloned())
            .collect()
    }
}

impl std::fmt::Debug for Ontology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Ontology")
            .field("id", self.id())
            .field("imported", &state.imported.keys().collect::<Vec<_>>())
            .field("unambiguous", &state.unambiguous.len())
            .finish()
    }
}
